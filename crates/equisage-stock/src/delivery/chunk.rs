//! Message chunking for length-limited channels

/// Room kept in every chunk for the `(i/n)` prefix
pub const PREFIX_RESERVE: usize = 16;

/// Smallest limit that leaves room for text after the `(i/n)` prefix
pub const MIN_CHUNK_SIZE: usize = 2 * PREFIX_RESERVE;

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Greedily join `parts` with `separator`, never exceeding `budget`
fn pack(parts: Vec<String>, separator: &str, budget: usize) -> Vec<String> {
    let mut packed = Vec::new();
    let mut current = String::new();
    for part in parts {
        if current.is_empty() {
            current = part;
        } else if char_len(&current) + char_len(separator) + char_len(&part) <= budget {
            current.push_str(separator);
            current.push_str(&part);
        } else {
            packed.push(std::mem::replace(&mut current, part));
        }
    }
    if !current.is_empty() {
        packed.push(current);
    }
    packed
}

fn hard_split(text: &str, budget: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(budget).map(|c| c.iter().collect()).collect()
}

/// Paragraph pieces that each fit the budget
fn fit_paragraph(paragraph: &str, budget: usize) -> Vec<String> {
    if char_len(paragraph) <= budget {
        return vec![paragraph.to_string()];
    }
    let sentences = paragraph
        .split_inclusive(". ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .flat_map(|sentence| {
            if char_len(sentence) <= budget {
                vec![sentence.to_string()]
            } else {
                hard_split(sentence, budget)
            }
        })
        .collect();
    pack(sentences, " ", budget)
}

/// Split `text` into chunks of at most `max_len` characters
///
/// Paragraphs (blank-line separated) are kept together when possible, long
/// paragraphs are split on sentence ends, and a sentence that still does not
/// fit is cut at the limit. When more than one chunk results, every chunk
/// after the first starts with `(i/n)` and a blank line.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() || max_len == 0 {
        return Vec::new();
    }
    if char_len(text) <= max_len {
        return vec![text.to_string()];
    }

    let budget = max_len.saturating_sub(PREFIX_RESERVE).max(1);
    let pieces = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .flat_map(|paragraph| fit_paragraph(paragraph, budget))
        .collect();
    let chunks = pack(pieces, "\n\n", budget);

    let total = chunks.len();
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            if i == 0 {
                chunk
            } else {
                format!("({}/{total})\n\n{chunk}", i + 1)
            }
        })
        .collect()
}
