//! Markdown and stray HTML to Telegram's HTML subset

use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::warn;

/// Tags Telegram accepts in HTML parse mode
pub const ALLOWED_TAGS: &[&str] = &["b", "i", "u", "s", "tg-spoiler", "a", "code", "pre"];

struct Patterns {
    bullet: Regex,
    heading: Regex,
    bold: Regex,
    italic: Regex,
    line_break: Regex,
    list: Regex,
    list_item: Regex,
    html_heading: Regex,
    tag: Regex,
    entity: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            bullet: Regex::new(r"(?m)^[ \t]*[*-][ \t]+")?,
            heading: Regex::new(r"(?m)^#{1,6}[ \t]*(.+?)[ \t]*#*$")?,
            bold: Regex::new(r"(?s)\*\*(.+?)\*\*")?,
            italic: Regex::new(r"\*([^*\n]+?)\*")?,
            line_break: Regex::new(r"(?i)<br\s*/?>")?,
            list: Regex::new(r"(?i)</?ul\s*>|</li\s*>")?,
            list_item: Regex::new(r"(?i)<li\b[^>]*>")?,
            html_heading: Regex::new(r"(?i)<(/?)h[1-6]\b[^>]*>")?,
            tag: Regex::new(r"<(/?)([a-zA-Z][a-zA-Z0-9-]*)\b[^<>]*>")?,
            entity: Regex::new(r"^&(?:[a-zA-Z]+|#[0-9]+|#x[0-9a-fA-F]+);")?,
        })
    }
}

static PATTERNS: LazyLock<Result<Patterns, regex::Error>> = LazyLock::new(Patterns::compile);

fn escape_text(text: &str, entity: Option<&Regex>, out: &mut String) {
    for (idx, c) in text.char_indices() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' if !entity.is_some_and(|e| e.is_match(&text[idx..])) => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
}

/// Make model output safe for Telegram's HTML parse mode
///
/// Markdown emphasis and headings become `<b>`/`<i>`, `<br>` becomes a
/// newline, list markup becomes bullets, tags outside [`ALLOWED_TAGS`] are
/// dropped and any remaining `<`, `>` or bare `&` is escaped.
pub fn sanitize_for_telegram(text: &str) -> String {
    let p = match PATTERNS.as_ref() {
        Ok(patterns) => patterns,
        Err(err) => {
            warn!("Sanitizer patterns unavailable, escaping everything: {}", err);
            let mut out = String::with_capacity(text.len());
            escape_text(text, None, &mut out);
            return out.trim().to_string();
        }
    };

    let text = p.bullet.replace_all(text, "• ");
    let text = p.heading.replace_all(&text, "<b>$1</b>");
    let text = p.bold.replace_all(&text, "<b>$1</b>");
    let text = p.italic.replace_all(&text, "<i>$1</i>");
    let text = p.line_break.replace_all(&text, "\n");
    let text = p.list.replace_all(&text, "");
    let text = p.list_item.replace_all(&text, "\n• ");
    let text = p
        .html_heading
        .replace_all(&text, |caps: &Captures| format!("<{}b>", &caps[1]));

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in p.tag.captures_iter(&text) {
        let Some(whole) = caps.get(0) else { continue };
        escape_text(&text[last..whole.start()], Some(&p.entity), &mut out);
        let name = caps[2].to_ascii_lowercase();
        if ALLOWED_TAGS.contains(&name.as_str()) {
            if name == "a" {
                out.push_str(whole.as_str());
            } else {
                out.push('<');
                out.push_str(&caps[1]);
                out.push_str(&name);
                out.push('>');
            }
        }
        last = whole.end();
    }
    escape_text(&text[last..], Some(&p.entity), &mut out);
    out.trim().to_string()
}
