//! Keyword rules for intent classification
//!
//! Every keyword and company name is matched on word boundaries, so "hi"
//! does not fire inside "hindustan" and "itc" does not fire inside "kitchen".

use crate::error::{Result, StockError};
use async_trait::async_trait;
use equisage_core::{Classification, DialogueMessage, Intent, IntentClassifier};
use regex::Regex;

/// Greeting keywords
pub const GREETINGS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
];

/// Usage question keywords
pub const HELP_PATTERNS: &[&str] = &["help", "how to", "what can you do", "instructions"];

/// Keywords asking for an analysis
pub const ANALYSIS_PATTERNS: &[&str] = &[
    "analyse",
    "analyze",
    "tell me about",
    "research",
    "study",
    "look at",
];

/// Well-known company names and their NSE tickers
pub const KNOWN_COMPANIES: &[(&str, &str)] = &[
    ("reliance industries", "RELIANCE.NS"),
    ("reliance", "RELIANCE.NS"),
    ("tata consultancy", "TCS.NS"),
    ("tcs", "TCS.NS"),
    ("infosys", "INFY.NS"),
    ("hdfc bank", "HDFCBANK.NS"),
    ("hdfc", "HDFCBANK.NS"),
    ("icici bank", "ICICIBANK.NS"),
    ("icici", "ICICIBANK.NS"),
    ("state bank", "SBIN.NS"),
    ("sbi", "SBIN.NS"),
    ("wipro", "WIPRO.NS"),
    ("bharti airtel", "BHARTIARTL.NS"),
    ("airtel", "BHARTIARTL.NS"),
    ("itc", "ITC.NS"),
    ("tata chemicals", "TATACHEM.NS"),
    ("tatachem", "TATACHEM.NS"),
    ("tata motors", "TATAMOTORS.NS"),
    ("bajaj finance", "BAJFINANCE.NS"),
    ("bajaj finserv", "BAJAJFINSV.NS"),
    ("asian paints", "ASIANPAINT.NS"),
    ("nestle", "NESTLEIND.NS"),
    ("hindustan unilever", "HINDUNILVR.NS"),
    ("hul", "HINDUNILVR.NS"),
    ("maruti suzuki", "MARUTI.NS"),
    ("maruti", "MARUTI.NS"),
];

/// A company name found in a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompanyMatch {
    /// The name as listed in [`KNOWN_COMPANIES`]
    pub name: &'static str,
    /// NSE ticker
    pub ticker: &'static str,
}

/// Deterministic classifier built from keyword lists
#[derive(Debug, Clone)]
pub struct RuleBasedClassifier {
    greeting: Regex,
    help: Regex,
    analysis: Regex,
    companies: Vec<(Regex, CompanyMatch)>,
}

fn any_word(words: &[&str]) -> Result<Regex> {
    let alternation = words.iter().map(|w| regex::escape(w)).collect::<Vec<_>>().join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).map_err(|e| StockError::Other(e.to_string()))
}

impl RuleBasedClassifier {
    /// Compile the keyword lists
    pub fn new() -> Result<Self> {
        let companies = KNOWN_COMPANIES
            .iter()
            .map(|&(name, ticker)| Ok((any_word(&[name])?, CompanyMatch { name, ticker })))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            greeting: any_word(GREETINGS)?,
            help: any_word(HELP_PATTERNS)?,
            analysis: any_word(ANALYSIS_PATTERNS)?,
            companies,
        })
    }

    /// First known company named in `message`
    ///
    /// Longer names are listed before their abbreviations, so the most
    /// specific match wins.
    pub fn find_company(&self, message: &str) -> Option<CompanyMatch> {
        self.companies
            .iter()
            .find(|(pattern, _)| pattern.is_match(message))
            .map(|(_, company)| *company)
    }

    /// Classify by rules alone
    ///
    /// Returns `None` when no rule fires. A named company takes precedence
    /// over greeting and help keywords, so "hi, tell me about tcs" is an
    /// analysis request. An analysis keyword without a known company yields
    /// `StockAnalysis` with no ticker.
    pub fn match_rules(&self, message: &str) -> Option<Classification> {
        let message = message.trim();
        if let Some(company) = self.find_company(message) {
            return Some(Classification::new(
                Intent::StockAnalysis,
                Some(company.ticker.to_string()),
            ));
        }
        if self.greeting.is_match(message) {
            return Some(Classification::new(Intent::Greeting, None));
        }
        if self.help.is_match(message) {
            return Some(Classification::new(Intent::Help, None));
        }
        if self.analysis.is_match(message) {
            return Some(Classification::new(Intent::StockAnalysis, None));
        }
        None
    }
}

#[async_trait]
impl IntentClassifier for RuleBasedClassifier {
    async fn classify(
        &self,
        message: &str,
        _prior: &[DialogueMessage],
    ) -> equisage_core::Result<Classification> {
        Ok(self.match_rules(message).unwrap_or_else(Classification::off_topic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> RuleBasedClassifier {
        RuleBasedClassifier::new().unwrap()
    }

    fn classify(message: &str) -> Option<(Intent, Option<String>)> {
        rules().match_rules(message).map(|c| (c.intent, c.ticker))
    }

    #[test]
    fn test_greetings_and_help() {
        assert_eq!(classify("hi"), Some((Intent::Greeting, None)));
        assert_eq!(classify("Good Morning!"), Some((Intent::Greeting, None)));
        assert_eq!(classify("what can you do?"), Some((Intent::Help, None)));
        assert_eq!(classify("HELP"), Some((Intent::Help, None)));
    }

    #[test]
    fn test_company_tickers() {
        let cases = [
            ("analyze reliance", "RELIANCE.NS"),
            ("tell me about Tata Chemicals", "TATACHEM.NS"),
            ("study hdfc bank please", "HDFCBANK.NS"),
            ("sbi", "SBIN.NS"),
            ("how is hindustan unilever doing", "HINDUNILVR.NS"),
            ("look at bajaj finserv", "BAJAJFINSV.NS"),
        ];
        for (message, ticker) in cases {
            assert_eq!(
                classify(message),
                Some((Intent::StockAnalysis, Some(ticker.to_string()))),
                "{message}"
            );
        }
    }

    #[test]
    fn test_word_boundaries() {
        // "hi" inside "this" / "hindustan", "itc" inside "kitchen"
        assert_eq!(classify("this kitchen is nice"), None);
        assert_eq!(
            classify("hindustan unilever"),
            Some((Intent::StockAnalysis, Some("HINDUNILVR.NS".to_string())))
        );
    }

    #[test]
    fn test_company_beats_greeting() {
        assert_eq!(
            classify("hey, tell me about wipro"),
            Some((Intent::StockAnalysis, Some("WIPRO.NS".to_string())))
        );
    }

    #[test]
    fn test_analysis_without_known_company() {
        assert_eq!(classify("analyze vedanta"), Some((Intent::StockAnalysis, None)));
    }

    #[test]
    fn test_unmatched_is_none() {
        assert_eq!(classify("what's the weather in Pune?"), None);
        assert_eq!(classify(""), None);
    }

    #[tokio::test]
    async fn test_trait_defaults_to_off_topic() {
        let classification = rules().classify("recommend a movie", &[]).await.unwrap();
        assert_eq!(classification, Classification::off_topic());
    }
}
