//! Canned reply texts

use equisage_core::{Error, Result};
use rand::seq::SliceRandom;

/// Fixed greeting
pub const GREETING_MESSAGE: &str =
    "Hello! I am EquiSage, your AI stock research assistant. Which stock can I analyze for you today?";

/// Fixed usage help
pub const HELP_MESSAGE: &str = "I am EquiSage! Ask me to analyze any Indian stock by name (e.g., 'tell me about Reliance Industries') and I will provide a full report.";

/// Off-topic deflections, one is picked at random
pub const OFF_TOPIC_REPLIES: &[&str] = &[
    "My circuits are 100% focused on candlestick charts. Try asking me about a stock!",
    "That question is currently trading outside my knowledge-circuit. Let's talk about the Indian market.",
];

/// Reply sent when a turn aborts on a contract violation
pub const INTERNAL_ERROR_MESSAGE: &str =
    "Apologies, a critical system error occurred. The team has been notified.";

const SUBJECT_PLACEHOLDER: &str = "{subject}";

/// Apology when synthesis fails; `{subject}` is replaced by the company name
pub const SYNTHESIS_FAILURE_TEMPLATE: &str =
    "Failed to generate the AI-powered analysis for {subject}. An API error occurred.";

/// Reply texts used by the terminal nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CannedReplies {
    /// Greeting reply
    pub greeting: String,
    /// Help reply
    pub help: String,
    /// Off-topic deflections
    pub off_topic: Vec<String>,
    /// Internal error reply
    pub internal_error: String,
    /// Synthesis failure template containing `{subject}`
    pub synthesis_failure: String,
}

impl Default for CannedReplies {
    fn default() -> Self {
        Self {
            greeting: GREETING_MESSAGE.to_string(),
            help: HELP_MESSAGE.to_string(),
            off_topic: OFF_TOPIC_REPLIES.iter().map(ToString::to_string).collect(),
            internal_error: INTERNAL_ERROR_MESSAGE.to_string(),
            synthesis_failure: SYNTHESIS_FAILURE_TEMPLATE.to_string(),
        }
    }
}

impl CannedReplies {
    /// Replace the greeting
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    /// Replace the help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// Replace the off-topic deflections
    pub fn with_off_topic(mut self, replies: Vec<String>) -> Self {
        self.off_topic = replies;
        self
    }

    /// Check the replies are usable
    pub fn validate(&self) -> Result<()> {
        if self.off_topic.is_empty() {
            return Err(Error::Configuration(
                "at least one off-topic reply is required".to_string(),
            ));
        }
        if !self.synthesis_failure.contains(SUBJECT_PLACEHOLDER) {
            return Err(Error::Configuration(format!(
                "synthesis failure template must contain {SUBJECT_PLACEHOLDER}"
            )));
        }
        Ok(())
    }

    /// A random off-topic deflection
    pub fn off_topic_reply(&self) -> &str {
        self.off_topic
            .choose(&mut rand::thread_rng())
            .map_or(OFF_TOPIC_REPLIES[0], String::as_str)
    }

    /// Apology naming the subject of the failed synthesis
    pub fn synthesis_failure(&self, subject: &str) -> String {
        self.synthesis_failure.replace(SUBJECT_PLACEHOLDER, subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let replies = CannedReplies::default();
        assert!(replies.validate().is_ok());
        assert_eq!(replies.greeting, GREETING_MESSAGE);
    }

    #[test]
    fn test_off_topic_reply_comes_from_list() {
        let replies = CannedReplies::default();
        for _ in 0..20 {
            assert!(OFF_TOPIC_REPLIES.contains(&replies.off_topic_reply()));
        }
    }

    #[test]
    fn test_synthesis_failure_names_subject() {
        let replies = CannedReplies::default();
        assert_eq!(
            replies.synthesis_failure("Infosys Ltd"),
            "Failed to generate the AI-powered analysis for Infosys Ltd. An API error occurred."
        );
    }

    #[test]
    fn test_empty_off_topic_rejected() {
        let replies = CannedReplies::default().with_off_topic(vec![]);
        assert!(matches!(replies.validate(), Err(Error::Configuration(_))));
    }
}
