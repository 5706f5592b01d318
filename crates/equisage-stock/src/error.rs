//! Error types for the stock collaborators

use equisage_core::SlotKey;
use equisage_llm::LLMError;
use thiserror::Error;

/// Errors raised by the concrete collaborators
#[derive(Debug, Error)]
pub enum StockError {
    /// Upstream service answered with an error
    #[error("API error: {0}")]
    ApiError(String),

    /// Ticker cannot be mapped to a source page
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Data not available for the requested symbol
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Yahoo Finance API error
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// Page layout did not match what the scraper expects
    #[error("Parse error: {0}")]
    ParseError(String),

    /// RSS feed could not be read
    #[error("Feed error: {0}")]
    FeedError(String),

    /// Technical indicator calculation error
    #[error("Technical indicator error: {0}")]
    IndicatorError(String),

    /// Prompt template error
    #[error("Template error: {0}")]
    TemplateError(#[from] minijinja::Error),

    /// Language model failure
    #[error(transparent)]
    LlmError(#[from] LLMError),

    /// Session database failure
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// Telegram API failure
    #[error("Telegram error: {0}")]
    TelegramError(#[from] teloxide::RequestError),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Orchestrator or collaborator contract error
    #[error(transparent)]
    Core(#[from] equisage_core::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for stock operations
pub type Result<T> = std::result::Result<T, StockError>;

impl StockError {
    /// Report this failure as a collector error for `slot`
    pub fn into_collector(self, slot: SlotKey) -> equisage_core::Error {
        match self {
            Self::ConfigError(msg) => equisage_core::Error::Configuration(msg),
            Self::Core(err @ equisage_core::Error::Configuration(_)) => err,
            other => equisage_core::Error::collector(slot, other.to_string()),
        }
    }
}

/// Convert StockError to equisage_core::Error
impl From<StockError> for equisage_core::Error {
    fn from(err: StockError) -> Self {
        match err {
            StockError::ConfigError(msg) => Self::Configuration(msg),
            StockError::Core(err) => err,
            StockError::LlmError(err) => err.into(),
            StockError::TemplateError(err) => Self::Synthesis(format!("template error: {err}")),
            StockError::DatabaseError(err) => Self::Storage(err.to_string()),
            other => Self::Generic(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StockError::InvalidSymbol("".to_string());
        assert_eq!(err.to_string(), "Invalid symbol: ");

        let err = StockError::DataUnavailable {
            symbol: "TCS.NS".to_string(),
            reason: "company page not found".to_string(),
        };
        assert_eq!(err.to_string(), "Data not available for TCS.NS: company page not found");
    }

    #[test]
    fn test_collector_conversion() {
        let err =
            StockError::ParseError("no ratios".to_string()).into_collector(SlotKey::Fundamentals);
        match err {
            equisage_core::Error::Collector { collector, message } => {
                assert_eq!(collector, SlotKey::Fundamentals);
                assert!(message.contains("no ratios"));
            }
            other => panic!("Expected Collector variant, got {other:?}"),
        }

        let err =
            StockError::ConfigError("charts dir".to_string()).into_collector(SlotKey::Technicals);
        assert!(matches!(err, equisage_core::Error::Configuration(_)));
    }

    #[test]
    fn test_core_conversion() {
        let err: equisage_core::Error =
            StockError::LlmError(LLMError::RequestFailed("503".to_string())).into();
        assert!(matches!(err, equisage_core::Error::Synthesis(_)));

        let err: equisage_core::Error = StockError::Other("boom".to_string()).into();
        assert_eq!(err, equisage_core::Error::Generic("boom".to_string()));
    }
}
