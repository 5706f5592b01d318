//! Error types for equisage-core

use crate::slot::SlotKey;
use thiserror::Error;

/// Result type alias for equisage-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type shared by the orchestrator and its collaborators
///
/// Only [`Error::ContractViolation`] and [`Error::Configuration`] are fatal
/// to a turn. Every other variant is absorbed by the orchestrator and turned
/// into a degraded reply or an error marker in a result slot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid setup: missing collaborator, empty message history
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The graph or state model was used outside its contract
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// Intent or follow-up classification failed
    #[error("Classification failed: {0}")]
    Classification(String),

    /// A data collector failed
    #[error("Collector '{collector}' failed: {message}")]
    Collector {
        /// Which collector failed
        collector: SlotKey,
        /// Failure description
        message: String,
    },

    /// Report or follow-up answer generation failed
    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    /// Session store failure
    #[error("Session storage error: {0}")]
    Storage(String),

    /// Generic error message
    #[error("{0}")]
    Generic(String),
}

impl Error {
    /// Shorthand for a collector failure
    pub fn collector(collector: SlotKey, message: impl Into<String>) -> Self {
        Self::Collector {
            collector,
            message: message.into(),
        }
    }

    /// Shorthand for a contract violation
    pub fn contract(message: impl Into<String>) -> Self {
        Self::ContractViolation(message.into())
    }

    /// Whether this error must abort the turn instead of degrading it
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ContractViolation(_) | Self::Configuration(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Generic(format!("JSON error: {err}"))
    }
}
