//! Collector result slots
//!
//! Each data collector owns exactly one slot in [`ConversationState`]. A slot
//! is empty until its collector runs, then holds either the payload or an
//! error marker. The enum makes "payload and error at once" unrepresentable.
//!
//! [`ConversationState`]: crate::ConversationState

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a result slot and the collector that writes it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKey {
    /// Company fundamentals (ratios, results, shareholding)
    Fundamentals,
    /// Price history indicators
    Technicals,
    /// Recent company-specific news
    CompanyNews,
    /// Macro and market-wide news
    MarketNews,
}

impl SlotKey {
    /// Stable lowercase name, also used in logs and stored payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fundamentals => "fundamentals",
            Self::Technicals => "technicals",
            Self::CompanyNews => "company_news",
            Self::MarketNews => "market_news",
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error marker stored in a slot when its collector failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorError {
    /// Slot whose collector failed
    pub collector: SlotKey,
    /// Human readable failure description
    pub message: String,
}

impl CollectorError {
    /// Create a new error marker
    pub fn new(collector: SlotKey, message: impl Into<String>) -> Self {
        Self {
            collector,
            message: message.into(),
        }
    }

    /// Build a marker from any error, keeping the collector's own message
    /// when the error already names a collector
    pub fn from_error(collector: SlotKey, err: &Error) -> Self {
        match err {
            Error::Collector { message, .. } => Self::new(collector, message.clone()),
            other => Self::new(collector, other.to_string()),
        }
    }
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} unavailable: {}", self.collector, self.message)
    }
}

/// A collector result slot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Slot<T> {
    /// The collector has not run
    #[default]
    Empty,
    /// The collector produced a payload
    Ready(T),
    /// The collector failed
    Failed(CollectorError),
}

impl<T> Slot<T> {
    /// Convert a collector result into a slot
    pub fn from_result(collector: SlotKey, result: crate::Result<T>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(err) => Self::Failed(CollectorError::from_error(collector, &err)),
        }
    }

    /// Whether the slot is still empty
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Whether the slot holds a payload
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Whether the slot holds an error marker
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Borrow the payload, if any
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Borrow the error marker, if any
    pub fn error(&self) -> Option<&CollectorError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Map the payload, keeping empty and failed states
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Slot<U> {
        match self {
            Self::Empty => Slot::Empty,
            Self::Ready(value) => Slot::Ready(f(value)),
            Self::Failed(err) => Slot::Failed(err),
        }
    }
}
