//! Payload types produced by the data collectors

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A named value scraped from a ratio panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    /// Display name, e.g. "Stock P/E"
    pub name: String,
    /// Display value as shown by the source, e.g. "24.3"
    pub value: String,
}

impl Metric {
    /// Create a new metric
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One row of a financial table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    /// Row label, e.g. "Sales" or "Promoters"
    pub metric: String,
    /// One value per column header
    pub values: Vec<String>,
}

/// A financial table (quarterly results, shareholding pattern)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Table {
    /// Column headers, typically period labels
    pub headers: Vec<String>,
    /// Rows in source order
    pub rows: Vec<TableRow>,
}

impl Table {
    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Find a row by its label, ignoring case and trailing `+` markers
    pub fn row(&self, metric: &str) -> Option<&TableRow> {
        let wanted = metric.trim().to_lowercase();
        self.rows
            .iter()
            .find(|row| row.metric.trim_end_matches('+').trim().to_lowercase() == wanted)
    }
}

/// Company fundamentals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fundamentals {
    /// Company display name
    pub company_name: String,
    /// Page the data was read from
    pub source_url: String,
    /// Top ratios in source order
    pub key_ratios: Vec<Metric>,
    /// Strengths listed by the source
    pub pros: Vec<String>,
    /// Weaknesses listed by the source
    pub cons: Vec<String>,
    /// Quarterly results table
    pub quarterly_results: Table,
    /// Shareholding pattern table
    pub shareholding_pattern: Table,
}

impl Fundamentals {
    /// Look up a key ratio by name (case-insensitive)
    pub fn ratio(&self, name: &str) -> Option<&str> {
        self.key_ratios
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .map(|m| m.value.as_str())
    }
}

/// A single technical indicator reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    /// Indicator name, e.g. "RSI (14)"
    pub name: String,
    /// Latest numeric value, when meaningful
    pub value: Option<f64>,
    /// Interpretation, e.g. "Overbought" or "Bullish Crossover"
    pub signal: String,
}

/// Technical analysis summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technicals {
    /// Latest closing price
    pub last_close: f64,
    /// Date of the latest close (YYYY-MM-DD)
    pub as_of: String,
    /// Indicator readings in display order
    pub indicators: Vec<Indicator>,
    /// Rendered chart image; transient and never persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_path: Option<PathBuf>,
}

impl Technicals {
    /// Copy of this summary without transient artifacts
    pub fn without_artifacts(&self) -> Self {
        Self {
            chart_path: None,
            ..self.clone()
        }
    }

    /// Look up an indicator by name prefix
    pub fn indicator(&self, prefix: &str) -> Option<&Indicator> {
        self.indicators.iter().find(|i| i.name.starts_with(prefix))
    }
}

/// A news article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Headline
    pub title: String,
    /// Canonical link, also the de-duplication key
    pub url: String,
    /// Publication timestamp as provided by the feed
    pub published: Option<String>,
    /// Publisher name
    pub source: Option<String>,
    /// Short description
    pub summary: Option<String>,
    /// Market topic the article was found under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}
