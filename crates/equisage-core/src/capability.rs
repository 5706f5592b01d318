//! Collaborator traits consumed by the orchestrator
//!
//! Every external capability (classification, data collection, synthesis,
//! rendering) is reached through one of these narrow traits and injected as
//! an `Arc<dyn Trait>`. The orchestrator never names a concrete client.

use crate::error::Result;
use crate::payload::{Article, Fundamentals, Technicals};
use crate::session::SessionPayload;
use crate::state::{Classification, ConversationState, DialogueMessage, FollowUpJudgment};
use async_trait::async_trait;
use std::path::PathBuf;

/// Maps a raw message to an intent and, when possible, a ticker
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Classify `message`; `prior` holds the earlier dialogue, oldest first
    async fn classify(&self, message: &str, prior: &[DialogueMessage]) -> Result<Classification>;
}

/// Judges a message against the topic of the previous analysis
#[async_trait]
pub trait FollowUpClassifier: Send + Sync {
    /// Decide whether `message` continues `prior_topic`
    async fn judge(&self, message: &str, prior_topic: &str) -> Result<FollowUpJudgment>;
}

/// Fetches company fundamentals
#[async_trait]
pub trait FundamentalsFetcher: Send + Sync {
    /// Fetch fundamentals for `ticker`
    async fn fetch(&self, ticker: &str) -> Result<Fundamentals>;
}

/// Computes technical indicators from price history
#[async_trait]
pub trait TechnicalsFetcher: Send + Sync {
    /// Fetch technicals for `ticker`
    async fn fetch(&self, ticker: &str, company_name: &str) -> Result<Technicals>;
}

/// Fetches recent company news
///
/// An empty list is a valid outcome, not an error.
#[async_trait]
pub trait CompanyNewsFetcher: Send + Sync {
    /// Fetch news about the company
    async fn fetch(&self, ticker: &str, company_name: &str) -> Result<Vec<Article>>;
}

/// Fetches market-wide news
#[async_trait]
pub trait MarketNewsFetcher: Send + Sync {
    /// Fetch macro and market news
    async fn fetch(&self) -> Result<Vec<Article>>;
}

/// Produces the user-facing text of an analysis or a follow-up answer
#[async_trait]
pub trait ReportSynthesizer: Send + Sync {
    /// Write the full report from the joined state
    async fn synthesize_report(&self, state: &ConversationState) -> Result<String>;

    /// Answer a follow-up question from a restored session only
    async fn answer_follow_up(&self, message: &str, session: &SessionPayload) -> Result<String>;
}

/// Renders a report into a shareable document
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// Render `report`; `Ok(None)` means no document was produced
    async fn render(&self, state: &ConversationState, report: &str) -> Result<Option<PathBuf>>;
}
