//! Core abstractions for the equisage orchestrator
//!
//! This crate defines the types every other equisage crate agrees on:
//!
//! - [`ConversationState`], the single record threaded through one turn
//! - [`Slot`], the tri-state container for collector results
//! - the collaborator traits in [`capability`] that the orchestrator consumes
//! - the session continuity contract in [`session`]
//! - the shared [`Error`] taxonomy
//!
//! Nothing here performs I/O on its own; concrete collaborators live in
//! `equisage-stock`.

pub mod capability;
pub mod error;
pub mod payload;
pub mod session;
pub mod slot;
pub mod state;

pub use capability::{
    CompanyNewsFetcher, DocumentRenderer, FollowUpClassifier, FundamentalsFetcher,
    IntentClassifier, MarketNewsFetcher, ReportSynthesizer, TechnicalsFetcher,
};
pub use error::{Error, Result};
pub use payload::{Article, Fundamentals, Indicator, Metric, Table, TableRow, Technicals};
pub use session::{InMemorySessionStore, SessionPayload, SessionRecord, SessionStore};
pub use slot::{CollectorError, Slot, SlotKey};
pub use state::{
    Attachment, AttachmentKind, Classification, ConversationId, ConversationState,
    DialogueMessage, FollowUpJudgment, Intent, Role, RoutingDecision, TurnResponse,
};
