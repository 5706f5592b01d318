//! Conversational workflow orchestration for equisage
//!
//! This crate provides:
//! - The fixed turn graph and its validation ([`topology`])
//! - Per-message routing ([`router`])
//! - Fork/join over the independent collectors ([`fork_join`])
//! - The [`Orchestrator`] that drives a turn from ROUTER to END

pub mod fork_join;
pub mod orchestrator;
pub mod replies;
pub mod router;
pub mod topology;

#[cfg(test)]
mod testing;

pub use fork_join::{
    Branch, CompanyNewsBranch, ForkJoin, MarketNewsBranch, SlotPatch, TechnicalsBranch,
};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use replies::CannedReplies;
pub use router::{decide, Router};
pub use topology::{Node, Topology, Walk, EDGES};
