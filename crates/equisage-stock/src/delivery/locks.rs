//! Per-conversation serialization
//!
//! Session stores are last-write-wins with no transaction around the
//! load/save pair, so two turns for the same conversation must not overlap.
//! Delivery adapters take a [`ConversationLocks`] guard before running the
//! orchestrator; turns for different conversations still run in parallel.

use equisage_core::ConversationId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Lock table keyed by conversation
#[derive(Debug, Clone, Default)]
pub struct ConversationLocks {
    locks: Arc<Mutex<HashMap<ConversationId, Arc<AsyncMutex<()>>>>>,
}

impl ConversationLocks {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, conversation_id: &ConversationId) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        locks.entry(conversation_id.clone()).or_default().clone()
    }

    /// Wait until no other turn holds `conversation_id`
    pub async fn lock(&self, conversation_id: &ConversationId) -> OwnedMutexGuard<()> {
        self.entry(conversation_id).lock_owned().await
    }

    /// Drop entries nobody holds or waits on
    pub fn prune(&self) -> usize {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - locks.len()
    }

    /// Number of tracked conversations
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether no conversation is tracked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
