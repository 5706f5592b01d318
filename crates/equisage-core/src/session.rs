//! Session continuity contract
//!
//! A session record holds the last completed analysis of a conversation so a
//! later message can be answered as a follow-up. The store is
//! last-write-wins: `save` replaces any existing record and refreshes its
//! timestamp, `load` returns the most recent record.

use crate::error::{Error, Result};
use crate::payload::{Article, Fundamentals, Technicals};
use crate::slot::Slot;
use crate::state::ConversationId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Payload of a completed analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPayload {
    /// Company display name
    pub company_name: String,
    /// Exchange ticker
    pub ticker: String,
    /// Fundamentals (always populated for a saved session)
    pub fundamentals: Fundamentals,
    /// Technicals without transient artifacts
    pub technicals: Slot<Technicals>,
    /// Company news
    pub company_news: Slot<Vec<Article>>,
    /// Market news
    pub market_news: Slot<Vec<Article>>,
    /// The report that was sent to the user
    #[serde(default)]
    pub report: String,
}

impl SessionPayload {
    /// Topic label handed to the follow-up classifier
    pub fn topic(&self) -> &str {
        if self.company_name.is_empty() {
            &self.ticker
        } else {
            &self.company_name
        }
    }
}

/// Persisted session for one conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Owning conversation
    pub conversation_id: ConversationId,
    /// Last completed analysis
    pub payload: SessionPayload,
    /// Set by the store on every save
    pub updated_at: DateTime<Utc>,
}

/// Storage for session records
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the most recent record for a conversation
    async fn load(&self, conversation_id: &ConversationId) -> Result<Option<SessionRecord>>;

    /// Insert or replace the record for a conversation
    async fn save(&self, conversation_id: &ConversationId, payload: SessionPayload) -> Result<()>;
}

/// Process-local session store
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<ConversationId, SessionRecord>>>,
}

impl InMemorySessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, conversation_id: &ConversationId) -> Result<Option<SessionRecord>> {
        Ok(self.sessions.read().await.get(conversation_id).cloned())
    }

    async fn save(&self, conversation_id: &ConversationId, payload: SessionPayload) -> Result<()> {
        if payload.ticker.is_empty() {
            return Err(Error::Storage("refusing to save a session without a ticker".to_string()));
        }
        let record = SessionRecord {
            conversation_id: conversation_id.clone(),
            payload,
            updated_at: Utc::now(),
        };
        self.sessions
            .write()
            .await
            .insert(conversation_id.clone(), record);
        tracing::debug!(conversation = %conversation_id, "Session saved");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::payload::Table;

    pub(crate) fn payload(company: &str, ticker: &str) -> SessionPayload {
        SessionPayload {
            company_name: company.to_string(),
            ticker: ticker.to_string(),
            fundamentals: Fundamentals {
                company_name: company.to_string(),
                source_url: String::new(),
                key_ratios: vec![],
                pros: vec![],
                cons: vec![],
                quarterly_results: Table::default(),
                shareholding_pattern: Table::default(),
            },
            technicals: Slot::Empty,
            company_news: Slot::Ready(vec![]),
            market_news: Slot::Empty,
            report: String::new(),
        }
    }

    #[tokio::test]
    async fn test_load_missing() {
        let store = InMemorySessionStore::new();
        let record = store.load(&ConversationId::from(42_i64)).await.unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = InMemorySessionStore::new();
        let id = ConversationId::from(7_i64);

        store.save(&id, payload("Infosys Ltd", "INFY.NS")).await.unwrap();
        let first = store.load(&id).await.unwrap().unwrap();

        store.save(&id, payload("Wipro Ltd", "WIPRO.NS")).await.unwrap();
        let second = store.load(&id).await.unwrap().unwrap();

        assert_eq!(second.payload.ticker, "WIPRO.NS");
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_conversations_are_isolated() {
        let store = InMemorySessionStore::new();
        store
            .save(&ConversationId::from(1_i64), payload("Infosys Ltd", "INFY.NS"))
            .await
            .unwrap();

        assert!(store.load(&ConversationId::from(2_i64)).await.unwrap().is_none());
    }

    #[test]
    fn test_topic_falls_back_to_ticker() {
        let mut p = payload("", "TCS.NS");
        assert_eq!(p.topic(), "TCS.NS");
        p.company_name = "Tata Consultancy Services".to_string();
        assert_eq!(p.topic(), "Tata Consultancy Services");
    }
}
