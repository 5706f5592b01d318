//! SQLite session store

use crate::error::{Result, StockError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use equisage_core::{ConversationId, SessionPayload, SessionRecord, SessionStore};
use sqlx::ConnectOptions;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS sessions (
    chat_id TEXT PRIMARY KEY,
    state_json TEXT NOT NULL,
    last_updated TEXT NOT NULL
)";

/// One row per conversation, replaced on every save
#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Open (or create) the database at `db_path` and ensure the schema
    pub async fn open(db_path: &Path) -> Result<Self> {
        info!("Opening session database at: {}", db_path.display());

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .disable_statement_logging();
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        debug!("Session schema ready");
        Ok(())
    }

    /// Number of stored sessions
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM sessions")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    async fn fetch(&self, conversation_id: &ConversationId) -> Result<Option<SessionRecord>> {
        let row = sqlx::query("SELECT state_json, last_updated FROM sessions WHERE chat_id = ?")
            .bind(conversation_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let state_json: String = row.get("state_json");
        let last_updated: String = row.get("last_updated");
        let payload: SessionPayload = serde_json::from_str(&state_json)?;
        let updated_at = DateTime::parse_from_rfc3339(&last_updated)
            .map_err(|e| StockError::ParseError(format!("bad session timestamp: {e}")))?
            .with_timezone(&Utc);

        Ok(Some(SessionRecord {
            conversation_id: conversation_id.clone(),
            payload,
            updated_at,
        }))
    }

    async fn upsert(
        &self,
        conversation_id: &ConversationId,
        payload: &SessionPayload,
    ) -> Result<()> {
        if payload.ticker.is_empty() {
            return Err(StockError::Other(
                "refusing to save a session without a ticker".to_string(),
            ));
        }
        let state_json = serde_json::to_string(payload)?;
        sqlx::query(
            r"
            INSERT INTO sessions (chat_id, state_json, last_updated)
            VALUES (?, ?, ?)
            ON CONFLICT(chat_id) DO UPDATE SET
                state_json = excluded.state_json,
                last_updated = excluded.last_updated
            ",
        )
        .bind(conversation_id.as_str())
        .bind(state_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        debug!(conversation = %conversation_id, ticker = %payload.ticker, "Session saved");
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(
        &self,
        conversation_id: &ConversationId,
    ) -> equisage_core::Result<Option<SessionRecord>> {
        self.fetch(conversation_id)
            .await
            .map_err(|e| equisage_core::Error::Storage(e.to_string()))
    }

    async fn save(
        &self,
        conversation_id: &ConversationId,
        payload: SessionPayload,
    ) -> equisage_core::Result<()> {
        self.upsert(conversation_id, &payload)
            .await
            .map_err(|e| equisage_core::Error::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equisage_core::{Fundamentals, Slot, Table};

    fn payload(ticker: &str, report: &str) -> SessionPayload {
        SessionPayload {
            company_name: format!("{ticker} Ltd"),
            ticker: ticker.to_string(),
            fundamentals: Fundamentals {
                company_name: format!("{ticker} Ltd"),
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
            report: report.to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteSessionStore::open(&dir.path().join("db/sessions.db")).await.unwrap();
        let id = ConversationId::from(42_i64);

        assert!(store.load(&id).await.unwrap().is_none());
        store.save(&id, payload("TCS.NS", "first")).await.unwrap();

        let record = store.load(&id).await.unwrap().unwrap();
        assert_eq!(record.conversation_id, id);
        assert_eq!(record.payload, payload("TCS.NS", "first"));
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteSessionStore::open(&dir.path().join("sessions.db")).await.unwrap();
        let id = ConversationId::from(7_i64);

        store.save(&id, payload("TCS.NS", "first")).await.unwrap();
        let first = store.load(&id).await.unwrap().unwrap();
        store.save(&id, payload("INFY.NS", "second")).await.unwrap();
        let second = store.load(&id).await.unwrap().unwrap();

        assert_eq!(second.payload.ticker, "INFY.NS");
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        let id = ConversationId::from("chat-1");
        {
            let store = SqliteSessionStore::open(&path).await.unwrap();
            store.save(&id, payload("ITC.NS", "report")).await.unwrap();
        }
        let store = SqliteSessionStore::open(&path).await.unwrap();
        assert_eq!(store.load(&id).await.unwrap().unwrap().payload.ticker, "ITC.NS");
    }

    #[tokio::test]
    async fn test_rejects_empty_ticker() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteSessionStore::open(&dir.path().join("sessions.db")).await.unwrap();
        let err = store
            .save(&ConversationId::from(1_i64), payload("", "report"))
            .await
            .unwrap_err();
        assert!(matches!(err, equisage_core::Error::Storage(_)));
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
