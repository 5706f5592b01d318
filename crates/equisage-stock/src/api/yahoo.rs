//! Yahoo Finance price history client

use crate::cache::{CacheKey, StockCache};
use crate::config::StockConfig;
use crate::error::{Result, StockError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;
use yahoo_finance_api as yahoo;

/// One daily bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Yahoo Finance client with a short-lived history cache
#[derive(Clone)]
pub struct YahooFinanceClient {
    cache: StockCache<Vec<Quote>>,
}

impl YahooFinanceClient {
    /// Create a new Yahoo Finance client
    pub fn new(config: &StockConfig) -> Self {
        Self {
            cache: StockCache::new(config.cache_ttl_realtime),
        }
    }

    /// Daily history between two instants, oldest first
    pub async fn get_historical_quotes(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Quote>> {
        let provider = yahoo::YahooConnector::new()
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        let start_odt = OffsetDateTime::from_unix_timestamp(start.timestamp())
            .map_err(|e| StockError::YahooFinanceError(format!("Invalid start timestamp: {e}")))?;
        let end_odt = OffsetDateTime::from_unix_timestamp(end.timestamp())
            .map_err(|e| StockError::YahooFinanceError(format!("Invalid end timestamp: {e}")))?;

        let response = provider
            .get_quote_history(symbol, start_odt, end_odt)
            .await
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        let quotes = response
            .quotes()
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        debug!(symbol, bars = quotes.len(), "Fetched price history");
        Ok(quotes
            .iter()
            .filter_map(|q| {
                let timestamp = i64::try_from(q.timestamp)
                    .ok()
                    .and_then(|secs| DateTime::from_timestamp(secs, 0))?;
                Some(Quote {
                    timestamp,
                    open: q.open,
                    high: q.high,
                    low: q.low,
                    close: q.close,
                    volume: q.volume,
                })
            })
            .collect())
    }

    /// Daily history for a named range such as "1y", cached per symbol
    pub async fn get_historical_range(&self, symbol: &str, range: &str) -> Result<Vec<Quote>> {
        let days = match range {
            "1mo" => 30,
            "3mo" => 90,
            "6mo" => 180,
            "1y" => 365,
            "2y" => 730,
            "5y" => 1825,
            _ => return Err(StockError::Other(format!("Invalid range: {range}"))),
        };

        let end = Utc::now();
        let start = end - chrono::Duration::days(days);
        self.cache
            .get_or_fetch(CacheKey::new(symbol, format!("yahoo:{range}")), || {
                self.get_historical_quotes(symbol, start, end)
            })
            .await
    }
}
