//! Fundamentals from the Screener company page

use crate::api::ScreenerClient;
use async_trait::async_trait;
use equisage_core::{Fundamentals, FundamentalsFetcher, SlotKey};
use tracing::info;

/// Reads ratios, quarterly results and shareholding from Screener
pub struct ScreenerFundamentals {
    client: ScreenerClient,
}

impl ScreenerFundamentals {
    /// Wrap a Screener client
    pub fn new(client: ScreenerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FundamentalsFetcher for ScreenerFundamentals {
    async fn fetch(&self, ticker: &str) -> equisage_core::Result<Fundamentals> {
        info!(ticker, "Fetching fundamentals");
        let fundamentals = self
            .client
            .company(ticker)
            .await
            .map_err(|e| e.into_collector(SlotKey::Fundamentals))?;
        info!(
            ticker,
            company = %fundamentals.company_name,
            ratios = fundamentals.key_ratios.len(),
            "Fundamentals ready"
        );
        Ok(fundamentals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StockConfig;
    use equisage_core::Error;

    #[tokio::test]
    async fn test_invalid_ticker_is_collector_error() {
        let client = ScreenerClient::new(&StockConfig::default()).unwrap();
        let fetcher = ScreenerFundamentals::new(client);

        let err = fetcher.fetch("BAD TICKER!").await.unwrap_err();
        match err {
            Error::Collector { collector, message } => {
                assert_eq!(collector, SlotKey::Fundamentals);
                assert!(message.contains("Invalid symbol"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_live_fundamentals() {
        let client = ScreenerClient::new(&StockConfig::default()).unwrap();
        let fundamentals = ScreenerFundamentals::new(client).fetch("INFY.NS").await.unwrap();
        assert!(fundamentals.company_name.contains("Infosys"));
        assert!(!fundamentals.key_ratios.is_empty());
    }
}
