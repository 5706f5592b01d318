//! Company and market news from Google News

use crate::api::{GoogleNewsClient, NewsQuery};
use crate::config::StockConfig;
use crate::error::{Result, StockError};
use async_trait::async_trait;
use equisage_core::{Article, CompanyNewsFetcher, MarketNewsFetcher, SlotKey};
use futures::future::join_all;
use std::collections::HashSet;
use tracing::{info, warn};

/// Search terms for a company: quoted name or bare symbol
pub fn company_search_terms(ticker: &str, company_name: &str) -> String {
    let symbol = ticker
        .split_once('.')
        .map_or(ticker, |(symbol, _)| symbol);
    if company_name.trim().is_empty() || company_name.eq_ignore_ascii_case(symbol) {
        format!("\"{symbol}\" stock news India")
    } else {
        format!("\"{}\" OR \"{symbol}\" stock news India", company_name.trim())
    }
}

/// Recent news about one company
pub struct GoogleCompanyNews {
    client: GoogleNewsClient,
    window_days: u32,
    limit: usize,
}

impl GoogleCompanyNews {
    /// Create a fetcher with the configured window and limit
    pub fn new(client: GoogleNewsClient, config: &StockConfig) -> Self {
        Self {
            client,
            window_days: config.company_news_window_days,
            limit: config.company_news_limit,
        }
    }
}

#[async_trait]
impl CompanyNewsFetcher for GoogleCompanyNews {
    async fn fetch(&self, ticker: &str, company_name: &str) -> equisage_core::Result<Vec<Article>> {
        let query = NewsQuery::new(
            company_search_terms(ticker, company_name),
            self.window_days,
            self.limit,
        );
        let articles = self
            .client
            .search(&query)
            .await
            .map_err(|e| e.into_collector(SlotKey::CompanyNews))?;
        info!(ticker, articles = articles.len(), "Company news ready");
        Ok(articles)
    }
}

/// Macro and market news across a fixed topic list
pub struct GoogleMarketNews {
    client: GoogleNewsClient,
    topics: Vec<String>,
    window_days: u32,
    per_topic: usize,
    limit: usize,
}

impl GoogleMarketNews {
    /// Create a fetcher over the configured topics
    pub fn new(client: GoogleNewsClient, config: &StockConfig) -> Self {
        Self {
            client,
            topics: config.market_topics.clone(),
            window_days: config.market_news_window_days,
            per_topic: config.market_news_per_topic,
            limit: config.market_news_limit,
        }
    }
}

/// Merge per-topic results in topic order
///
/// Takes at most `per_topic` articles from each topic, drops repeated URLs
/// and stops at `limit`. A failed topic is skipped; the merge only fails when
/// every topic failed.
pub fn merge_topics(
    results: Vec<(String, Result<Vec<Article>>)>,
    per_topic: usize,
    limit: usize,
) -> Result<Vec<Article>> {
    let total = results.len();
    let mut failures = Vec::new();
    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(limit);

    for (topic, result) in results {
        let articles = match result {
            Ok(articles) => articles,
            Err(err) => {
                warn!(topic = %topic, "Market news topic failed: {}", err);
                failures.push(format!("{topic}: {err}"));
                continue;
            }
        };
        for article in articles.into_iter().take(per_topic) {
            if merged.len() >= limit {
                break;
            }
            if seen.insert(article.url.clone()) {
                merged.push(article);
            }
        }
    }

    if total > 0 && failures.len() == total {
        return Err(StockError::ApiError(format!(
            "every market topic failed ({})",
            failures.join("; ")
        )));
    }
    Ok(merged)
}

#[async_trait]
impl MarketNewsFetcher for GoogleMarketNews {
    async fn fetch(&self) -> equisage_core::Result<Vec<Article>> {
        let searches = self.topics.iter().map(|topic| async move {
            let query = NewsQuery::new(topic.clone(), self.window_days, self.per_topic)
                .with_topic(topic.clone());
            (topic.clone(), self.client.search(&query).await)
        });
        let results = join_all(searches).await;

        let articles = merge_topics(results, self.per_topic, self.limit)
            .map_err(|e| e.into_collector(SlotKey::MarketNews))?;
        info!(articles = articles.len(), topics = self.topics.len(), "Market news ready");
        Ok(articles)
    }
}
