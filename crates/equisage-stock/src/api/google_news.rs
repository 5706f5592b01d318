//! Google News RSS search client

use super::{http_client, send_with_retry};
use crate::cache::{CacheKey, StockCache};
use crate::config::StockConfig;
use crate::error::{Result, StockError};
use equisage_core::Article;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use rss::Channel;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const GOOGLE_NEWS_SEARCH_URL: &str = "https://news.google.com/rss/search";

/// One news search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsQuery {
    /// Search expression
    pub terms: String,
    /// Only articles from the last `window_days` days
    pub window_days: u32,
    /// Maximum articles returned
    pub limit: usize,
    /// Market topic recorded on every returned article
    pub topic: Option<String>,
}

impl NewsQuery {
    /// Create a query without a topic label
    pub fn new(terms: impl Into<String>, window_days: u32, limit: usize) -> Self {
        Self {
            terms: terms.into(),
            window_days,
            limit,
            topic: None,
        }
    }

    /// Label the results with a market topic
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    fn search_expression(&self) -> String {
        format!("{} when:{}d", self.terms, self.window_days)
    }
}

/// Rate limited, cached Google News client (India edition)
#[derive(Clone)]
pub struct GoogleNewsClient {
    client: Client,
    config: StockConfig,
    base_url: String,
    rate_limiter: SharedRateLimiter,
    cache: StockCache<Vec<Article>>,
}

impl GoogleNewsClient {
    /// Create a client from the stock configuration
    pub fn new(config: &StockConfig) -> Result<Self> {
        let per_second = NonZeroU32::new(config.news_requests_per_second).ok_or_else(|| {
            StockError::ConfigError("news_requests_per_second must be greater than 0".to_string())
        })?;

        Ok(Self {
            client: http_client(config)?,
            config: config.clone(),
            base_url: GOOGLE_NEWS_SEARCH_URL.to_string(),
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_second(per_second))),
            cache: StockCache::new(config.cache_ttl_news),
        })
    }

    /// Point the client at another feed endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Run one search
    pub async fn search(&self, query: &NewsQuery) -> Result<Vec<Article>> {
        let key = CacheKey::new(query.search_expression(), format!("news:{}", query.limit));
        let mut articles = self.cache.get_or_fetch(key, || self.fetch(query)).await?;

        // Cached entries are shared across topics
        for article in &mut articles {
            article.topic.clone_from(&query.topic);
        }
        Ok(articles)
    }

    async fn fetch(&self, query: &NewsQuery) -> Result<Vec<Article>> {
        self.rate_limiter.until_ready().await;

        let expression = query.search_expression();
        let params = [
            ("q", expression.as_str()),
            ("hl", "en-IN"),
            ("gl", "IN"),
            ("ceid", "IN:en"),
        ];
        let response = send_with_retry(&self.config, || {
            self.client.get(&self.base_url).query(&params)
        })
        .await?;

        if !response.status().is_success() {
            return Err(StockError::ApiError(format!(
                "news search answered {}",
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        let articles = parse_feed(&bytes, query.limit)?;
        debug!(query = %expression, articles = articles.len(), "News search done");
        Ok(articles)
    }
}

/// Read up to `limit` articles from an RSS document
///
/// Items without a title or link are skipped.
pub fn parse_feed(bytes: &[u8], limit: usize) -> Result<Vec<Article>> {
    let channel = Channel::read_from(bytes).map_err(|e| StockError::FeedError(e.to_string()))?;

    Ok(channel
        .items()
        .iter()
        .filter_map(|item| {
            let title = item.title()?.trim();
            let url = item.link()?.trim();
            if title.is_empty() || url.is_empty() {
                return None;
            }
            Some(Article {
                title: title.to_string(),
                url: url.to_string(),
                published: item.pub_date().map(ToString::to_string),
                source: item
                    .source()
                    .and_then(|source| source.title())
                    .map(ToString::to_string),
                summary: item.description().map(ToString::to_string),
                topic: None,
            })
        })
        .take(limit)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>"Infosys" OR "INFY.NS" stock news India - Google News</title>
    <link>https://news.google.com</link>
    <description>Google News</description>
    <item>
      <title>Infosys Q4 results: profit rises 8% - The Economic Times</title>
      <link>https://news.google.com/articles/abc</link>
      <pubDate>Thu, 18 Apr 2024 11:02:00 GMT</pubDate>
      <source url="https://economictimes.indiatimes.com">The Economic Times</source>
    </item>
    <item>
      <title></title>
      <link>https://news.google.com/articles/empty</link>
    </item>
    <item>
      <title>Infosys wins $1.5 bn deal - Mint</title>
      <link>https://news.google.com/articles/def</link>
    </item>
    <item>
      <title>Infosys ADR slips - Reuters</title>
      <link>https://news.google.com/articles/ghi</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_feed() {
        let articles = parse_feed(FEED.as_bytes(), 10).unwrap();
        assert_eq!(articles.len(), 3);
        assert_eq!(articles[0].source.as_deref(), Some("The Economic Times"));
        assert_eq!(articles[0].published.as_deref(), Some("Thu, 18 Apr 2024 11:02:00 GMT"));
        assert!(articles[1].source.is_none());
    }

    #[test]
    fn test_parse_feed_limit() {
        let articles = parse_feed(FEED.as_bytes(), 2).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[1].title, "Infosys wins $1.5 bn deal - Mint");
    }

    #[test]
    fn test_parse_feed_rejects_garbage() {
        let err = parse_feed(b"<html>captcha</html>", 5).unwrap_err();
        assert!(matches!(err, StockError::FeedError(_)));
    }

    #[test]
    fn test_search_expression() {
        let query = NewsQuery::new("\"TCS\" stock news India", 14, 7).with_topic("IT");
        assert_eq!(query.search_expression(), "\"TCS\" stock news India when:14d");
        assert_eq!(query.topic.as_deref(), Some("IT"));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_live_search() {
        let client = GoogleNewsClient::new(&StockConfig::default()).unwrap();
        let articles = client
            .search(&NewsQuery::new("RBI interest rate decision", 7, 3))
            .await
            .unwrap();
        assert!(articles.len() <= 3);
    }
}
