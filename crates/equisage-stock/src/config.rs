//! Configuration for the stock collaborators

use crate::delivery::MIN_CHUNK_SIZE;
use crate::error::{Result, StockError};
use equisage_llm::providers::OpenAIConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Telegram's hard limit for one text message
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// Macro topics searched for market-wide news
pub const DEFAULT_MARKET_TOPICS: &[&str] = &[
    "RBI interest rate decision",
    "India inflation CPI data",
    "India GDP growth forecast",
    "SEBI new regulations",
    "FII DII net investment India",
    "Crude oil prices Middle East tension",
    "OPEC+ production cuts",
    "USD INR exchange rate forecast",
];

/// Desktop browser agent sent to sites that reject bare clients
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Configuration for stock data collection, synthesis and delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockConfig {
    /// OpenAI-compatible endpoint; provider default when unset
    pub llm_api_base: Option<String>,

    /// API key for the language model
    #[serde(skip_serializing)]
    pub llm_api_key: Option<String>,

    /// Model name; provider default when unset
    pub llm_model: Option<String>,

    /// Sampling temperature for report synthesis
    pub temperature: f32,

    /// Token budget for one report
    pub max_tokens: usize,

    /// Request timeout duration
    pub request_timeout: Duration,

    /// Cache TTL for price history
    pub cache_ttl_realtime: Duration,

    /// Cache TTL for fundamental data
    pub cache_ttl_fundamental: Duration,

    /// Cache TTL for news data
    pub cache_ttl_news: Duration,

    /// Maximum number of attempts for HTTP fetches
    pub max_retries: u32,

    /// Initial backoff duration for retries
    pub retry_backoff_base: Duration,

    /// How far back company news is searched
    pub company_news_window_days: u32,

    /// Maximum company articles
    pub company_news_limit: usize,

    /// How far back market news is searched
    pub market_news_window_days: u32,

    /// Articles kept per market topic
    pub market_news_per_topic: usize,

    /// Maximum market articles overall
    pub market_news_limit: usize,

    /// Market topics, searched in order
    pub market_topics: Vec<String>,

    /// News feed requests allowed per second
    pub news_requests_per_second: u32,

    /// User agent for scraped pages
    pub user_agent: String,

    /// Where chart images are written
    pub charts_dir: PathBuf,

    /// Where report documents are written
    pub reports_dir: PathBuf,

    /// SQLite session database; in-memory sessions when unset
    pub session_db: Option<PathBuf>,

    /// Telegram bot token
    #[serde(skip_serializing)]
    pub telegram_token: Option<String>,

    /// Maximum characters per delivered message
    pub chunk_size: usize,
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            llm_api_base: None,
            llm_api_key: None,
            llm_model: None,
            temperature: 0.3,
            max_tokens: 4096,
            request_timeout: Duration::from_secs(30),
            cache_ttl_realtime: Duration::from_secs(60),      // 1 minute
            cache_ttl_fundamental: Duration::from_secs(3600), // 1 hour
            cache_ttl_news: Duration::from_secs(300),         // 5 minutes
            max_retries: 3,
            retry_backoff_base: Duration::from_secs(1),
            company_news_window_days: 14,
            company_news_limit: 7,
            market_news_window_days: 7,
            market_news_per_topic: 1,
            market_news_limit: 9,
            market_topics: DEFAULT_MARKET_TOPICS.iter().map(ToString::to_string).collect(),
            news_requests_per_second: 2,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            charts_dir: PathBuf::from("charts"),
            reports_dir: PathBuf::from("reports"),
            session_db: None,
            telegram_token: None,
            chunk_size: TELEGRAM_MESSAGE_LIMIT,
        }
    }
}

impl StockConfig {
    /// Create a new configuration builder
    pub fn builder() -> StockConfigBuilder {
        StockConfigBuilder::default()
    }

    /// Defaults overridden by environment variables
    ///
    /// Reads `LLM_API_BASE`, `LLM_API_KEY` (or `GEMINI_API_KEY`),
    /// `LLM_MODEL`, `TELEGRAM_BOT_TOKEN` and `EQUISAGE_SESSION_DB`.
    pub fn from_env() -> Result<Self> {
        Self::builder().with_env().build()
    }

    /// Point the chart and report directories below `data_dir`
    pub fn with_data_dir(mut self, data_dir: &Path) -> Self {
        self.charts_dir = data_dir.join("charts");
        self.reports_dir = data_dir.join("reports");
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(StockError::ConfigError(
                "max_retries must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(StockError::ConfigError(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }

        if !(MIN_CHUNK_SIZE..=TELEGRAM_MESSAGE_LIMIT).contains(&self.chunk_size) {
            return Err(StockError::ConfigError(format!(
                "chunk_size must be within {MIN_CHUNK_SIZE}..={TELEGRAM_MESSAGE_LIMIT}, got {}",
                self.chunk_size
            )));
        }

        if self.company_news_limit == 0 || self.market_news_per_topic == 0 {
            return Err(StockError::ConfigError(
                "news limits must be greater than 0".to_string(),
            ));
        }

        if self.market_topics.is_empty() {
            return Err(StockError::ConfigError(
                "at least one market topic is required".to_string(),
            ));
        }

        if self.news_requests_per_second == 0 {
            return Err(StockError::ConfigError(
                "news_requests_per_second must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Get retry backoff duration for attempt number
    pub fn retry_backoff(&self, attempt: u32) -> Duration {
        self.retry_backoff_base * 2_u32.pow(attempt)
    }

    /// Language model settings derived from this configuration
    pub fn openai_config(&self) -> Result<OpenAIConfig> {
        let api_key = self.llm_api_key.clone().ok_or_else(|| {
            StockError::ConfigError("neither LLM_API_KEY nor GEMINI_API_KEY is set".to_string())
        })?;

        let mut config =
            OpenAIConfig::new(api_key).with_timeout(self.request_timeout.as_secs().max(60));
        if let Some(base) = &self.llm_api_base {
            config = config.with_api_base(base.clone());
        }
        if let Some(model) = &self.llm_model {
            config = config.with_model(model.clone());
        }
        Ok(config)
    }

    /// Telegram token, required by the bot
    pub fn require_telegram_token(&self) -> Result<&str> {
        self.telegram_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| StockError::ConfigError("TELEGRAM_BOT_TOKEN not set".to_string()))
    }
}

/// Builder for StockConfig
#[derive(Debug, Default)]
pub struct StockConfigBuilder {
    llm_api_base: Option<String>,
    llm_api_key: Option<String>,
    llm_model: Option<String>,
    temperature: Option<f32>,
    request_timeout: Option<Duration>,
    cache_ttl_fundamental: Option<Duration>,
    cache_ttl_news: Option<Duration>,
    max_retries: Option<u32>,
    retry_backoff_base: Option<Duration>,
    market_topics: Option<Vec<String>>,
    charts_dir: Option<PathBuf>,
    reports_dir: Option<PathBuf>,
    session_db: Option<PathBuf>,
    telegram_token: Option<String>,
    chunk_size: Option<usize>,
}

impl StockConfigBuilder {
    /// Set the LLM endpoint
    pub fn llm_api_base(mut self, base: impl Into<String>) -> Self {
        self.llm_api_base = Some(base.into());
        self
    }

    /// Set the LLM API key
    pub fn llm_api_key(mut self, key: impl Into<String>) -> Self {
        self.llm_api_key = Some(key.into());
        self
    }

    /// Set the LLM model
    pub fn llm_model(mut self, model: impl Into<String>) -> Self {
        self.llm_model = Some(model.into());
        self
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set cache TTL for fundamental data
    pub fn cache_ttl_fundamental(mut self, duration: Duration) -> Self {
        self.cache_ttl_fundamental = Some(duration);
        self
    }

    /// Set cache TTL for news data
    pub fn cache_ttl_news(mut self, duration: Duration) -> Self {
        self.cache_ttl_news = Some(duration);
        self
    }

    /// Set maximum retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Set retry backoff base duration
    pub fn retry_backoff_base(mut self, duration: Duration) -> Self {
        self.retry_backoff_base = Some(duration);
        self
    }

    /// Replace the market topics
    pub fn market_topics(mut self, topics: Vec<String>) -> Self {
        self.market_topics = Some(topics);
        self
    }

    /// Set the chart output directory
    pub fn charts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.charts_dir = Some(dir.into());
        self
    }

    /// Set the report output directory
    pub fn reports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reports_dir = Some(dir.into());
        self
    }

    /// Set the SQLite session database path
    pub fn session_db(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_db = Some(path.into());
        self
    }

    /// Set the Telegram bot token
    pub fn telegram_token(mut self, token: impl Into<String>) -> Self {
        self.telegram_token = Some(token.into());
        self
    }

    /// Set the delivery chunk size
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size);
        self
    }

    /// Fill unset values from the environment
    pub fn with_env(mut self) -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        if self.llm_api_base.is_none() {
            self.llm_api_base = var("LLM_API_BASE");
        }
        if self.llm_api_key.is_none() {
            self.llm_api_key = var("LLM_API_KEY").or_else(|| var("GEMINI_API_KEY"));
        }
        if self.llm_model.is_none() {
            self.llm_model = var("LLM_MODEL");
        }
        if self.telegram_token.is_none() {
            self.telegram_token = var("TELEGRAM_BOT_TOKEN");
        }
        if self.session_db.is_none() {
            self.session_db = var("EQUISAGE_SESSION_DB").map(PathBuf::from);
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<StockConfig> {
        let defaults = StockConfig::default();

        let config = StockConfig {
            llm_api_base: self.llm_api_base,
            llm_api_key: self.llm_api_key,
            llm_model: self.llm_model,
            temperature: self.temperature.unwrap_or(defaults.temperature),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            cache_ttl_fundamental: self
                .cache_ttl_fundamental
                .unwrap_or(defaults.cache_ttl_fundamental),
            cache_ttl_news: self.cache_ttl_news.unwrap_or(defaults.cache_ttl_news),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_backoff_base: self.retry_backoff_base.unwrap_or(defaults.retry_backoff_base),
            market_topics: self.market_topics.unwrap_or(defaults.market_topics),
            charts_dir: self.charts_dir.unwrap_or(defaults.charts_dir),
            reports_dir: self.reports_dir.unwrap_or(defaults.reports_dir),
            session_db: self.session_db,
            telegram_token: self.telegram_token,
            chunk_size: self.chunk_size.unwrap_or(defaults.chunk_size),
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StockConfig::default();
        assert_eq!(config.company_news_limit, 7);
        assert_eq!(config.market_news_limit, 9);
        assert_eq!(config.market_topics.len(), 8);
        assert_eq!(config.chunk_size, 4096);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = StockConfig::builder()
            .llm_api_key("key")
            .llm_model("gemini-1.5-pro")
            .max_retries(5)
            .chunk_size(1000)
            .build()
            .unwrap();

        assert_eq!(config.max_retries, 5);
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.llm_model.as_deref(), Some("gemini-1.5-pro"));
    }

    #[test]
    fn test_validation_rejects_oversized_chunks() {
        let result = StockConfig::builder().chunk_size(5000).build();
        assert!(matches!(result, Err(StockError::ConfigError(_))));
    }

    #[test]
    fn test_validation_rejects_chunks_smaller_than_prefix() {
        for size in [1, 16, MIN_CHUNK_SIZE - 1] {
            let result = StockConfig::builder().chunk_size(size).build();
            assert!(matches!(result, Err(StockError::ConfigError(_))), "{size}");
        }
        let config = StockConfig::builder().chunk_size(MIN_CHUNK_SIZE).build().unwrap();
        assert_eq!(config.chunk_size, MIN_CHUNK_SIZE);
    }

    #[test]
    fn test_validation_rejects_empty_topics() {
        let config = StockConfig {
            market_topics: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_backoff() {
        let config = StockConfig::default();
        assert_eq!(config.retry_backoff(0), Duration::from_secs(1));
        assert_eq!(config.retry_backoff(1), Duration::from_secs(2));
        assert_eq!(config.retry_backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn test_openai_config_requires_key() {
        let config = StockConfig::default();
        assert!(matches!(config.openai_config(), Err(StockError::ConfigError(_))));

        let config = StockConfig::builder()
            .llm_api_key("key")
            .llm_api_base("http://localhost:1234/v1")
            .build()
            .unwrap();
        let openai = config.openai_config().unwrap();
        assert_eq!(openai.api_base, "http://localhost:1234/v1");
        assert_eq!(openai.api_key, "key");
    }

    #[test]
    fn test_data_dir_layout() {
        let config = StockConfig::default().with_data_dir(Path::new("/tmp/equisage"));
        assert_eq!(config.charts_dir, PathBuf::from("/tmp/equisage/charts"));
        assert_eq!(config.reports_dir, PathBuf::from("/tmp/equisage/reports"));
    }

    #[test]
    fn test_telegram_token_required() {
        let config = StockConfig::default();
        let err = config.require_telegram_token().unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_BOT_TOKEN"));
    }
}
