//! Indian equity collaborators for the equisage orchestrator
//!
//! This crate supplies the concrete implementations behind the
//! `equisage-core` capability traits:
//!
//! - Intent and follow-up classification (keyword rules with a language
//!   model on top)
//! - Fundamentals scraped from Screener.in company pages
//! - Technical indicators (RSI, MACD, moving averages) over Yahoo Finance
//!   daily history
//! - Company and market news from Google News RSS, rate limited and cached
//! - Report and follow-up synthesis through MiniJinja prompt templates
//! - Markdown report documents and SQLite session persistence
//! - Telegram delivery: chunking, HTML sanitizing, per-chat serialization
//!
//! # Example
//!
//! ```rust,ignore
//! use equisage_stock::{StockConfig, StockService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = StockConfig::from_env()?;
//!     let service = StockService::from_config(config).await?;
//!
//!     let response = service.ask(42_i64, "tell me about Infosys").await?;
//!     println!("{}", response.text);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod classifier;
pub mod collectors;
pub mod config;
pub mod delivery;
pub mod document;
pub mod error;
pub mod platforms;
pub mod prompts;
pub mod service;
pub mod session;
pub mod synthesizer;

#[cfg(test)]
mod testing;

pub use classifier::{LlmFollowUpClassifier, LlmIntentClassifier, RuleBasedClassifier};
pub use collectors::{GoogleCompanyNews, GoogleMarketNews, ScreenerFundamentals, YahooTechnicals};
pub use config::StockConfig;
pub use document::MarkdownRenderer;
pub use error::{Result, StockError};
pub use platforms::TelegramBot;
pub use service::StockService;
pub use session::SqliteSessionStore;
pub use synthesizer::LlmReportSynthesizer;
