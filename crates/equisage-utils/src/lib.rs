//! Shared utilities for equisage
//!
//! This crate provides common functionality used across the equisage workspace:
//! tracing setup and the application-level configuration read from the
//! environment.

pub mod config;
pub mod logging;

pub use config::{Config, ConfigError, LogFormat};
pub use logging::init_tracing;
