//! LLM provider abstraction for equisage
//!
//! The classifiers and the report synthesizer talk to a language model only
//! through [`LLMProvider`]. This crate provides:
//!
//! - Message and completion request/response types
//! - The provider trait
//! - An OpenAI-compatible chat completions provider, which also covers
//!   Gemini's OpenAI endpoint and local servers

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod providers;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{Message, Role};
pub use provider::LLMProvider;
