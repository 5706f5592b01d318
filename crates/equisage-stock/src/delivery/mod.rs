//! Channel-side helpers: chunking, HTML sanitizing and turn serialization

pub mod chunk;
pub mod locks;
pub mod sanitize;

pub use chunk::{MIN_CHUNK_SIZE, split_message};
pub use locks::ConversationLocks;
pub use sanitize::sanitize_for_telegram;
