//! Persistent session stores

pub mod sqlite;

pub use sqlite::SqliteSessionStore;
