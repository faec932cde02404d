//! Error types for store operations

use std::fmt;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations
#[derive(Debug)]
pub enum StoreError {
    /// No configuration exists for the requested guild
    GuildNotFound(String),

    /// Backend-specific error
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::GuildNotFound(guild_id) => {
                write!(f, "no config found for guild {}", guild_id)
            }
            StoreError::Backend(msg) => write!(f, "store backend error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}
