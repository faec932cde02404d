//! Error types for scrape lifecycle operations

use std::fmt;

use crate::TaskKey;

/// Errors returned by the scrape manager's lifecycle operations
#[derive(Debug)]
pub enum ScrapeError {
    /// A poll task is already registered under this key; callers must stop
    /// it before starting a new one
    AlreadyRunning(TaskKey),

    /// No poll task is registered under this key
    NotRunning(TaskKey),
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeError::AlreadyRunning(key) => {
                write!(f, "a scraper is already running for {}", key)
            }
            ScrapeError::NotRunning(key) => write!(f, "no scraper running for {}", key),
        }
    }
}

impl std::error::Error for ScrapeError {}
