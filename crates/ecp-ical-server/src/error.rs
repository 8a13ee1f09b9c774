//! Server error types.

use std::io;

use ecp_ical_scrape::ScrapeError;
use thiserror::Error;

use crate::codec::CodecError;
use crate::store::StoreError;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while serving a feed.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Fetching from the upstream site failed.
    #[error("scrape error: {0}")]
    Scrape(#[from] ScrapeError),

    /// The entity store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A record could not be encoded for storage.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// IO error (listener, config file).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true when the upstream site is to blame.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Scrape(e) if e.is_upstream())
    }
}
