//! Error types for scraping the upstream site.
//!
//! Upstream failures (network errors, non-success statuses) abort the feed
//! request that hit them. Extraction failures only concern one event page and
//! are meant to be skipped by the caller.

use std::fmt;
use thiserror::Error;

/// The category of a scrape error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrapeErrorCode {
    /// Connection failed, timed out, or the body could not be read.
    Network,
    /// The site answered with a non-success status.
    UpstreamStatus,
    /// The page did not contain a readable event record.
    Extraction,
    /// Invalid site configuration (bad base URL, client setup).
    Configuration,
}

impl ScrapeErrorCode {
    /// Returns true if the failure came from talking to the site.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Network | Self::UpstreamStatus)
    }

    /// Returns a stable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network_error",
            Self::UpstreamStatus => "upstream_status",
            Self::Extraction => "extraction_failed",
            Self::Configuration => "configuration_error",
        }
    }
}

impl fmt::Display for ScrapeErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error that occurred while fetching or reading an upstream page.
#[derive(Debug, Error)]
pub struct ScrapeError {
    code: ScrapeErrorCode,
    message: String,
    /// The page being fetched or read, when known.
    url: Option<String>,
    /// HTTP status for [`ScrapeErrorCode::UpstreamStatus`].
    status: Option<u16>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ScrapeError {
    /// Creates a new error with the given code and message.
    pub fn new(code: ScrapeErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            url: None,
            status: None,
            source: None,
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ScrapeErrorCode::Network, message)
    }

    /// Creates an error for a non-success HTTP status.
    pub fn upstream_status(status: u16, url: impl Into<String>) -> Self {
        let mut err = Self::new(
            ScrapeErrorCode::UpstreamStatus,
            format!("upstream answered {status}"),
        )
        .with_url(url);
        err.status = Some(status);
        err
    }

    /// Creates an extraction error.
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::new(ScrapeErrorCode::Extraction, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ScrapeErrorCode::Configuration, message)
    }

    /// Sets the page URL for this error.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ScrapeErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the page URL, if set.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Returns the HTTP status for upstream status errors.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns true if the failure came from talking to the site.
    pub fn is_upstream(&self) -> bool {
        self.code.is_upstream()
    }
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(ref url) = self.url {
            write!(f, " ({url})")?;
        }
        Ok(())
    }
}

/// A specialized Result type for scrape operations.
pub type ScrapeResult<T> = Result<T, ScrapeError>;
