//! Scraping the club calendar site.
//!
//! - [`extract_links`] - event links and their tags from a listing page
//! - [`extract_event`] - the embedded event record from an event page
//! - [`PageFetcher`] / [`HttpFetcher`] - raw page bodies over HTTP
//! - [`SiteConfig`] - listing URL, event prefix, default tag, timeouts
//! - [`ScrapeError`] - error type for all of the above
//!
//! ```text
//! listing page ──► extract_links ──► LinkMap { event URL → tags }
//!                                        │
//! event page   ──► extract_event ──► RawEvent
//! ```
//!
//! Nothing here stores anything; caching lives in the server crate.

pub mod client;
pub mod config;
pub mod detail;
pub mod error;
pub mod links;

pub use client::{BoxFuture, HttpFetcher, PageFetcher};
pub use config::SiteConfig;
pub use detail::{extract_event, rewrite_literal};
pub use error::{ScrapeError, ScrapeErrorCode, ScrapeResult};
pub use links::{LinkAttrs, LinkMap, extract_links, merge_links};
