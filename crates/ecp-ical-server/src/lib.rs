//! Feed server: entity store, content cache, fetch budget, iCalendar feed.
//!
//! This crate provides the ecp-ical server that handles:
//! - Cached listing pages and event records with expiration
//! - Budgeted fetching of uncached event pages
//! - Calendar assembly and the `/cal` HTTP route
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use ecp_ical_scrape::{HttpFetcher, SiteConfig};
//! use ecp_ical_server::{FeedService, FeedSettings, MemoryStore, router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let site = SiteConfig::default();
//!     let fetcher = HttpFetcher::new(&site)?;
//!     let service = FeedService::new(
//!         site,
//!         FeedSettings::default(),
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(fetcher),
//!     );
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//!     axum::serve(listener, router(Arc::new(service))).await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod feed;
pub mod orchestrator;
pub mod pipeline;
pub mod routes;
pub mod store;

#[cfg(test)]
mod testing;

pub use cache::{ContentCache, DEFAULT_TTL_DAYS, cache_key};
pub use config::{ServerConfig, StorageBackend};
pub use error::{ServerError, ServerResult};
pub use events::{EventStore, INLINE_LIMIT};
pub use feed::{DEFAULT_PRODUCT_ID, FeedAssembler, FeedBranding};
pub use orchestrator::{DEFAULT_REFRESH_HOURS, FetchOrchestrator, FetchSummary, fetch_budget};
pub use pipeline::{FeedService, FeedSettings, MAX_TTL_DAYS};
pub use routes::{AppError, CALENDAR_CONTENT_TYPE, router};
pub use store::{Entity, EntityStore, Field, FileStore, Kind, MemoryStore, StoreError};
