//! The feed pipeline: listing pages to calendar text.
//!
//! ```text
//! listing pages (this year, next year) ──► ContentCache ──► LinkMap
//!                                                            │
//! EventStore::list_all ──► FetchOrchestrator (budgeted) ◄────┘
//!                                  │
//!                                  ▼
//!                            FeedAssembler ──► text/calendar
//! ```

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Local};
use ecp_ical_core::FeedQuery;
use ecp_ical_scrape::{LinkMap, PageFetcher, SiteConfig, extract_links, merge_links};
use futures_util::future::try_join_all;
use tracing::{debug, info};

use crate::cache::{ContentCache, DEFAULT_TTL_DAYS};
use crate::error::ServerResult;
use crate::events::EventStore;
use crate::feed::{FeedAssembler, FeedBranding};
use crate::orchestrator::{DEFAULT_REFRESH_HOURS, FetchOrchestrator, fetch_budget};
use crate::store::EntityStore;

/// Longest accepted lifetime of cached entries, in days.
pub const MAX_TTL_DAYS: u32 = 3650;

/// Tunables of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSettings {
    /// Lifetime of cached listings and event records.
    pub ttl_days: u32,
    /// Expected interval between subscriber refreshes.
    pub refresh_hours: u32,
    pub branding: FeedBranding,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            ttl_days: DEFAULT_TTL_DAYS as u32,
            refresh_hours: DEFAULT_REFRESH_HOURS,
            branding: FeedBranding::default(),
        }
    }
}

/// Renders feeds on demand.
#[derive(Clone)]
pub struct FeedService {
    site: Arc<SiteConfig>,
    cache: ContentCache,
    events: EventStore,
    orchestrator: FetchOrchestrator,
    assembler: FeedAssembler,
    settings: FeedSettings,
}

impl FeedService {
    pub fn new(
        site: SiteConfig,
        settings: FeedSettings,
        store: Arc<dyn EntityStore>,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        let ttl = Duration::days(i64::from(settings.ttl_days.clamp(1, MAX_TTL_DAYS)));
        let cache = ContentCache::new(store.clone(), fetcher.clone()).with_ttl(ttl);
        let events = EventStore::new(store).with_ttl(ttl);
        let orchestrator = FetchOrchestrator::new(fetcher, events.clone());
        Self {
            site: Arc::new(site),
            cache,
            events,
            orchestrator,
            assembler: FeedAssembler::new(settings.branding.clone()),
            settings,
        }
    }

    /// Renders the calendar for `query` as of now.
    pub async fn render(&self, query: &FeedQuery, request_url: &str) -> ServerResult<String> {
        self.render_at(query, request_url, Local::now()).await
    }

    /// Renders the calendar for `query` as of `now`.
    ///
    /// # Errors
    ///
    /// Upstream failures on listing or event pages and store failures.
    pub async fn render_at(
        &self,
        query: &FeedQuery,
        request_url: &str,
        now: DateTime<Local>,
    ) -> ServerResult<String> {
        let links = self.listing(now.year()).await?;
        let stored = self.events.list_all().await?;
        let budget = fetch_budget(
            links.len(),
            self.settings.refresh_hours,
            self.settings.ttl_days,
        );
        debug!(links = links.len(), stored = stored.len(), budget, "Resolving events");

        let (events, _summary) = self
            .orchestrator
            .collect(&links, query, &stored, budget)
            .await?;
        let body = self
            .assembler
            .render(query, &events, request_url, now.naive_local());

        info!(tags = ?query.tags(), events = events.len(), "Rendered feed");
        Ok(body)
    }

    /// Links from the listings for `year` and the year after, merged in order.
    async fn listing(&self, year: i32) -> ServerResult<LinkMap> {
        let urls = [self.site.listing_url(year), self.site.listing_url(year + 1)];
        let pages = try_join_all(urls.iter().map(|url| {
            let site = self.site.clone();
            self.cache
                .get(url, &[], move |body| Ok(extract_links(body, &site)))
        }))
        .await?;

        let mut links = LinkMap::new();
        for page in pages {
            merge_links(&mut links, page);
        }
        Ok(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::{FakeFetcher, event_page, listing_page};
    use chrono::TimeZone;

    const EVENT_A: &str = "https://pittecp.org/event-100";
    const EVENT_B: &str = "https://pittecp.org/event-200";

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2029, 6, 1, 12, 0, 0).unwrap()
    }

    fn site() -> SiteConfig {
        SiteConfig::default()
    }

    fn record(id: &str, title: &str) -> String {
        event_page(&format!(
            "{{ id: {id}, title: '{title}', start: '2029-09-01T18:00:00', end: '2029-09-01T20:00:00', allDay: 'True' === 'False' }}"
        ))
    }

    fn fetcher() -> FakeFetcher {
        FakeFetcher::new()
            .with_page(
                site().listing_url(2029),
                listing_page(&[(EVENT_A, Some("social")), (EVENT_B, None)]),
            )
            .with_page(
                site().listing_url(2030),
                listing_page(&[(EVENT_B, Some("social,outdoor"))]),
            )
            .with_page(EVENT_A, record("100", "Mixer"))
            .with_page(EVENT_B, record("200", "Hike"))
    }

    fn service(store: Arc<MemoryStore>, fetcher: Arc<FakeFetcher>) -> FeedService {
        FeedService::new(site(), FeedSettings::default(), store, fetcher)
    }

    fn uids(ics: &str) -> Vec<String> {
        ics.lines()
            .filter_map(|line| line.strip_prefix("UID:"))
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn renders_tagged_feed() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(fetcher());
        let service = service(store, fetcher.clone());

        let ics = service
            .render_at(&FeedQuery::parse(Some("outdoor")), "http://test/cal/outdoor", now())
            .await
            .unwrap();

        // Next year's listing retagged event B; event A does not match.
        assert_eq!(uids(&ics), ["200_0"]);
        assert!(ics.contains("SUMMARY:Hike"));
        assert!(!fetcher.calls().contains(&EVENT_A.to_string()));
    }

    #[tokio::test]
    async fn second_request_is_served_from_cache() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(fetcher());
        let service = service(store.clone(), fetcher.clone());
        let query = FeedQuery::default();

        // Two distinct events: budget of one per request.
        let first = service.render_at(&query, "http://test/cal", now()).await.unwrap();
        assert_eq!(uids(&first), ["100_0"]);
        assert_eq!(fetcher.call_count(), 3);

        let second = service.render_at(&query, "http://test/cal", now()).await.unwrap();
        assert_eq!(uids(&second), ["100_0", "200_0"]);
        assert_eq!(fetcher.call_count(), 4);

        let third = service.render_at(&query, "http://test/cal", now()).await.unwrap();
        assert_eq!(uids(&third), ["100_0", "200_0"]);
        assert_eq!(fetcher.call_count(), 4);
    }

    #[tokio::test]
    async fn listing_failure_is_upstream_error() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(
            FakeFetcher::new()
                .with_page(site().listing_url(2029), listing_page(&[]))
                .with_status(site().listing_url(2030), 503),
        );
        let service = service(store, fetcher);

        let err = service
            .render_at(&FeedQuery::default(), "http://test/cal", now())
            .await
            .unwrap_err();
        assert!(err.is_upstream());
    }

    #[tokio::test]
    async fn out_of_range_ttl_is_clamped() {
        for ttl_days in [0, u32::MAX] {
            let store = Arc::new(MemoryStore::new());
            let fetcher = Arc::new(fetcher());
            let settings = FeedSettings {
                ttl_days,
                ..FeedSettings::default()
            };
            let service = FeedService::new(site(), settings, store, fetcher.clone());
            let query = FeedQuery::default();

            service.render_at(&query, "http://test/cal", now()).await.unwrap();
            service.render_at(&query, "http://test/cal", now()).await.unwrap();

            // Listings hit the cache on the second request.
            assert_eq!(fetcher.call_count(), 4, "ttl_days = {ttl_days}");
        }
    }
}
