//! Fetch orchestration: fills gaps in the event store under a budget.
//!
//! A feed request never refetches more than its share of the listing. With
//! `n` distinct events, a refresh every `h` hours and a `t` day TTL, the
//! whole listing turns over within the TTL if every request fetches
//! `n / (24 / h) / t + 1` uncached pages.

use std::collections::HashMap;
use std::sync::Arc;

use ecp_ical_core::{FeedQuery, RawEvent};
use ecp_ical_scrape::{LinkMap, PageFetcher, extract_event};
use tracing::{debug, info, warn};

use crate::error::ServerResult;
use crate::events::EventStore;

/// Default interval between subscriber refreshes, in hours.
pub const DEFAULT_REFRESH_HOURS: u32 = 12;

/// Number of uncached event pages one request may fetch.
///
/// Zero intervals are clamped to one so the result is always at least one.
pub fn fetch_budget(distinct_events: usize, refresh_hours: u32, ttl_days: u32) -> usize {
    let requests_per_day = (24 / refresh_hours.max(1)).max(1) as usize;
    let ttl_days = ttl_days.max(1) as usize;
    (distinct_events / requests_per_day / ttl_days + 1).max(1)
}

/// What one orchestration pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchSummary {
    /// Records reused from the store.
    pub reused: usize,
    /// Pages fetched from the site.
    pub fetched: usize,
    /// Links left for a later request because the budget ran out.
    pub deferred: usize,
    /// Fetched pages without a usable record.
    pub skipped: usize,
}

/// Resolves listing links to event records.
#[derive(Clone)]
pub struct FetchOrchestrator {
    fetcher: Arc<dyn PageFetcher>,
    events: EventStore,
}

impl FetchOrchestrator {
    pub fn new(fetcher: Arc<dyn PageFetcher>, events: EventStore) -> Self {
        Self { fetcher, events }
    }

    /// Returns the records for the links matching `query`, in listing order.
    ///
    /// Stored records are reused. Missing ones are fetched, extracted and
    /// stored while `budget` lasts. A page without a record, or with one
    /// that does not parse, still uses up budget and is left out.
    ///
    /// # Errors
    ///
    /// Fetch failures and store failures abort the pass.
    pub async fn collect(
        &self,
        links: &LinkMap,
        query: &FeedQuery,
        stored: &HashMap<String, RawEvent>,
        mut budget: usize,
    ) -> ServerResult<(Vec<RawEvent>, FetchSummary)> {
        let mut out = Vec::new();
        let mut summary = FetchSummary::default();

        for (href, attrs) in links {
            if !query.matches_tags(&attrs.tags) {
                continue;
            }
            if let Some(event) = stored.get(href) {
                summary.reused += 1;
                out.push(event.clone());
                continue;
            }
            if budget == 0 {
                summary.deferred += 1;
                continue;
            }

            budget -= 1;
            summary.fetched += 1;
            let body = self.fetcher.get(href, &[]).await?;
            match extract_event(&body, href) {
                Ok(Some(event)) => {
                    self.events.put(href, &event).await?;
                    out.push(event);
                }
                Ok(None) => {
                    summary.skipped += 1;
                    debug!(url = %href, "Event page has no record");
                }
                Err(e) => {
                    summary.skipped += 1;
                    warn!(url = %href, error = %e, "Skipping unreadable event page");
                }
            }
        }

        info!(
            reused = summary.reused,
            fetched = summary.fetched,
            deferred = summary.deferred,
            skipped = summary.skipped,
            "Collected events"
        );
        Ok((out, summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::{FakeFetcher, event_page};
    use ecp_ical_scrape::LinkAttrs;

    /// Listing links; tags are comma-separated.
    fn links(entries: &[(&str, &str)]) -> LinkMap {
        entries
            .iter()
            .map(|(href, tags)| {
                (
                    href.to_string(),
                    LinkAttrs {
                        tags: tags.split(',').map(str::to_string).collect(),
                    },
                )
            })
            .collect()
    }

    fn record(id: &str) -> RawEvent {
        RawEvent::new("2030-01-01T10:00:00").with_id(id)
    }

    fn page(id: &str) -> String {
        event_page(&format!("{{ id: '{id}', start: '2030-01-01T10:00:00' }}"))
    }

    fn setup(fetcher: FakeFetcher) -> (Arc<FakeFetcher>, EventStore, FetchOrchestrator) {
        let fetcher = Arc::new(fetcher);
        let events = EventStore::new(Arc::new(MemoryStore::new()));
        let orchestrator = FetchOrchestrator::new(fetcher.clone(), events.clone());
        (fetcher, events, orchestrator)
    }

    mod budget {
        use super::*;

        #[test]
        fn defaults() {
            // 2 refreshes a day, 7 day TTL.
            assert_eq!(fetch_budget(0, 12, 7), 1);
            assert_eq!(fetch_budget(13, 12, 7), 1);
            assert_eq!(fetch_budget(14, 12, 7), 2);
            assert_eq!(fetch_budget(100, 12, 7), 8);
        }

        #[test]
        fn hourly_refresh() {
            assert_eq!(fetch_budget(100, 1, 7), 1);
            assert_eq!(fetch_budget(1000, 1, 7), 6);
        }

        #[test]
        fn degenerate_settings_are_clamped() {
            assert_eq!(fetch_budget(10, 0, 0), 1);
            assert_eq!(fetch_budget(10, 48, 1), 11);
        }
    }

    mod collecting {
        use super::*;

        const A: &str = "https://pittecp.org/event-a";
        const B: &str = "https://pittecp.org/event-b";
        const C: &str = "https://pittecp.org/event-c";

        #[tokio::test]
        async fn reuses_stored_records_without_fetching() {
            let (fetcher, _events, orchestrator) = setup(FakeFetcher::new());
            let stored = HashMap::from([(A.to_string(), record("a"))]);

            let (out, summary) = orchestrator
                .collect(&links(&[(A, "x")]), &FeedQuery::default(), &stored, 0)
                .await
                .unwrap();

            assert_eq!(out, vec![record("a")]);
            assert_eq!(summary.reused, 1);
            assert_eq!(fetcher.call_count(), 0);
        }

        #[tokio::test]
        async fn budget_limits_fetches() {
            let fetcher = FakeFetcher::new()
                .with_page(A, page("a"))
                .with_page(B, page("b"))
                .with_page(C, page("c"));
            let (fetcher, events, orchestrator) = setup(fetcher);
            let listing = links(&[(A, "x"), (B, "x"), (C, "x")]);

            let (out, summary) = orchestrator
                .collect(&listing, &FeedQuery::default(), &HashMap::new(), 2)
                .await
                .unwrap();

            assert_eq!(out.len(), 2);
            assert_eq!(fetcher.calls(), vec![A.to_string(), B.to_string()]);
            assert_eq!(summary.deferred, 1);
            let stored = events.list_all().await.unwrap();
            assert!(stored.contains_key(A) && stored.contains_key(B));
            assert!(!stored.contains_key(C));
        }

        #[tokio::test]
        async fn filters_by_tag_before_spending_budget() {
            let fetcher = FakeFetcher::new().with_page(B, page("b"));
            let (fetcher, _events, orchestrator) = setup(fetcher);
            let listing = links(&[(A, "hiking"), (B, "social,club")]);
            let query = FeedQuery::parse(Some("social"));

            let (out, _) = orchestrator
                .collect(&listing, &query, &HashMap::new(), 1)
                .await
                .unwrap();

            assert_eq!(out.len(), 1);
            assert_eq!(out[0].id.as_deref(), Some("b"));
            assert_eq!(fetcher.calls(), vec![B.to_string()]);
        }

        #[tokio::test]
        async fn unreadable_pages_use_budget_and_are_not_stored() {
            let fetcher = FakeFetcher::new()
                .with_page(A, "<html><body>no script</body></html>")
                .with_page(B, event_page("{ start: }"))
                .with_page(C, page("c"));
            let (fetcher, events, orchestrator) = setup(fetcher);
            let listing = links(&[(A, "x"), (B, "x"), (C, "x")]);

            let (out, summary) = orchestrator
                .collect(&listing, &FeedQuery::default(), &HashMap::new(), 2)
                .await
                .unwrap();

            assert!(out.is_empty());
            assert_eq!(summary.skipped, 2);
            assert_eq!(fetcher.call_count(), 2);
            assert!(events.list_all().await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn fetch_failure_aborts() {
            let fetcher = FakeFetcher::new().with_status(A, 500);
            let (_fetcher, _events, orchestrator) = setup(fetcher);

            let err = orchestrator
                .collect(&links(&[(A, "x")]), &FeedQuery::default(), &HashMap::new(), 1)
                .await
                .unwrap_err();
            assert!(err.is_upstream());
        }
    }
}
