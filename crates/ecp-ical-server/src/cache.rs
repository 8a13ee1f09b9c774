//! Content cache with TTL support.
//!
//! Caches the *parsed* content of upstream pages, not their bytes. A hit
//! decodes the stored blob; a miss fetches the page, runs the extractor,
//! and stores the result with `expiration = now + ttl`. Expired entries
//! count as misses and are replaced wholesale.

use std::sync::Arc;

use chrono::{Duration, Utc};
use ecp_ical_scrape::{PageFetcher, ScrapeResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};

use crate::codec;
use crate::error::ServerResult;
use crate::store::{Entity, EntityStore, Kind, StoreError};

/// Default time-to-live of cached content, in days.
pub const DEFAULT_TTL_DAYS: i64 = 7;

/// Cache of parsed page content, keyed by request URL.
#[derive(Clone)]
pub struct ContentCache {
    store: Arc<dyn EntityStore>,
    fetcher: Arc<dyn PageFetcher>,
    ttl: Duration,
}

impl ContentCache {
    /// Creates a cache over `store`, fetching misses with `fetcher`.
    pub fn new(store: Arc<dyn EntityStore>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            store,
            fetcher,
            ttl: Duration::days(DEFAULT_TTL_DAYS),
        }
    }

    /// Sets the time-to-live of new entries.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns the time-to-live of new entries.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the parsed content of `url`, fetching it on a miss.
    ///
    /// # Errors
    ///
    /// Fetch failures, extractor failures and store failures propagate; a
    /// failed miss stores nothing. An unreadable stored entry is a miss.
    pub async fn get<T, E>(
        &self,
        url: &str,
        params: &[(String, String)],
        extractor: E,
    ) -> ServerResult<T>
    where
        T: Serialize + DeserializeOwned,
        E: FnOnce(&[u8]) -> ScrapeResult<T>,
    {
        let key = cache_key(url, params);
        let now = Utc::now();

        let cached = match self.store.get(Kind::Page, &key).await {
            Ok(cached) => cached,
            Err(StoreError::Corrupt { message, .. }) => {
                warn!(key = %key, error = %message, "Discarding unreadable cached page");
                None
            }
            Err(e) => return Err(e.into()),
        };
        if let Some(entity) = cached {
            if entity.is_expired(now) {
                debug!(key = %key, "Cached page expired");
            } else if let Some(blob) = entity.payload() {
                match codec::decode(blob) {
                    Ok(content) => {
                        trace!(key = %key, "Page cache hit");
                        return Ok(content);
                    }
                    Err(e) => warn!(key = %key, error = %e, "Discarding unreadable cached page"),
                }
            }
        }

        debug!(key = %key, "Page cache miss, fetching");
        let body = self.fetcher.get(url, params).await?;
        let content = extractor(&body)?;

        let entity = Entity::new(Kind::Page, key.as_str())
            .with_expiration(now + self.ttl)
            .with_content(codec::encode(&content)?);
        self.store.put(entity).await?;
        debug!(key = %key, ttl_days = self.ttl.num_days(), "Cached page");

        Ok(content)
    }
}

/// The full request URL used as the cache key.
pub fn cache_key(url: &str, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{query}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FileStore, MemoryStore};
    use crate::testing::FakeFetcher;
    use ecp_ical_scrape::ScrapeError;

    const URL: &str = "https://pittecp.org/Calendar?SelectedDate=1/1/2030";

    fn body_len(body: &[u8]) -> ScrapeResult<usize> {
        Ok(body.len())
    }

    fn setup(fetcher: FakeFetcher) -> (Arc<MemoryStore>, Arc<FakeFetcher>, ContentCache) {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(fetcher);
        let cache = ContentCache::new(store.clone(), fetcher.clone());
        (store, fetcher, cache)
    }

    #[tokio::test]
    async fn miss_fetches_and_stores_once() {
        let (store, fetcher, cache) = setup(FakeFetcher::new().with_page(URL, "hello"));

        let content: usize = cache.get(URL, &[], body_len).await.unwrap();

        assert_eq!(content, 5);
        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(store.write_count(), 1);

        let entity = store.get(Kind::Page, URL).await.unwrap().unwrap();
        let expiration = entity.expiration.unwrap();
        let ttl = expiration - Utc::now();
        assert!(ttl > Duration::days(6) && ttl <= Duration::days(7));
        assert_eq!(codec::decode::<usize>(entity.payload().unwrap()).unwrap(), 5);
    }

    #[tokio::test]
    async fn hit_skips_the_network() {
        let (store, fetcher, cache) = setup(FakeFetcher::new().with_page(URL, "hello"));

        let first: usize = cache.get(URL, &[], body_len).await.unwrap();
        let second: usize = cache
            .get(URL, &[], |_| panic!("extractor must not run on a hit"))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn expired_entry_is_refetched_and_replaced() {
        let (store, fetcher, cache) = setup(FakeFetcher::new().with_page(URL, "fresh!"));
        store
            .put(
                Entity::new(Kind::Page, URL)
                    .with_expiration(Utc::now() - Duration::minutes(1))
                    .with_content(codec::encode(&1usize).unwrap()),
            )
            .await
            .unwrap();

        let content: usize = cache.get(URL, &[], body_len).await.unwrap();

        assert_eq!(content, 6);
        assert_eq!(fetcher.call_count(), 1);
        let entity = store.get(Kind::Page, URL).await.unwrap().unwrap();
        assert!(!entity.is_expired(Utc::now()));
    }

    #[tokio::test]
    async fn corrupt_entry_is_treated_as_miss() {
        let (store, fetcher, cache) = setup(FakeFetcher::new().with_page(URL, "abc"));
        store
            .put(
                Entity::new(Kind::Page, URL)
                    .with_expiration(Utc::now() + Duration::days(1))
                    .with_content(b"garbage".to_vec()),
            )
            .await
            .unwrap();

        let content: usize = cache.get(URL, &[], body_len).await.unwrap();
        assert_eq!(content, 3);
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn damaged_document_is_refetched_and_overwritten() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(FileStore::new(dir.path()));
        let fetcher = Arc::new(FakeFetcher::new().with_page(URL, "abcd"));
        let cache = ContentCache::new(store.clone(), fetcher.clone());

        let _: usize = cache.get(URL, &[], body_len).await.unwrap();
        let documents: Vec<_> = std::fs::read_dir(dir.path().join("page"))
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(documents.len(), 1);
        std::fs::write(&documents[0], b"{trunc").unwrap();

        let content: usize = cache.get(URL, &[], body_len).await.unwrap();
        assert_eq!(content, 4);
        assert_eq!(fetcher.call_count(), 2);
        assert!(store.get(Kind::Page, URL).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn upstream_failure_propagates_and_stores_nothing() {
        let (store, _fetcher, cache) = setup(FakeFetcher::new().with_status(URL, 503));

        let err = cache.get::<usize, _>(URL, &[], body_len).await.unwrap_err();

        assert!(err.is_upstream());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn extractor_failure_propagates_and_stores_nothing() {
        let (store, _fetcher, cache) = setup(FakeFetcher::new().with_page(URL, "x"));

        let result = cache
            .get::<usize, _>(URL, &[], |_| Err(ScrapeError::extraction("nope")))
            .await;

        assert!(result.is_err());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn key_includes_params() {
        assert_eq!(cache_key(URL, &[]), URL);
        let params = vec![("a".to_string(), "1 2".to_string())];
        assert_eq!(cache_key("https://x/list", &params), "https://x/list?a=1+2");
        assert_eq!(cache_key("https://x/list?b=0", &params), "https://x/list?b=0&a=1+2");
    }
}
