//! Page fetching.
//!
//! [`PageFetcher`] is the seam between the pipeline and the network: the
//! server uses [`HttpFetcher`], tests plug in canned pages.

use std::future::Future;
use std::pin::Pin;

use reqwest::{Client, Response};
use tracing::{debug, trace, warn};

use crate::config::SiteConfig;
use crate::error::{ScrapeError, ScrapeResult};

/// A boxed future that is Send.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Fetches raw page bodies.
pub trait PageFetcher: Send + Sync {
    /// Performs a GET of `url` with the given query parameters.
    ///
    /// Non-success statuses are errors; the body is returned unmodified.
    fn get<'a>(
        &'a self,
        url: &'a str,
        params: &'a [(String, String)],
    ) -> BoxFuture<'a, ScrapeResult<Vec<u8>>>;
}

/// [`PageFetcher`] backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher using the timeout and user agent from `config`.
    pub fn new(config: &SiteConfig) -> ScrapeResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ScrapeError::configuration("failed to create HTTP client").with_source(e)
            })?;
        Ok(Self { client })
    }

    async fn fetch(&self, url: &str, params: &[(String, String)]) -> ScrapeResult<Vec<u8>> {
        debug!(url = %url, params = params.len(), "Fetching page");
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| {
                ScrapeError::network("request failed")
                    .with_url(url)
                    .with_source(e)
            })?;
        Self::handle_response(url, response).await
    }

    async fn handle_response(url: &str, response: Response) -> ScrapeResult<Vec<u8>> {
        let status = response.status();
        trace!(status = %status, url = %url, "Received response");

        if !status.is_success() {
            warn!(status = %status, url = %url, "Unexpected response status");
            return Err(ScrapeError::upstream_status(status.as_u16(), url));
        }

        let body = response.bytes().await.map_err(|e| {
            ScrapeError::network("failed to read response")
                .with_url(url)
                .with_source(e)
        })?;
        Ok(body.to_vec())
    }
}

impl PageFetcher for HttpFetcher {
    fn get<'a>(
        &'a self,
        url: &'a str,
        params: &'a [(String, String)],
    ) -> BoxFuture<'a, ScrapeResult<Vec<u8>>> {
        Box::pin(self.fetch(url, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fetcher_creation() {
        let config = SiteConfig::default().with_timeout(Duration::from_secs(10));
        assert!(HttpFetcher::new(&config).is_ok());
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        let config = SiteConfig::default().with_timeout(Duration::from_secs(2));
        let fetcher = HttpFetcher::new(&config).unwrap();
        let err = fetcher.get("http://127.0.0.1:1/", &[]).await.unwrap_err();
        assert!(err.is_upstream());
        assert_eq!(err.url(), Some("http://127.0.0.1:1/"));
    }
}
