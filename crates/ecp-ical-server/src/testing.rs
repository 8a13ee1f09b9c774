//! Test doubles shared by the server tests.

use std::collections::HashMap;
use std::sync::Mutex;

use ecp_ical_scrape::{BoxFuture, PageFetcher, ScrapeError, ScrapeResult};

/// Serves canned pages and records every request.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    pages: HashMap<String, Result<Vec<u8>, u16>>,
    calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `url` with `body`.
    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.pages.insert(url.into(), Ok(body.into()));
        self
    }

    /// Answers `url` with an HTTP error status.
    pub fn with_status(mut self, url: impl Into<String>, status: u16) -> Self {
        self.pages.insert(url.into(), Err(status));
        self
    }

    /// URLs requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl PageFetcher for FakeFetcher {
    fn get<'a>(
        &'a self,
        url: &'a str,
        _params: &'a [(String, String)],
    ) -> BoxFuture<'a, ScrapeResult<Vec<u8>>> {
        self.calls.lock().unwrap().push(url.to_string());
        let answer = match self.pages.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(ScrapeError::upstream_status(*status, url)),
            None => Err(ScrapeError::upstream_status(404, url)),
        };
        Box::pin(async move { answer })
    }
}

/// Builds an event page embedding `literal` as the event record.
pub fn event_page(literal: &str) -> String {
    format!("<html><head><script>const event = {literal};</script></head><body></body></html>")
}

/// Builds a listing page with one anchor per `(href, tags)` pair.
pub fn listing_page(links: &[(&str, Option<&str>)]) -> String {
    let anchors: String = links
        .iter()
        .map(|(href, tags)| match tags {
            Some(tags) => format!(r#"<a title="e" href="{href}" data-tags="{tags}">e</a>"#),
            None => format!(r#"<a title="e" href="{href}">e</a>"#),
        })
        .collect();
    format!("<html><body>{anchors}</body></html>")
}
