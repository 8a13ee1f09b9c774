//! Upstream site configuration.

use std::time::Duration;
use url::Url;

use crate::error::{ScrapeError, ScrapeResult};

/// Where and how to scrape the club calendar.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Listing page URL with a `{date}` placeholder for the selected date.
    pub listing_template: String,

    /// Prefix every event page URL starts with.
    pub event_prefix: Url,

    /// Tag given to links that carry no `data-tags` attribute.
    pub default_tag: String,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string.
    pub user_agent: String,
}

impl SiteConfig {
    /// Listing view of the ECP calendar.
    pub const DEFAULT_LISTING_TEMPLATE: &'static str = "https://pittecp.org/Calendar?EventViewMode=1&EventListViewMode=2&SelectedDate={date}&CalendarViewType=0";

    /// Prefix of ECP event pages.
    pub const DEFAULT_EVENT_PREFIX: &'static str = "https://pittecp.org/event-";

    /// Tag implied for untagged events.
    pub const DEFAULT_TAG: &'static str = "ecp club event";

    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Placeholder replaced with `1/1/<year>` in the listing template.
    pub const DATE_PLACEHOLDER: &'static str = "{date}";

    /// Creates a configuration for the given listing template and event prefix.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the template lacks the `{date}`
    /// placeholder or either value is not an absolute URL.
    pub fn new(
        listing_template: impl Into<String>,
        event_prefix: impl AsRef<str>,
    ) -> ScrapeResult<Self> {
        let listing_template = listing_template.into();
        if !listing_template.contains(Self::DATE_PLACEHOLDER) {
            return Err(ScrapeError::configuration(format!(
                "listing URL has no {} placeholder",
                Self::DATE_PLACEHOLDER
            ))
            .with_url(listing_template));
        }
        Url::parse(&listing_template.replace(Self::DATE_PLACEHOLDER, "1/1/2000")).map_err(
            |e| {
                ScrapeError::configuration("invalid listing URL")
                    .with_url(listing_template.clone())
                    .with_source(e)
            },
        )?;
        let event_prefix = Url::parse(event_prefix.as_ref()).map_err(|e| {
            ScrapeError::configuration("invalid event URL prefix")
                .with_url(event_prefix.as_ref())
                .with_source(e)
        })?;

        Ok(Self {
            listing_template,
            event_prefix,
            default_tag: Self::DEFAULT_TAG.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("ecp-ical/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Configuration for pittecp.org.
    pub fn pittecp() -> Self {
        Self {
            listing_template: Self::DEFAULT_LISTING_TEMPLATE.to_string(),
            event_prefix: Url::parse(Self::DEFAULT_EVENT_PREFIX).expect("static URL is valid"),
            default_tag: Self::DEFAULT_TAG.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("ecp-ical/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Sets the tag implied for untagged events.
    pub fn with_default_tag(mut self, tag: impl Into<String>) -> Self {
        self.default_tag = tag.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Returns the listing page URL for January 1st of `year`.
    pub fn listing_url(&self, year: i32) -> String {
        self.listing_template
            .replace(Self::DATE_PLACEHOLDER, &format!("1/1/{year}"))
    }

    /// Returns the event page prefix as a string.
    pub fn event_prefix_str(&self) -> &str {
        self.event_prefix.as_str()
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self::pittecp()
    }
}
