//! Feed query: requested tags and display options.
//!
//! Subscribers select a feed with a comma-separated tag list such as
//! `/cal/social,hiking+club`. Two reserved pseudo-tags are not tags at all:
//!
//! - `allday` also includes all-day events
//! - `multiday` also includes multi-day events (and therefore all-day ones)
//!
//! Without them, all-day and multi-day events are left out of the feed.

use crate::event::NormalizedEvent;

/// Pseudo-tag that includes all-day events.
pub const ALL_DAY_TAG: &str = "allday";

/// Pseudo-tag that includes multi-day events.
pub const MULTI_DAY_TAG: &str = "multiday";

/// A parsed feed request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedQuery {
    /// Requested tags in request order, without duplicates or pseudo-tags.
    tags: Vec<String>,
    /// Whether all-day events are included.
    pub include_all_day: bool,
    /// Whether multi-day events are included.
    pub include_multi_day: bool,
}

impl FeedQuery {
    /// Parses the tag segment of a feed URL.
    ///
    /// `+` stands for a space; tags are trimmed and empty entries ignored.
    pub fn parse(segment: Option<&str>) -> Self {
        let tags = segment
            .unwrap_or_default()
            .split(',')
            .map(|tag| tag.replace('+', " ").trim().to_string());
        Self::from_tags(tags)
    }

    /// Builds a query from individual tags, pulling out pseudo-tags.
    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut query = Self::default();
        for tag in tags {
            let tag = tag.into();
            match tag.as_str() {
                "" => {}
                ALL_DAY_TAG => query.include_all_day = true,
                MULTI_DAY_TAG => query.include_multi_day = true,
                _ if query.tags.contains(&tag) => {}
                _ => query.tags.push(tag),
            }
        }
        query
    }

    /// Returns the requested tags.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Returns true if an event carrying `event_tags` belongs in the feed.
    ///
    /// Every requested tag must be present on the event; an empty request
    /// matches everything.
    pub fn matches_tags<S: AsRef<str>>(&self, event_tags: &[S]) -> bool {
        self.tags
            .iter()
            .all(|wanted| event_tags.iter().any(|tag| tag.as_ref() == wanted))
    }

    /// Returns true if the display options admit this occurrence.
    pub fn admits(&self, event: &NormalizedEvent) -> bool {
        if event.all_day && !(self.include_all_day || self.include_multi_day) {
            return false;
        }
        if event.multi_day && !self.include_multi_day {
            return false;
        }
        true
    }

    /// Calendar display name, e.g. `ECP` or `ECP (Social...)`.
    ///
    /// `brand` is written verbatim wherever title-casing would have mangled
    /// it (`Ecp` back to `ECP`).
    pub fn calendar_name(&self, brand: &str) -> String {
        let Some(first) = self.tags.first() else {
            return brand.to_string();
        };
        let mut label = title_case(first);
        if self.tags.len() > 1 {
            label.push_str("...");
        }
        restore_brand(&format!("{brand} ({label})"), brand)
    }

    /// Calendar description: the requested tags, title-cased.
    pub fn calendar_description(&self, brand: &str) -> String {
        let joined = self
            .tags
            .iter()
            .map(|tag| title_case(tag))
            .collect::<Vec<_>>()
            .join(", ");
        restore_brand(&joined, brand)
    }
}

/// Upper-cases the first letter of every word and lower-cases the rest.
///
/// A word starts after any non-alphabetic character.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_alpha = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_alpha = true;
        } else {
            out.push(c);
            previous_alpha = false;
        }
    }
    out
}

fn restore_brand(text: &str, brand: &str) -> String {
    let mangled = title_case(brand);
    if mangled == brand || mangled.is_empty() {
        return text.to_string();
    }
    text.replace(&mangled, brand)
}
