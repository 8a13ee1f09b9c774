//! iCalendar feed assembly.

use chrono::{NaiveDateTime, Utc};
use ecp_ical_core::{EventTime, FeedQuery, NormalizedEvent, RawEvent, normalize_event};
use icalendar::{Calendar, Component, Event, EventLike, Property};
use tracing::debug;

/// Producer identifier written to every feed.
pub const DEFAULT_PRODUCT_ID: &str = "-//ECP-iCal//pittecp.org//EN";

/// Calendar-level presentation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedBranding {
    /// Calendar name prefix, kept verbatim in names and descriptions.
    pub brand: String,
    /// Apple-style `r:g:b` calendar color.
    pub color: String,
    /// `PRODID` of the generated calendar.
    pub product_id: String,
}

impl Default for FeedBranding {
    fn default() -> Self {
        Self {
            brand: "ECP".to_string(),
            color: "167:155:142".to_string(),
            product_id: DEFAULT_PRODUCT_ID.to_string(),
        }
    }
}

/// Turns raw event records into a calendar.
#[derive(Debug, Clone, Default)]
pub struct FeedAssembler {
    branding: FeedBranding,
}

impl FeedAssembler {
    pub fn new(branding: FeedBranding) -> Self {
        Self { branding }
    }

    pub fn branding(&self) -> &FeedBranding {
        &self.branding
    }

    /// Builds the calendar for `query` from `events`, in order.
    ///
    /// Every session of every record is normalized against `now`; ended
    /// occurrences and the all-day or multi-day ones the query does not ask
    /// for are left out.
    pub fn assemble(
        &self,
        query: &FeedQuery,
        events: &[RawEvent],
        request_url: &str,
        now: NaiveDateTime,
    ) -> Calendar {
        let name = query.calendar_name(&self.branding.brand);
        let description = query.calendar_description(&self.branding.brand);

        let mut calendar = Calendar::empty();
        calendar
            .append_property(Property::new("VERSION", "2.0"))
            .append_property(Property::new("PRODID", &self.branding.product_id))
            .append_property(Property::new("CALSCALE", "GREGORIAN"))
            .append_property(Property::new("NAME", &name))
            .append_property(Property::new("X-WR-CALNAME", &name))
            .append_property(Property::new("DESCRIPTION", &description))
            .append_property(Property::new("X-WR-CALDESC", &description))
            .append_property(Property::new("URL", request_url))
            .append_property(Property::new("COLOR", &self.branding.color))
            .append_property(Property::new("METHOD", "PUBLISH"));

        let mut emitted = 0usize;
        for raw in events {
            for occurrence in normalize_event(raw, now) {
                if !query.admits(&occurrence) {
                    continue;
                }
                calendar.push(to_component(&occurrence));
                emitted += 1;
            }
        }

        debug!(records = events.len(), emitted, "Assembled calendar");
        calendar.done()
    }

    /// Builds and serializes the calendar.
    pub fn render(
        &self,
        query: &FeedQuery,
        events: &[RawEvent],
        request_url: &str,
        now: NaiveDateTime,
    ) -> String {
        self.assemble(query, events, request_url, now).to_string()
    }
}

fn to_component(occurrence: &NormalizedEvent) -> Event {
    let mut event = Event::new();
    if let Some(ref title) = occurrence.title {
        event.summary(title);
    }
    if let Some(ref description) = occurrence.description {
        event.description(description);
    }
    if let Some(ref location) = occurrence.location {
        event.location(location);
    }
    if let Some(ref url) = occurrence.url {
        event.add_property("URL", url);
    }
    add_time_property(&mut event, "DTSTART", &occurrence.start);
    add_time_property(&mut event, "DTEND", &occurrence.end);
    if let Some(ref uid) = occurrence.uid {
        event.uid(uid);
    }
    event.done()
}

/// Dates as `VALUE=DATE`, zoned times in UTC, floating times as is.
fn add_time_property(event: &mut Event, name: &str, time: &EventTime) {
    match time {
        EventTime::AllDay(date) => {
            let mut property = Property::new(name, &date.format("%Y%m%d").to_string());
            property.add_parameter("VALUE", "DATE");
            event.append_property(property);
        }
        EventTime::DateTime(datetime) => {
            let utc = datetime.with_timezone(&Utc);
            event.add_property(name, &utc.format("%Y%m%dT%H%M%SZ").to_string());
        }
        EventTime::Floating(datetime) => {
            event.add_property(name, &datetime.format("%Y%m%dT%H%M%S").to_string());
        }
    }
}
