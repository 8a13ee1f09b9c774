//! Occurrence to [`NormalizedEvent`] conversion.
//!
//! The normalization process, per occurrence:
//! 1. Decodes HTML entities in the title (once) and location (twice, the
//!    site double-encodes it)
//! 2. Parses `start`, and `end` (defaulting to `start`)
//! 3. Drops the occurrence if it has already ended in local time
//! 4. Timed events: derives `all_day` (at least 8 hours) and `multi_day`
//!    (more than 24 hours) from the duration, ignoring the source flag
//! 5. All-day events: reduces both ends to local dates and derives
//!    `multi_day` (more than one day apart)

use chrono::{Duration, NaiveDateTime};
use html_escape::decode_html_entities;
use tracing::{debug, warn};

use crate::error::CoreResult;
use crate::event::{EventOccurrence, NormalizedEvent, RawEvent, occurrence_uid};
use crate::time::EventTime;

/// Minimum length, in hours, for a timed event to be shown as all-day.
pub const ALL_DAY_HOURS: i64 = 8;

/// Length, in hours, a timed event must exceed to count as multi-day.
pub const MULTI_DAY_HOURS: i64 = 24;

/// Normalizes one occurrence against the current local time.
///
/// Returns `Ok(None)` when the occurrence has already ended.
///
/// # Errors
///
/// Returns an error when `start` or `end` is not a recognizable timestamp.
pub fn normalize_occurrence(
    occurrence: &EventOccurrence,
    now: NaiveDateTime,
) -> CoreResult<Option<NormalizedEvent>> {
    let title = occurrence.title.as_deref().map(unescape);
    let location = occurrence
        .location
        .as_deref()
        .map(|location| unescape(&unescape(location)));

    let start = EventTime::parse(&occurrence.start)?;
    let end = match occurrence.end.as_deref() {
        Some(end) => EventTime::parse(end)?,
        None => start,
    };

    if end.to_local_naive() <= now {
        return Ok(None);
    }

    let (start, end, all_day, multi_day) = if occurrence.all_day {
        let start = start.into_local_date();
        let end = end.into_local_date();
        let days = end.to_local_date() - start.to_local_date();
        (start, end, true, days > Duration::days(1))
    } else {
        let duration = start.duration_until(&end);
        (
            start,
            end,
            duration >= Duration::hours(ALL_DAY_HOURS),
            duration > Duration::hours(MULTI_DAY_HOURS),
        )
    };

    Ok(Some(NormalizedEvent {
        uid: occurrence
            .id
            .as_deref()
            .map(|id| occurrence_uid(id, occurrence.index)),
        title,
        description: occurrence.description.clone(),
        location,
        url: occurrence.url.clone(),
        start,
        end,
        all_day,
        multi_day,
    }))
}

/// Normalizes every occurrence of a raw event, in session order.
///
/// Ended occurrences are dropped. An occurrence with an unreadable timestamp
/// is logged and skipped so one bad record never aborts a feed.
pub fn normalize_event(raw: &RawEvent, now: NaiveDateTime) -> Vec<NormalizedEvent> {
    raw.occurrences()
        .iter()
        .filter_map(|occurrence| match normalize_occurrence(occurrence, now) {
            Ok(Some(event)) => Some(event),
            Ok(None) => {
                debug!(
                    id = ?occurrence.id,
                    session = occurrence.index,
                    "Dropping past occurrence"
                );
                None
            }
            Err(e) => {
                warn!(
                    id = ?occurrence.id,
                    session = occurrence.index,
                    error = %e,
                    "Skipping occurrence with unreadable time"
                );
                None
            }
        })
        .collect()
}

fn unescape(text: &str) -> String {
    decode_html_entities(text).into_owned()
}
