//! Event records.
//!
//! [`RawEvent`] is the record recovered from an event page's embedded script,
//! exactly as the site describes it. It is what gets cached. A raw event may
//! carry `sessions`, partial overrides describing individual occurrences;
//! [`RawEvent::occurrences`] merges each session over the base record to
//! produce an [`EventOccurrence`]. The normalizer then turns an occurrence
//! into a [`NormalizedEvent`] ready for the feed.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::time::EventTime;

/// An event record as extracted from the upstream site.
///
/// Field names follow the upstream JavaScript object. Keys this type does
/// not know about are kept in `extra` so that a cached record round-trips
/// unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Upstream identifier (a number or a string upstream, kept as text).
    #[serde(
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,

    /// Event title, possibly HTML-escaped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Start timestamp text.
    pub start: String,

    /// End timestamp text; defaults to `start` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,

    /// Upstream all-day flag.
    #[serde(rename = "allDay", default, skip_serializing_if = "Option::is_none")]
    pub all_day: Option<bool>,

    /// Location, double HTML-escaped upstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Plain-text description taken from the page body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Canonical event page URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Individual occurrences, each overriding fields of the base record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions: Option<Vec<RawSession>>,

    /// Everything else the upstream object carried.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A partial override describing one occurrence of an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSession {
    #[serde(
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(rename = "allDay", default, skip_serializing_if = "Option::is_none")]
    pub all_day: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One occurrence of an event: the base record with a session merged over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOccurrence {
    /// Position of the session within the event (0 for the implicit session).
    pub index: usize,
    pub id: Option<String>,
    pub title: Option<String>,
    pub start: String,
    pub end: Option<String>,
    pub all_day: bool,
    pub location: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
}

impl RawEvent {
    /// Creates a record with only a start time.
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            id: None,
            title: None,
            start: start.into(),
            end: None,
            all_day: None,
            location: None,
            description: None,
            url: None,
            sessions: None,
            extra: Map::new(),
        }
    }

    /// Builder method to set the identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builder method to set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Builder method to set the end time.
    pub fn with_end(mut self, end: impl Into<String>) -> Self {
        self.end = Some(end.into());
        self
    }

    /// Builder method to set the all-day flag.
    pub fn with_all_day(mut self, all_day: bool) -> Self {
        self.all_day = Some(all_day);
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set the page URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Builder method to set the sessions.
    pub fn with_sessions(mut self, sessions: Vec<RawSession>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Expands the record into its occurrences.
    ///
    /// An event without sessions (absent or empty) has exactly one implicit
    /// occurrence: itself.
    pub fn occurrences(&self) -> Vec<EventOccurrence> {
        match self.sessions.as_deref() {
            Some(sessions) if !sessions.is_empty() => sessions
                .iter()
                .enumerate()
                .map(|(index, session)| self.merge(index, session))
                .collect(),
            _ => vec![self.merge(0, &RawSession::default())],
        }
    }

    fn merge(&self, index: usize, session: &RawSession) -> EventOccurrence {
        fn pick(over: &Option<String>, base: &Option<String>) -> Option<String> {
            over.as_ref().or(base.as_ref()).cloned()
        }

        EventOccurrence {
            index,
            id: pick(&session.id, &self.id),
            title: pick(&session.title, &self.title),
            start: session.start.clone().unwrap_or_else(|| self.start.clone()),
            end: pick(&session.end, &self.end),
            all_day: session.all_day.or(self.all_day).unwrap_or(false),
            location: pick(&session.location, &self.location),
            description: pick(&session.description, &self.description),
            url: pick(&session.url, &self.url),
        }
    }
}

/// A display-ready event occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    /// `{id}_{sessionIndex}` when the record has an id.
    pub uid: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    /// Shown as an all-day event (source flag, or a long timed block).
    pub all_day: bool,
    /// Spans more than one day.
    pub multi_day: bool,
}

/// Formats the feed UID for an occurrence.
pub fn occurrence_uid(id: &str, index: usize) -> String {
    format!("{id}_{index}")
}

/// Accepts a string, number or boolean and keeps it as text.
///
/// Whole numbers read back as floats (relaxed JSON parsers do this) are
/// written without a fraction.
fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) if number.is_f64() => match number.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", f as i64)),
            _ => Some(number.to_string()),
        },
        Some(other) => Some(other.to_string()),
    })
}
