//! Core types: raw records, event time, normalization, feed query.
//!
//! Everything here is pure: no I/O, no clock. Callers pass "now" in.

pub mod error;
pub mod event;
pub mod normalize;
pub mod query;
pub mod time;
pub mod tracing;

pub use error::{CoreError, CoreResult};
pub use event::{EventOccurrence, NormalizedEvent, RawEvent, RawSession, occurrence_uid};
pub use normalize::{normalize_event, normalize_occurrence};
pub use query::{ALL_DAY_TAG, FeedQuery, MULTI_DAY_TAG, title_case};
pub use time::{EventTime, parse_timestamp};
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
