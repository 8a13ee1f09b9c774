//! Entity store abstraction.
//!
//! A minimal key/value document store: entities live under a [`Kind`] and a
//! string key, and carry an expiration plus two blob slots. Projected queries
//! return every entity of a kind with only the requested fields populated.
//!
//! Backends:
//! - [`MemoryStore`] - process-local, for tests and throwaway instances
//! - [`FileStore`] - one JSON document per entity under a data directory

mod file;
mod memory;

use std::fmt;
use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use ecp_ical_scrape::BoxFuture;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing files failed.
    #[error("store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A stored document could not be read back.
    #[error("corrupt {kind} entity {key}: {message}")]
    Corrupt {
        kind: Kind,
        key: String,
        message: String,
    },
}

impl StoreError {
    /// Creates an I/O error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a corrupt entity error.
    pub fn corrupt(kind: Kind, key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Corrupt {
            kind,
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Entity namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    /// Parsed listing pages.
    Page,
    /// Extracted event records.
    Event,
}

impl Kind {
    /// Returns the stable name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Event => "event",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity fields a query can project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Expiration,
    Content,
    FullContent,
}

/// A stored entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub kind: Kind,
    pub key: String,
    pub expiration: Option<DateTime<Utc>>,
    /// Compact payload slot.
    pub content: Option<Vec<u8>>,
    /// Payload slot for records too large for `content`.
    pub full_content: Option<Vec<u8>>,
}

impl Entity {
    /// Creates an empty entity.
    pub fn new(kind: Kind, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
            expiration: None,
            content: None,
            full_content: None,
        }
    }

    /// Builder method to set the expiration.
    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Builder method to set the compact payload.
    pub fn with_content(mut self, content: Vec<u8>) -> Self {
        self.content = Some(content);
        self
    }

    /// Builder method to set the full payload.
    pub fn with_full_content(mut self, full_content: Vec<u8>) -> Self {
        self.full_content = Some(full_content);
        self
    }

    /// Returns true once `now` has reached the expiration.
    ///
    /// An entity without an expiration is treated as stale.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_none_or(|expiration| expiration <= now)
    }

    /// Returns the populated payload, preferring the compact slot.
    pub fn payload(&self) -> Option<&[u8]> {
        self.content
            .as_deref()
            .filter(|content| !content.is_empty())
            .or(self.full_content.as_deref())
    }

    /// Returns a copy carrying only the projected fields.
    pub fn project(&self, projection: &[Field]) -> Self {
        let mut projected = Self::new(self.kind, self.key.clone());
        for field in projection {
            match field {
                Field::Expiration => projected.expiration = self.expiration,
                Field::Content => projected.content = self.content.clone(),
                Field::FullContent => projected.full_content = self.full_content.clone(),
            }
        }
        projected
    }
}

/// A document store holding [`Entity`] values.
pub trait EntityStore: Send + Sync {
    /// Point read by kind and key.
    fn get<'a>(&'a self, kind: Kind, key: &'a str) -> BoxFuture<'a, StoreResult<Option<Entity>>>;

    /// Inserts or replaces an entity.
    fn put(&self, entity: Entity) -> BoxFuture<'_, StoreResult<()>>;

    /// Returns every entity of `kind` with only the projected fields set.
    fn query<'a>(
        &'a self,
        kind: Kind,
        projection: &'a [Field],
    ) -> BoxFuture<'a, StoreResult<Vec<Entity>>>;

    /// Removes an entity. Returns whether it existed.
    fn delete<'a>(&'a self, kind: Kind, key: &'a str) -> BoxFuture<'a, StoreResult<bool>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample() -> Entity {
        Entity::new(Kind::Event, "https://pittecp.org/event-1")
            .with_expiration(Utc::now() + Duration::days(1))
            .with_content(vec![1, 2, 3])
            .with_full_content(vec![4])
    }

    #[test]
    fn expiration() {
        let now = Utc::now();
        let entity = Entity::new(Kind::Page, "k").with_expiration(now);
        assert!(entity.is_expired(now));
        assert!(!entity.is_expired(now - Duration::seconds(1)));
        assert!(Entity::new(Kind::Page, "k").is_expired(now));
    }

    #[test]
    fn payload_prefers_non_empty_content() {
        assert_eq!(sample().payload(), Some(&[1u8, 2, 3][..]));

        let mut entity = sample();
        entity.content = Some(Vec::new());
        assert_eq!(entity.payload(), Some(&[4u8][..]));

        entity.full_content = None;
        assert_eq!(entity.payload(), None);
    }

    #[test]
    fn projection_keeps_only_requested_fields() {
        let projected = sample().project(&[Field::Content, Field::Expiration]);
        assert_eq!(projected.key, "https://pittecp.org/event-1");
        assert!(projected.expiration.is_some());
        assert_eq!(projected.content, Some(vec![1, 2, 3]));
        assert!(projected.full_content.is_none());
    }

    #[test]
    fn kind_names() {
        assert_eq!(Kind::Page.to_string(), "page");
        assert_eq!(Kind::Event.as_str(), "event");
    }
}
