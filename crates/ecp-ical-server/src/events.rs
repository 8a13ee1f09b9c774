//! Persistent store of extracted event records.
//!
//! Records are JSON, zlib-compressed, and land in one of two slots: small
//! blobs in `content`, which the bulk listing projects, and larger ones in
//! `fullcontent`, which costs an extra point read per record.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use ecp_ical_core::RawEvent;
use tracing::{debug, trace, warn};

use crate::cache::DEFAULT_TTL_DAYS;
use crate::codec;
use crate::error::ServerResult;
use crate::store::{Entity, EntityStore, Field, Kind, StoreError};

/// Compressed size from which a record goes to the `fullcontent` slot.
pub const INLINE_LIMIT: usize = 1500;

/// Which payload slot a blob belongs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Content,
    FullContent,
}

/// Picks the slot for a compressed blob of `len` bytes.
pub fn slot_for(len: usize) -> Slot {
    if len < INLINE_LIMIT {
        Slot::Content
    } else {
        Slot::FullContent
    }
}

/// Event records keyed by event page URL.
#[derive(Clone)]
pub struct EventStore {
    store: Arc<dyn EntityStore>,
    ttl: Duration,
}

impl EventStore {
    /// Creates an event store over `store`.
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            ttl: Duration::days(DEFAULT_TTL_DAYS),
        }
    }

    /// Sets the time-to-live of new records.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns every unexpired record, keyed by event URL.
    ///
    /// Records stored in the full slot are read back one by one. A record
    /// that fails to read or decode is logged and left out. Expired records
    /// are removed from the store as they are found.
    pub async fn list_all(&self) -> ServerResult<HashMap<String, RawEvent>> {
        let now = Utc::now();
        let rows = self
            .store
            .query(Kind::Event, &[Field::Content, Field::Expiration])
            .await?;

        let mut events = HashMap::with_capacity(rows.len());
        let mut expired = 0usize;
        for row in rows {
            if row.is_expired(now) {
                expired += 1;
                self.prune(&row.key).await;
                continue;
            }

            let full;
            let blob = match row.content.as_deref() {
                Some(content) if !content.is_empty() => content,
                _ => {
                    full = match self.store.get(Kind::Event, &row.key).await {
                        Ok(full) => full,
                        Err(StoreError::Corrupt { message, .. }) => {
                            warn!(url = %row.key, error = %message, "Skipping unreadable stored event");
                            continue;
                        }
                        Err(e) => return Err(e.into()),
                    };
                    match full.as_ref().and_then(Entity::payload) {
                        Some(blob) => blob,
                        None => {
                            warn!(url = %row.key, "Stored event has no payload");
                            continue;
                        }
                    }
                }
            };

            match codec::decode::<RawEvent>(blob) {
                Ok(event) => {
                    events.insert(row.key, event);
                }
                Err(e) => warn!(url = %row.key, error = %e, "Skipping unreadable stored event"),
            }
        }

        debug!(count = events.len(), expired, "Listed stored events");
        Ok(events)
    }

    /// Drops an expired record. Failures only cost disk space, so they are logged.
    async fn prune(&self, url: &str) {
        match self.store.delete(Kind::Event, url).await {
            Ok(_) => trace!(url = %url, "Pruned expired event"),
            Err(e) => warn!(url = %url, error = %e, "Failed to prune expired event"),
        }
    }

    /// Stores `event` under `url`, replacing any previous record.
    pub async fn put(&self, url: &str, event: &RawEvent) -> ServerResult<()> {
        let blob = codec::encode(event)?;
        let size = blob.len();
        let slot = slot_for(size);

        let entity = Entity::new(Kind::Event, url).with_expiration(Utc::now() + self.ttl);
        let entity = match slot {
            Slot::Content => entity.with_content(blob),
            Slot::FullContent => entity.with_full_content(blob),
        };
        self.store.put(entity).await?;

        debug!(url = %url, size, slot = ?slot, "Stored event");
        Ok(())
    }
}
