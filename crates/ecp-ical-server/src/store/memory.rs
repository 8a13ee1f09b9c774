//! In-memory entity store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use ecp_ical_scrape::BoxFuture;
use tokio::sync::RwLock;
use tracing::trace;

use super::{Entity, EntityStore, Field, Kind, StoreResult};

/// Entities kept in a map for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entities: RwLock<BTreeMap<(Kind, String), Entity>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `put` calls served so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// Number of stored entities of `kind`.
    pub async fn count(&self, kind: Kind) -> usize {
        self.entities
            .read()
            .await
            .keys()
            .filter(|(k, _)| *k == kind)
            .count()
    }
}

impl EntityStore for MemoryStore {
    fn get<'a>(&'a self, kind: Kind, key: &'a str) -> BoxFuture<'a, StoreResult<Option<Entity>>> {
        Box::pin(async move {
            let entities = self.entities.read().await;
            Ok(entities.get(&(kind, key.to_string())).cloned())
        })
    }

    fn put(&self, entity: Entity) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            trace!(kind = %entity.kind, key = %entity.key, "Storing entity in memory");
            self.writes.fetch_add(1, Ordering::Relaxed);
            self.entities
                .write()
                .await
                .insert((entity.kind, entity.key.clone()), entity);
            Ok(())
        })
    }

    fn query<'a>(
        &'a self,
        kind: Kind,
        projection: &'a [Field],
    ) -> BoxFuture<'a, StoreResult<Vec<Entity>>> {
        Box::pin(async move {
            let entities = self.entities.read().await;
            Ok(entities
                .iter()
                .filter(|((k, _), _)| *k == kind)
                .map(|(_, entity)| entity.project(projection))
                .collect())
        })
    }

    fn delete<'a>(&'a self, kind: Kind, key: &'a str) -> BoxFuture<'a, StoreResult<bool>> {
        Box::pin(async move {
            let removed = self.entities.write().await.remove(&(kind, key.to_string()));
            Ok(removed.is_some())
        })
    }
}
