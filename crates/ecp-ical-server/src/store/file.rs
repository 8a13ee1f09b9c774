//! File-backed entity store.
//!
//! Layout: `<root>/<kind>/<sha256(key)>.json`. Each document holds the key,
//! the expiration and both payload slots (base64). Writes go through a
//! temporary file and a rename so readers never see a partial document.
//! Every write gets its own temporary file, so concurrent writers of one key
//! never share one; the last rename wins.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use ecp_ical_scrape::BoxFuture;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};

use super::{Entity, EntityStore, Field, Kind, StoreError, StoreResult};

/// Sequence for temporary file names, unique within the process.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiration: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fullcontent: Option<String>,
}

impl Document {
    fn from_entity(entity: &Entity) -> Self {
        Self {
            key: entity.key.clone(),
            expiration: entity.expiration,
            content: entity.content.as_ref().map(|bytes| STANDARD.encode(bytes)),
            fullcontent: entity.full_content.as_ref().map(|bytes| STANDARD.encode(bytes)),
        }
    }

    fn into_entity(self, kind: Kind) -> StoreResult<Entity> {
        let decode = |slot: Option<String>| -> StoreResult<Option<Vec<u8>>> {
            slot.map(|text| STANDARD.decode(text))
                .transpose()
                .map_err(|e| StoreError::corrupt(kind, self.key.clone(), e.to_string()))
        };
        let content = decode(self.content.clone())?;
        let full_content = decode(self.fullcontent.clone())?;
        Ok(Entity {
            kind,
            key: self.key,
            expiration: self.expiration,
            content,
            full_content,
        })
    }
}

/// Entities stored as JSON documents under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `root`. Directories are created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn kind_dir(&self, kind: Kind) -> PathBuf {
        self.root.join(kind.as_str())
    }

    fn document_path(&self, kind: Kind, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        let name: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
        self.kind_dir(kind).join(format!("{name}.json"))
    }

    async fn read_document(kind: Kind, path: &Path) -> StoreResult<Option<Entity>> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        let document: Document = serde_json::from_slice(&bytes).map_err(|e| {
            StoreError::corrupt(kind, path.display().to_string(), e.to_string())
        })?;
        document.into_entity(kind).map(Some)
    }

    async fn load(&self, kind: Kind, key: &str) -> StoreResult<Option<Entity>> {
        let path = self.document_path(kind, key);
        Self::read_document(kind, &path).await
    }

    async fn store(&self, entity: Entity) -> StoreResult<()> {
        let dir = self.kind_dir(entity.kind);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?;

        let path = self.document_path(entity.kind, &entity.key);
        let tmp = temp_path(&path);
        let body = serde_json::to_vec(&Document::from_entity(&entity))
            .map_err(|e| StoreError::corrupt(entity.kind, entity.key.clone(), e.to_string()))?;

        fs::write(&tmp, body)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StoreError::io(&path, e));
        }

        debug!(kind = %entity.kind, key = %entity.key, path = %path.display(), "Stored entity");
        Ok(())
    }

    async fn scan(&self, kind: Kind, projection: &[Field]) -> StoreResult<Vec<Entity>> {
        let dir = self.kind_dir(kind);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&dir, e)),
        };

        let mut entities = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&dir, e))?
        {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match Self::read_document(kind, &path).await {
                Ok(Some(entity)) => entities.push(entity.project(projection)),
                Ok(None) => {}
                Err(StoreError::Corrupt { message, .. }) => {
                    warn!(path = %path.display(), error = %message, "Skipping unreadable document");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(entities)
    }

    async fn remove(&self, kind: Kind, key: &str) -> StoreResult<bool> {
        let path = self.document_path(kind, key);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(kind = %kind, key = %key, "Removed entity");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }
}

/// `<name>.json` -> `<name>.json.<pid>.<seq>.tmp`, next to the document.
fn temp_path(path: &Path) -> PathBuf {
    let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.{seq}.tmp", std::process::id()));
    path.with_file_name(name)
}

impl EntityStore for FileStore {
    fn get<'a>(&'a self, kind: Kind, key: &'a str) -> BoxFuture<'a, StoreResult<Option<Entity>>> {
        Box::pin(self.load(kind, key))
    }

    fn put(&self, entity: Entity) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(self.store(entity))
    }

    fn query<'a>(
        &'a self,
        kind: Kind,
        projection: &'a [Field],
    ) -> BoxFuture<'a, StoreResult<Vec<Entity>>> {
        Box::pin(self.scan(kind, projection))
    }

    fn delete<'a>(&'a self, kind: Kind, key: &'a str) -> BoxFuture<'a, StoreResult<bool>> {
        Box::pin(self.remove(kind, key))
    }
}
