//! Object-storage source.
//!
//! Object stores have no atomic rename, so a claim is a copy to the claim key
//! followed by a delete of the original. Whichever step fails first tells a
//! worker it lost the race. The protocol only needs four primitives, so S3
//! and the in-memory store used in tests sit behind [`ObjectStore`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::naming::{is_candidate, object_claim_key, object_processed_key};
use super::{ClaimedItem, ImportSource, LineReader, SourceError, SourceItem};

/// Minimal object-store operations.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket or store name, for logs.
    fn describe(&self) -> String;

    /// All keys starting with `prefix`.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, SourceError>;

    /// Copy `from` to `to`. Fails with `SourceError::NotFound` if `from`
    /// does not exist.
    async fn copy(&self, from: &str, to: &str) -> Result<(), SourceError>;

    async fn delete(&self, key: &str) -> Result<(), SourceError>;

    /// Download an object's bytes into `dest`, replacing its contents.
    async fn download_to(&self, key: &str, dest: &Path) -> Result<(), SourceError>;
}

/// Import source over an [`ObjectStore`].
#[derive(Clone)]
pub struct ObjectStoreSource {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    temp_dir: Option<PathBuf>,
}

impl ObjectStoreSource {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            temp_dir: None,
        }
    }

    /// Directory for scratch downloads; the system temp dir otherwise.
    pub fn with_temp_dir(mut self, temp_dir: Option<PathBuf>) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    fn scratch_file(&self) -> std::io::Result<tempfile::NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("s3jl_").suffix(".jl");
        match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
    }
}

fn lost_race(key: &str, step: &str, e: SourceError) -> SourceError {
    match e {
        SourceError::NotFound(_) => debug!(key, step, "Claim step found no object"),
        other => warn!(key, step, error = %other, "Claim step failed"),
    }
    SourceError::AlreadyClaimed(key.to_string())
}

#[async_trait]
impl ImportSource for ObjectStoreSource {
    fn describe(&self) -> String {
        format!("{}/{}", self.store.describe(), self.prefix)
    }

    async fn list(&self) -> Result<Vec<SourceItem>, SourceError> {
        let mut keys: Vec<String> = self
            .store
            .list_keys(&self.prefix)
            .await?
            .into_iter()
            .filter(|k| is_candidate(k))
            .collect();
        keys.sort();
        Ok(keys.into_iter().map(SourceItem::new).collect())
    }

    async fn claim(&self, item: &SourceItem) -> Result<ClaimedItem, SourceError> {
        let key = item.id.as_str();
        let claim_key = object_claim_key(key).ok_or_else(|| SourceError::NotJl(key.into()))?;

        self.store
            .copy(key, &claim_key)
            .await
            .map_err(|e| lost_race(key, "copy", e))?;
        self.store
            .delete(key)
            .await
            .map_err(|e| lost_race(key, "delete", e))?;

        info!(key, claim = %claim_key, "Claimed object");
        Ok(ClaimedItem::new(item.clone(), claim_key))
    }

    async fn read(&self, claimed: &ClaimedItem) -> Result<LineReader, SourceError> {
        let scratch = self
            .scratch_file()
            .map_err(|e| SourceError::io("scratch file", e))?;
        self.store
            .download_to(&claimed.claim_id, scratch.path())
            .await?;
        debug!(
            key = %claimed.claim_id,
            scratch = %scratch.path().display(),
            "Downloaded object"
        );
        LineReader::from_scratch(scratch).await
    }

    async fn complete(&self, claimed: ClaimedItem) -> Result<(), SourceError> {
        let (item, claim_key) = claimed.consume();
        let processed_key =
            object_processed_key(&item.id).ok_or_else(|| SourceError::NotJl(item.id.clone()))?;

        self.store.copy(&claim_key, &processed_key).await?;
        self.store.delete(&claim_key).await?;
        info!(key = %item, processed = %processed_key, "Marked object processed");
        Ok(())
    }
}

/// In-process object store.
///
/// Deleting a missing key is an error, unlike S3, which makes the
/// copy-then-delete claim strictly exclusive here.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.lock().insert(key.into(), body.into());
    }

    /// Snapshot of all keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        // A panic while holding the lock leaves the map itself consistent.
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, SourceError> {
        Ok(self
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn copy(&self, from: &str, to: &str) -> Result<(), SourceError> {
        let mut objects = self.lock();
        let body = objects
            .get(from)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(from.to_string()))?;
        objects.insert(to.to_string(), body);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), SourceError> {
        self.lock()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| SourceError::NotFound(key.to_string()))
    }

    async fn download_to(&self, key: &str, dest: &Path) -> Result<(), SourceError> {
        let body = self
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(key.to_string()))?;
        tokio::fs::write(dest, body)
            .await
            .map_err(|e| SourceError::io(dest.display(), e))
    }
}
