//! Keyed storage of [`CacheEntry`] records.
//!
//! An [`ArtifactStore`] is pure storage: CRUD, a snapshot scan, and a bulk
//! delete. TTL, eviction, and similarity live in the
//! [`CacheManager`](super::manager::CacheManager).
//!
//! Two implementations ship with the crate: [`MemoryStore`] here, and the
//! durable [`FileStore`](super::file_store::FileStore).

use super::entry::CacheEntry;
use crate::context::CacheKey;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// Storage-layer failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize entry {key}: {source}")]
    Serialize {
        key: CacheKey,
        #[source]
        source: serde_json::Error,
    },
    /// A stored record exists but cannot be decoded.
    #[error("corrupt cache record {key}: {reason}")]
    Corrupt { key: CacheKey, reason: String },
}

impl StoreError {
    /// The key of a corrupt record, if this is a corruption error.
    pub fn corrupt_key(&self) -> Option<&CacheKey> {
        match self {
            StoreError::Corrupt { key, .. } => Some(key),
            _ => None,
        }
    }
}

/// Lazy, finite pass over the entries present when the scan started.
pub type EntryIter<'a> = Box<dyn Iterator<Item = Result<CacheEntry, StoreError>> + Send + 'a>;

/// Keyed store of cache entries. At most one entry exists per key; `put`
/// overwrites.
///
/// Implementations synchronize internally so a shared `&self` can be used
/// from many threads. [`all_entries`](ArtifactStore::all_entries) yields a
/// snapshot: mutations made during the pass may or may not be observed, but
/// never corrupt the store or the pass.
pub trait ArtifactStore: Send + Sync {
    /// Fetch an entry. A record that exists but cannot be decoded is
    /// reported as [`StoreError::Corrupt`].
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError>;

    /// Insert or replace the entry under `entry.key`.
    fn put(&self, entry: &CacheEntry) -> Result<(), StoreError>;

    /// Remove an entry. Removing an absent key is not an error.
    fn delete(&self, key: &CacheKey) -> Result<(), StoreError>;

    /// Scan the entries present at call time.
    fn all_entries(&self) -> Result<EntryIter<'_>, StoreError>;

    fn count(&self) -> Result<usize, StoreError>;

    /// Remove every entry.
    fn clear(&self) -> Result<(), StoreError>;
}

/// In-process store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ArtifactStore for MemoryStore {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        Ok(self.lock().get(key).cloned())
    }

    fn put(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        self.lock().insert(entry.key.clone(), entry.clone());
        Ok(())
    }

    fn delete(&self, key: &CacheKey) -> Result<(), StoreError> {
        self.lock().remove(key);
        Ok(())
    }

    fn all_entries(&self) -> Result<EntryIter<'_>, StoreError> {
        let snapshot: Vec<CacheEntry> = self.lock().values().cloned().collect();
        Ok(Box::new(snapshot.into_iter().map(Ok)))
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.lock().len())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.lock().clear();
        Ok(())
    }
}
