//! Durable artifact store: one JSON file per cache entry.
//!
//! Directory layout:
//! ```text
//! cache_dir/
//!   1x9kq2m0v3ab.json
//!   3w5e11264sgsf.json
//!   .1x9kq2m0v3ab.json.4711-3.tmp   (transient, during writes)
//! ```
//!
//! Writes go to a uniquely named temp file and are renamed into place, so a
//! reader never observes a half-written record.

use super::entry::CacheEntry;
use super::store::{ArtifactStore, EntryIter, StoreError};
use crate::context::CacheKey;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

const RECORD_EXTENSION: &str = "json";

/// [`ArtifactStore`] persisted under a directory.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    tmp_counter: AtomicU64,
}

impl FileStore {
    /// Open a store, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        debug!("Opened file store at {}", dir.display());
        Ok(Self {
            dir,
            tmp_counter: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `key`.
    pub fn record_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}.{RECORD_EXTENSION}"))
    }

    fn tmp_path(&self, key: &CacheKey) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        self.dir
            .join(format!(".{key}.{RECORD_EXTENSION}.{}-{n}.tmp", std::process::id()))
    }

    /// Keys of all record files currently in the directory.
    fn list_keys(&self) -> Result<Vec<CacheKey>, StoreError> {
        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type().is_ok_and(|ft| ft.is_file()) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            match name
                .strip_suffix(".json")
                .and_then(CacheKey::parse)
            {
                Some(key) => keys.push(key),
                None => trace!("Ignoring foreign file in cache dir: {name}"),
            }
        }
        Ok(keys)
    }

    /// Read and decode one record. `Ok(None)` if the file does not exist.
    fn read_record(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        let data = match std::fs::read(self.record_path(key)) {
            Ok(d) => d,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };
        let mut entry: CacheEntry =
            serde_json::from_slice(&data).map_err(|e| StoreError::Corrupt {
                key: key.clone(),
                reason: e.to_string(),
            })?;
        if entry.access_count == 0 {
            return Err(StoreError::Corrupt {
                key: key.clone(),
                reason: "accessCount must be at least 1".into(),
            });
        }
        entry.key = key.clone();
        Ok(Some(entry))
    }
}

impl ArtifactStore for FileStore {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        self.read_record(key)
    }

    fn put(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(entry).map_err(|e| StoreError::Serialize {
            key: entry.key.clone(),
            source: e,
        })?;
        let tmp = self.tmp_path(&entry.key);
        std::fs::write(&tmp, json)?;
        if let Err(e) = std::fs::rename(&tmp, self.record_path(&entry.key)) {
            let _ = std::fs::remove_file(&tmp);
            return Err(StoreError::Io(e));
        }
        Ok(())
    }

    fn delete(&self, key: &CacheKey) -> Result<(), StoreError> {
        match std::fs::remove_file(self.record_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn all_entries(&self) -> Result<EntryIter<'_>, StoreError> {
        let keys = self.list_keys()?;
        // Records removed after the listing are skipped.
        Ok(Box::new(
            keys.into_iter()
                .filter_map(move |key| self.read_record(&key).transpose()),
        ))
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.list_keys()?.len())
    }

    fn clear(&self) -> Result<(), StoreError> {
        for key in self.list_keys()? {
            self.delete(&key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{FingerprintHasher, FingerprintInput};
    use serde_json::json;

    fn entry(prompt: &str) -> CacheEntry {
        let fp = FingerprintInput {
            prompt_text: prompt.into(),
            ..Default::default()
        };
        CacheEntry::new(
            FingerprintHasher::key(&fp),
            fp,
            json!({"name": prompt}),
            42,
        )
    }

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let e = entry("omelette");
        store.put(&e).unwrap();
        assert!(store.record_path(&e.key).exists());
        assert_eq!(store.get(&e.key).unwrap(), Some(e));
    }

    #[test]
    fn reopen_sees_existing_records() {
        let dir = tempfile::tempdir().unwrap();
        let e = entry("omelette");
        FileStore::open(dir.path()).unwrap().put(&e).unwrap();

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
        assert_eq!(reopened.get(&e.key).unwrap().unwrap().artifact, e.artifact);
    }

    #[test]
    fn get_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.get(&entry("x").key).unwrap().is_none());
    }

    #[test]
    fn corrupt_record_reported_with_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let key = entry("x").key;
        std::fs::write(store.record_path(&key), "{ not json").unwrap();

        let err = store.get(&key).unwrap_err();
        assert_eq!(err.corrupt_key(), Some(&key));
    }

    #[test]
    fn zero_access_count_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let mut e = entry("x");
        e.access_count = 0;
        store.put(&e).unwrap();
        assert!(store.get(&e.key).unwrap_err().corrupt_key().is_some());
    }

    #[test]
    fn scan_yields_valid_and_corrupt_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.put(&entry("a")).unwrap();
        store.put(&entry("b")).unwrap();
        let bad = entry("c").key;
        std::fs::write(store.record_path(&bad), "garbage").unwrap();
        std::fs::write(dir.path().join("README.txt"), "not a record").unwrap();

        let results: Vec<_> = store.all_entries().unwrap().collect();
        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 2);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn scan_skips_records_deleted_mid_pass() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let a = entry("a");
        let b = entry("b");
        store.put(&a).unwrap();
        store.put(&b).unwrap();

        let mut iter = store.all_entries().unwrap();
        let first = iter.next().unwrap().unwrap();
        let other = if first.key == a.key { &b } else { &a };
        store.delete(&other.key).unwrap();
        assert!(iter.next().is_none());
    }

    #[test]
    fn clear_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let e = entry("a");
        store.put(&e).unwrap();
        store.put(&entry("b")).unwrap();
        store.delete(&e.key).unwrap();
        store.delete(&e.key).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        store.clear().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.put(&entry("a")).unwrap();
        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }
}
