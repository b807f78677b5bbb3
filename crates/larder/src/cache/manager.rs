//! The cache callers talk to: exact lookup, safety-gated similarity search,
//! TTL expiry, and capacity eviction over an injected [`ArtifactStore`].
//!
//! ## Lookup contract
//!
//! 1. Hash the fingerprint and try the exact key. A live entry is touched
//!    (`last_accessed_at`, `access_count`) and returned as an exact hit.
//! 2. An expired exact entry is deleted, then the lookup falls through.
//! 3. With similarity enabled, every stored entry is scanned. Expired and
//!    corrupt records met during the scan are deleted as a side effect.
//!    The best eligible entry scoring at or above the threshold is touched
//!    and returned as a similarity hit.
//! 4. Otherwise the lookup is a miss.
//!
//! Storage faults on the hot path (`lookup`, `store`) are logged and
//! swallowed: a broken cache degrades to a miss or a no-op, never an error.
//!
//! ## Locking
//!
//! Every mutation of the store happens under one coarse write lock, so
//! concurrent hits on the same entry never lose an `access_count` update.
//! The similarity scan itself runs without the lock; anything it decides to
//! delete or touch is re-read under the lock first, so a record a concurrent
//! writer just replaced is never removed.

use super::clock::{Clock, SystemClock};
use super::config::CacheConfig;
use super::entry::{CacheEntry, CacheHit, CacheStats, HitKind, Lookup};
use super::eviction::{EvictionCandidate, select_evictions};
use super::similarity::{Similarity, SimilarityScorer};
use super::store::{ArtifactStore, StoreError};
use crate::context::{CacheKey, FingerprintHasher, FingerprintInput};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, trace, warn};

/// Recipe cache over a pluggable store.
pub struct CacheManager {
    store: Arc<dyn ArtifactStore>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    scorer: SimilarityScorer,
    write_lock: Mutex<()>,
    exact_hits: AtomicU64,
    similarity_hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("config", &self.config)
            .field("exact_hits", &self.exact_hits.load(Ordering::Relaxed))
            .field("similarity_hits", &self.similarity_hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl CacheManager {
    pub fn new(store: Arc<dyn ArtifactStore>, config: CacheConfig) -> Self {
        let scorer = SimilarityScorer::new(config.similarity.config.weights);
        Self {
            store,
            config,
            clock: Arc::new(SystemClock),
            scorer,
            write_lock: Mutex::new(()),
            exact_hits: AtomicU64::new(0),
            similarity_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The key `fingerprint` is stored under.
    pub fn key_for(fingerprint: &FingerprintInput) -> CacheKey {
        FingerprintHasher::key(fingerprint)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Lookup ────────────────────────────────────────────────────

    /// Find a cached artifact for `fingerprint`. Never fails.
    pub fn lookup(&self, fingerprint: &FingerprintInput) -> Lookup {
        let key = FingerprintHasher::key(fingerprint);

        match self.lookup_exact(&key) {
            Ok(Some(hit)) => {
                self.exact_hits.fetch_add(1, Ordering::Relaxed);
                debug!("Exact cache hit for {key} (access #{})", hit.access_count);
                return Lookup::Hit(hit);
            }
            Ok(None) => {}
            Err(e) => warn!("Exact cache lookup for {key} failed, continuing: {e}"),
        }

        if self.config.similarity.enabled {
            match self.lookup_similar(fingerprint) {
                Ok(Some(hit)) => {
                    self.similarity_hits.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        "Similarity cache hit for {key}: served by {} (score {:.3})",
                        hit.key, hit.score
                    );
                    return Lookup::Hit(hit);
                }
                Ok(None) => {}
                Err(e) => warn!("Similarity scan failed, treating as miss: {e}"),
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("Cache miss for {key}");
        Lookup::Miss
    }

    fn lookup_exact(&self, key: &CacheKey) -> Result<Option<CacheHit>, StoreError> {
        let _guard = self.lock();
        let now = self.clock.now_ms();

        let mut entry = match self.store.get(key) {
            Ok(Some(entry)) => entry,
            Ok(None) => return Ok(None),
            Err(StoreError::Corrupt { key, reason }) => {
                warn!("Deleting corrupt cache record {key}: {reason}");
                self.store.delete(&key)?;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if entry.is_expired(now, self.config.ttl_ms()) {
            debug!("Cache entry {key} expired, deleting");
            self.store.delete(key)?;
            return Ok(None);
        }

        entry.touch(now);
        self.store.put(&entry)?;
        Ok(Some(hit_from(entry, HitKind::Exact, 1.0)))
    }

    fn lookup_similar(
        &self,
        fingerprint: &FingerprintInput,
    ) -> Result<Option<CacheHit>, StoreError> {
        let now = self.clock.now_ms();
        let ttl_ms = self.config.ttl_ms();
        let threshold = self.config.similarity.config.threshold;

        let mut best: Option<(f64, CacheEntry)> = None;
        for item in self.store.all_entries()? {
            let entry = match item {
                Ok(entry) => entry,
                Err(StoreError::Corrupt { key, reason }) => {
                    warn!("Corrupt cache record {key} found during scan: {reason}");
                    self.remove_corrupt(&key);
                    continue;
                }
                Err(e) => {
                    warn!("Skipping unreadable cache record during scan: {e}");
                    continue;
                }
            };

            if entry.is_expired(now, ttl_ms) {
                self.remove_expired(&entry);
                continue;
            }

            match self.scorer.score(fingerprint, &entry.fingerprint) {
                Similarity::Ineligible => trace!("{} ineligible: allergy sets differ", entry.key),
                Similarity::Score(score) if score >= threshold => {
                    if best.as_ref().is_none_or(|(s, b)| outranks(score, &entry, *s, b)) {
                        best = Some((score, entry));
                    }
                }
                Similarity::Score(score) => trace!("{} below threshold ({score:.3})", entry.key),
            }
        }

        let Some((score, candidate)) = best else {
            return Ok(None);
        };

        let _guard = self.lock();
        let now = self.clock.now_ms();
        // The candidate may have been evicted, expired, or replaced since the
        // scan read it. A replacement has the same fingerprint, so its score
        // still holds.
        let mut entry = match self.store.get(&candidate.key)? {
            Some(entry) if !entry.is_expired(now, ttl_ms) => entry,
            _ => return Ok(None),
        };
        entry.touch(now);
        self.store.put(&entry)?;
        Ok(Some(hit_from(entry, HitKind::Similar, score)))
    }

    /// Delete an expired entry seen during a scan, unless it has been
    /// replaced by a newer write in the meantime.
    fn remove_expired(&self, stale: &CacheEntry) {
        let _guard = self.lock();
        match self.store.get(&stale.key) {
            Ok(Some(current)) if current.created_at == stale.created_at => {
                match self.store.delete(&stale.key) {
                    Ok(()) => debug!("Deleted expired cache entry {}", stale.key),
                    Err(e) => warn!("Failed to delete expired entry {}: {e}", stale.key),
                }
            }
            Ok(_) => trace!("Expired entry {} already replaced or removed", stale.key),
            Err(e) => warn!("Failed to re-read expired entry {}: {e}", stale.key),
        }
    }

    /// Delete a corrupt record, unless a writer has since replaced it with a
    /// readable one.
    fn remove_corrupt(&self, key: &CacheKey) {
        let _guard = self.lock();
        if let Err(e) = self.store.get(key)
            && e.corrupt_key().is_some()
        {
            match self.store.delete(key) {
                Ok(()) => debug!("Deleted corrupt cache record {key}"),
                Err(e) => warn!("Failed to delete corrupt record {key}: {e}"),
            }
        }
    }

    // ── Store ─────────────────────────────────────────────────────

    /// Cache `artifact` under `fingerprint`, replacing any entry with the same
    /// key, then evict down to capacity. Returns the evicted keys. Never
    /// fails.
    ///
    /// Eviction ranks every entry except the one just stored, so an insertion
    /// never evicts itself, even when every other entry has a higher keep
    /// score. The new entry is ranked normally from the next insertion on.
    pub fn store(
        &self,
        fingerprint: &FingerprintInput,
        artifact: serde_json::Value,
    ) -> Vec<CacheKey> {
        let key = FingerprintHasher::key(fingerprint);
        match self.try_store(&key, fingerprint, artifact) {
            Ok(evicted) => evicted,
            Err(e) => {
                warn!("Failed to cache artifact under {key}, skipping: {e}");
                Vec::new()
            }
        }
    }

    fn try_store(
        &self,
        key: &CacheKey,
        fingerprint: &FingerprintInput,
        artifact: serde_json::Value,
    ) -> Result<Vec<CacheKey>, StoreError> {
        let _guard = self.lock();
        let now = self.clock.now_ms();
        let entry = CacheEntry::new(key.clone(), fingerprint.clone(), artifact, now);
        self.store.put(&entry)?;
        debug!("Stored cache entry {key}");

        let max = self.config.max_entries;
        if self.store.count()? <= max {
            return Ok(Vec::new());
        }

        let mut candidates = Vec::new();
        for item in self.store.all_entries()? {
            match item {
                Ok(entry) => candidates.push(EvictionCandidate::from(&entry)),
                Err(StoreError::Corrupt { key, reason }) => {
                    warn!("Deleting corrupt cache record {key}: {reason}");
                    self.store.delete(&key)?;
                }
                Err(e) => return Err(e),
            }
        }

        let excess = candidates.len().saturating_sub(max);
        let mut evicted = Vec::with_capacity(excess);
        for victim in select_evictions(&candidates, excess, now, Some(key)) {
            match self.store.delete(&victim) {
                Ok(()) => evicted.push(victim),
                Err(e) => warn!("Failed to evict {victim}: {e}"),
            }
        }
        if !evicted.is_empty() {
            let keys: Vec<&str> = evicted.iter().map(CacheKey::as_str).collect();
            info!(
                "Evicted {} cache entries over capacity {max}: {}",
                evicted.len(),
                keys.join(", ")
            );
        }
        Ok(evicted)
    }

    // ── Administration ────────────────────────────────────────────

    /// Delete every entry.
    pub fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock();
        self.store.clear()?;
        info!("Cache cleared");
        Ok(())
    }

    /// Remove every expired or corrupt record. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize, StoreError> {
        let _guard = self.lock();
        let now = self.clock.now_ms();
        let ttl_ms = self.config.ttl_ms();

        let mut doomed = Vec::new();
        for item in self.store.all_entries()? {
            match item {
                Ok(entry) if entry.is_expired(now, ttl_ms) => doomed.push(entry.key),
                Ok(_) => {}
                Err(StoreError::Corrupt { key, .. }) => doomed.push(key),
                Err(e) => return Err(e),
            }
        }
        for key in &doomed {
            self.store.delete(key)?;
        }
        info!("Purged {} expired or corrupt cache entries", doomed.len());
        Ok(doomed.len())
    }

    /// Read-only snapshot of the cache. Corrupt records are counted, not
    /// deleted.
    pub fn stats(&self) -> Result<CacheStats, StoreError> {
        let mut stats = CacheStats {
            exact_hits: self.exact_hits.load(Ordering::Relaxed),
            similarity_hits: self.similarity_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ..Default::default()
        };

        for item in self.store.all_entries()? {
            let entry = match item {
                Ok(entry) => entry,
                Err(e) if e.corrupt_key().is_some() => {
                    stats.corrupt_records += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };
            stats.count += 1;
            stats.total_size_bytes += entry.size_bytes();
            stats.max_access_count = stats.max_access_count.max(entry.access_count);
            stats.oldest_timestamp = Some(
                stats
                    .oldest_timestamp
                    .map_or(entry.created_at, |t| t.min(entry.created_at)),
            );
            stats.newest_timestamp = Some(
                stats
                    .newest_timestamp
                    .map_or(entry.created_at, |t| t.max(entry.created_at)),
            );
        }
        Ok(stats)
    }
}

fn hit_from(entry: CacheEntry, kind: HitKind, score: f64) -> CacheHit {
    CacheHit {
        access_count: entry.access_count,
        key: entry.key,
        artifact: entry.artifact,
        kind,
        score,
    }
}

/// Higher score wins; ties go to the more recently used entry, then the
/// lower key, so the winner does not depend on scan order.
fn outranks(score: f64, entry: &CacheEntry, best_score: f64, best: &CacheEntry) -> bool {
    if score != best_score {
        return score > best_score;
    }
    (entry.last_accessed_at, std::cmp::Reverse(&entry.key))
        > (best.last_accessed_at, std::cmp::Reverse(&best.key))
}
