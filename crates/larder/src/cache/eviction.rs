//! Capacity eviction: rank entries by keep score, evict the lowest.
//!
//! keep score = `access_count / (1 + staleness_secs)`
//!
//! where staleness is the time since the entry was last accessed. An entry
//! that is used often and recently scores high and is protected; an entry
//! touched once long ago scores near zero and goes first.
//!
//! Ties are broken by older `last_accessed_at`, then older `created_at`, then
//! key, so eviction order is fully deterministic.

use super::entry::CacheEntry;
use crate::context::CacheKey;
use std::cmp::Ordering;

/// The metadata eviction needs from an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct EvictionCandidate {
    pub key: CacheKey,
    pub access_count: u64,
    pub last_accessed_at: u64,
    pub created_at: u64,
}

impl From<&CacheEntry> for EvictionCandidate {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            key: entry.key.clone(),
            access_count: entry.access_count,
            last_accessed_at: entry.last_accessed_at,
            created_at: entry.created_at,
        }
    }
}

impl EvictionCandidate {
    pub fn keep_score(&self, now_ms: u64) -> f64 {
        keep_score(self.access_count, self.last_accessed_at, now_ms)
    }
}

/// `access_count / (1 + staleness_secs)`.
pub fn keep_score(access_count: u64, last_accessed_at: u64, now_ms: u64) -> f64 {
    let staleness_secs = now_ms.saturating_sub(last_accessed_at) as f64 / 1000.0;
    access_count as f64 / (1.0 + staleness_secs)
}

/// Choose exactly `excess` keys to evict (fewer only if there are not enough
/// candidates), lowest keep score first. `protected`, if given, is never
/// chosen.
pub fn select_evictions(
    candidates: &[EvictionCandidate],
    excess: usize,
    now_ms: u64,
    protected: Option<&CacheKey>,
) -> Vec<CacheKey> {
    if excess == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<(f64, &EvictionCandidate)> = candidates
        .iter()
        .filter(|c| protected != Some(&c.key))
        .map(|c| (c.keep_score(now_ms), c))
        .collect();

    ranked.sort_by(|(sa, a), (sb, b)| {
        sa.partial_cmp(sb)
            .unwrap_or(Ordering::Equal)
            .then(a.last_accessed_at.cmp(&b.last_accessed_at))
            .then(a.created_at.cmp(&b.created_at))
            .then(a.key.cmp(&b.key))
    });

    ranked
        .into_iter()
        .take(excess)
        .map(|(_, c)| c.key.clone())
        .collect()
}
