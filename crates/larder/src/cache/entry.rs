//! Cache records and the values the cache hands back to callers.

use crate::context::{CacheKey, FingerprintInput};
use serde::{Deserialize, Serialize};

/// One cached artifact plus its bookkeeping.
///
/// Persisted as `{fingerprint, artifact, createdAt, lastAccessedAt,
/// accessCount}`; the key is the record's storage name and is not repeated
/// inside the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    #[serde(skip)]
    pub key: CacheKey,
    /// Kept verbatim so later requests can be scored against it.
    pub fingerprint: FingerprintInput,
    /// The generated recipe, opaque to the cache.
    pub artifact: serde_json::Value,
    /// Epoch milliseconds.
    pub created_at: u64,
    /// Epoch milliseconds.
    pub last_accessed_at: u64,
    /// Always ≥ 1.
    pub access_count: u64,
}

impl CacheEntry {
    /// A fresh entry: created and last accessed at `now`, accessed once.
    pub fn new(
        key: CacheKey,
        fingerprint: FingerprintInput,
        artifact: serde_json::Value,
        now_ms: u64,
    ) -> Self {
        Self {
            key,
            fingerprint,
            artifact,
            created_at: now_ms,
            last_accessed_at: now_ms,
            access_count: 1,
        }
    }

    /// Age strictly greater than the TTL means expired.
    pub fn is_expired(&self, now_ms: u64, ttl_ms: u64) -> bool {
        now_ms.saturating_sub(self.created_at) > ttl_ms
    }

    /// Record a hit.
    pub fn touch(&mut self, now_ms: u64) {
        self.last_accessed_at = self.last_accessed_at.max(now_ms);
        self.access_count = self.access_count.saturating_add(1);
    }

    /// Serialized size of the persisted record in bytes.
    pub fn size_bytes(&self) -> usize {
        serde_json::to_vec(self).map_or(0, |v| v.len())
    }
}

/// How a lookup was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitKind {
    /// The request's key matched a stored entry.
    Exact,
    /// A stored fingerprint passed the safety gate and scored at or above
    /// the threshold.
    Similar,
}

/// A successful lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit {
    pub artifact: serde_json::Value,
    pub kind: HitKind,
    /// Key of the entry that served the hit (differs from the request's key
    /// for similarity hits).
    pub key: CacheKey,
    /// Access count after this hit was recorded.
    pub access_count: u64,
    /// Similarity score; 1.0 for exact hits.
    pub score: f64,
}

/// Outcome of [`CacheManager::lookup`](super::manager::CacheManager::lookup).
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Hit(CacheHit),
    Miss,
}

impl Lookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    pub fn hit(self) -> Option<CacheHit> {
        match self {
            Lookup::Hit(h) => Some(h),
            Lookup::Miss => None,
        }
    }
}

/// Read-only introspection of the cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub count: usize,
    pub total_size_bytes: usize,
    /// Oldest `created_at`, if any entries exist.
    pub oldest_timestamp: Option<u64>,
    /// Newest `created_at`, if any entries exist.
    pub newest_timestamp: Option<u64>,
    pub max_access_count: u64,
    /// Corrupt records encountered (and skipped) while computing these stats.
    pub corrupt_records: usize,
    pub exact_hits: u64,
    pub similarity_hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Hit rate as a fraction (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.exact_hits + self.similarity_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry() -> CacheEntry {
        CacheEntry::new(
            CacheKey::default(),
            FingerprintInput::default(),
            json!({"name": "Omelette"}),
            1_000,
        )
    }

    #[test]
    fn new_entry_accessed_once() {
        let e = entry();
        assert_eq!(e.access_count, 1);
        assert_eq!(e.created_at, e.last_accessed_at);
    }

    #[test]
    fn expiry_is_strictly_greater_than_ttl() {
        let e = entry();
        assert!(!e.is_expired(1_500, 500));
        assert!(e.is_expired(1_501, 500));
        // Clock skew backwards never expires.
        assert!(!e.is_expired(0, 500));
    }

    #[test]
    fn touch_increments_and_never_moves_backwards() {
        let mut e = entry();
        e.touch(2_000);
        e.touch(1_500);
        assert_eq!(e.access_count, 3);
        assert_eq!(e.last_accessed_at, 2_000);
    }

    #[test]
    fn persisted_layout_uses_camel_case_and_omits_key() {
        let value = serde_json::to_value(entry()).unwrap();
        let obj = value.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(
            keys,
            [
                "accessCount",
                "artifact",
                "createdAt",
                "fingerprint",
                "lastAccessedAt"
            ]
        );
    }

    #[test]
    fn hit_rate() {
        let stats = CacheStats {
            exact_hits: 1,
            similarity_hits: 1,
            misses: 2,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.5).abs() < 0.01);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
