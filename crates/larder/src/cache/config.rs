//! Configuration for the [`CacheManager`](super::manager::CacheManager).
//!
//! Everything has a sensible default: a 7-day TTL, 100 entries, and
//! similarity search enabled at a 0.8 threshold.
//!
//! ```ignore
//! let config = CacheConfig::default()
//!     .with_ttl(Duration::from_secs(3 * 24 * 3600))
//!     .with_max_entries(50)
//!     .with_similarity_threshold(0.85);
//!
//! // Exact-match only:
//! let exact_only = CacheConfig {
//!     similarity: Toggle::disabled(),
//!     ..CacheConfig::default()
//! };
//! ```

use std::time::Duration;

/// Default time-to-live for cached artifacts.
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default capacity.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Default minimum similarity score for a similarity hit.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

// ── Generic toggle ────────────────────────────────────────────────

/// Generic enabled/disabled wrapper for module configurations.
///
/// When `enabled` is `false`, the module is skipped regardless of the inner
/// config values.
#[derive(Debug, Clone)]
pub struct Toggle<T: Default> {
    /// Whether this module is active.
    pub enabled: bool,
    /// Module-specific configuration.
    pub config: T,
}

impl<T: Default> Toggle<T> {
    /// Create a disabled instance with default inner config.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            config: T::default(),
        }
    }

    /// Create an enabled instance with the given inner config.
    pub fn enabled(config: T) -> Self {
        Self {
            enabled: true,
            config,
        }
    }
}

impl<T: Default> Default for Toggle<T> {
    fn default() -> Self {
        Self {
            enabled: true,
            config: T::default(),
        }
    }
}

// ── Similarity ────────────────────────────────────────────────────

/// Per-factor weights of the similarity score. Must sum to 1.0.
///
/// The `allergy` weight scales a factor that is 1.0 for every eligible pair.
/// It never substitutes for the allergy gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityWeights {
    pub prompt: f64,
    pub skill: f64,
    pub dietary: f64,
    pub allergy: f64,
    pub tools: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            prompt: 0.4,
            skill: 0.1,
            dietary: 0.2,
            allergy: 0.2,
            tools: 0.1,
        }
    }
}

impl SimilarityWeights {
    pub fn sum(&self) -> f64 {
        self.prompt + self.skill + self.dietary + self.allergy + self.tools
    }

    /// Check that every weight is non-negative and that they sum to 1.0.
    pub fn validate(&self) -> Result<(), String> {
        let all = [self.prompt, self.skill, self.dietary, self.allergy, self.tools];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(format!("similarity weights must be non-negative: {self:?}"));
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(format!("similarity weights must sum to 1.0, got {sum:.6}"));
        }
        Ok(())
    }
}

/// Similarity-search settings.
#[derive(Debug, Clone)]
pub struct SimilarityConfig {
    /// Minimum score (inclusive) for a candidate to count as a hit.
    pub threshold: f64,
    pub weights: SimilarityWeights,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            weights: SimilarityWeights::default(),
        }
    }
}

// ── Cache config ──────────────────────────────────────────────────

/// Configuration for a [`CacheManager`](super::manager::CacheManager).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Entries older than this (by `created_at`) are expired.
    pub ttl: Duration,
    /// Capacity; exceeding it triggers keep-score eviction.
    pub max_entries: usize,
    /// Similarity search over stored fingerprints on exact miss.
    pub similarity: Toggle<SimilarityConfig>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_entries: DEFAULT_MAX_ENTRIES,
            similarity: Toggle::default(),
        }
    }
}

impl CacheConfig {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the capacity. Clamped to at least 1.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity.config.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_similarity_weights(mut self, weights: SimilarityWeights) -> Self {
        self.similarity.config.weights = weights;
        self
    }

    /// Disable similarity search (exact matches only).
    pub fn without_similarity(mut self) -> Self {
        self.similarity.enabled = false;
        self
    }

    pub(crate) fn ttl_ms(&self) -> u64 {
        self.ttl.as_millis() as u64
    }
}
