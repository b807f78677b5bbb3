//! Recipe artifact cache.
//!
//! - **[`manager`]**: [`CacheManager`], the only type callers need. Exact
//!   lookup, safety-gated similarity search, TTL, and capacity eviction.
//! - **[`store`]** / **[`file_store`]**: the [`ArtifactStore`] seam with an
//!   in-memory and a one-file-per-entry implementation.
//! - **[`similarity`]**: [`SimilarityScorer`] and the allergy gate.
//! - **[`eviction`]**: keep-score ranking.
//! - **[`clock`]**, **[`config`]**, **[`entry`]**: supporting types.

pub mod clock;
pub mod config;
pub mod entry;
pub mod eviction;
pub mod file_store;
pub mod manager;
pub mod similarity;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, SimilarityConfig, SimilarityWeights, Toggle};
pub use entry::{CacheEntry, CacheHit, CacheStats, HitKind, Lookup};
pub use file_store::FileStore;
pub use manager::CacheManager;
pub use similarity::{Similarity, SimilarityScorer};
pub use store::{ArtifactStore, MemoryStore, StoreError};
