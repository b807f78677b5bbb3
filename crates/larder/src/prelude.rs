//! Convenience re-exports for common `larder` types.
//!
//! ```ignore
//! use larder::prelude::*;
//! ```
//!
//! Covers what a caller needs to run the pipeline end to end. Lower-level
//! pieces (eviction ranking, similarity scoring, section builders) stay in
//! their modules.

// ── Client ──────────────────────────────────────────────────────────
pub use crate::{ChatRequest, Message, OpenRouterClient, json_schema_for};

// ── Context ─────────────────────────────────────────────────────────
pub use crate::context::{
    CacheKey, ContextNormalizer, FingerprintInput, GenerationRequest, MacroTargets, Preferences,
    UserProfile,
};

// ── Cache ───────────────────────────────────────────────────────────
pub use crate::cache::{
    ArtifactStore, CacheConfig, CacheManager, CacheStats, FileStore, Lookup, MemoryStore,
    StoreError,
};

// ── Prompt and recipe ───────────────────────────────────────────────
pub use crate::prompt::{AssembledPrompt, PromptAssembler};
pub use crate::recipe::{Recipe, validate_artifact};

// ── Generation ──────────────────────────────────────────────────────
pub use crate::generate::{
    GenerateError, Generator, GeneratorConfig, OpenRouterGenerator, RecipeOutcome, RecipeService,
    RecipeSource, RetryConfig,
};
