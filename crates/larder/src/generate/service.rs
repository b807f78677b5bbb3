//! The get-or-generate pipeline.

use super::Generator;
use super::retry::{RetryConfig, retry};
use crate::cache::{CacheManager, HitKind, Lookup};
use crate::context::{
    CacheKey, ContextNormalizer, GenerationRequest, MacroTargets, Preferences, UserProfile,
};
use crate::prompt::{AssembledPrompt, PromptAssembler, TemplateError};
use crate::recipe::{Recipe, ValidationError, validate_artifact};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Where a recipe came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeSource {
    ExactHit,
    SimilarityHit,
    Generated,
}

/// A recipe plus how it was obtained.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeOutcome {
    pub recipe: Recipe,
    /// The cached JSON, exactly as stored.
    #[serde(skip)]
    pub artifact: serde_json::Value,
    pub source: RecipeSource,
    /// Key of the cache entry that served or now holds the recipe.
    pub cache_key: CacheKey,
    pub access_count: u64,
    /// Similarity score for cache hits; `None` for fresh generations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Failure to produce a recipe.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("prompt assembly failed: {0}")]
    Prompt(#[from] TemplateError),
    #[error("generator failed after {attempts} attempt(s): {message}")]
    Provider { message: String, attempts: u32 },
    #[error("generator returned an unusable recipe: {0}")]
    InvalidOutput(#[from] ValidationError),
}

/// Cache-fronted recipe generation.
///
/// A cache failure never blocks generation: lookups that fail are misses
/// and stores that fail are skipped (see [`CacheManager`]). Output that
/// fails validation is returned as an error and never cached.
pub struct RecipeService<G> {
    cache: CacheManager,
    generator: G,
    assembler: PromptAssembler,
    retry: RetryConfig,
}

impl<G: Generator> RecipeService<G> {
    pub fn new(cache: CacheManager, generator: G) -> Self {
        Self {
            cache,
            generator,
            assembler: PromptAssembler::default(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_assembler(mut self, assembler: PromptAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// The prompt a miss for this request would send.
    pub fn prompt_for(
        &self,
        request: &GenerationRequest,
        profile: &UserProfile,
        preferences: &Preferences,
        macros: Option<&MacroTargets>,
    ) -> Result<AssembledPrompt, TemplateError> {
        self.assembler.assemble(request, profile, preferences, macros)
    }

    /// Serve the request from the cache, or generate, validate, and cache a
    /// new recipe.
    pub async fn get_or_generate(
        &self,
        request: &GenerationRequest,
        profile: &UserProfile,
        preferences: &Preferences,
        macros: Option<&MacroTargets>,
    ) -> Result<RecipeOutcome, GenerateError> {
        let fingerprint = ContextNormalizer::normalize(request, profile, preferences);

        if let Lookup::Hit(hit) = self.cache.lookup(&fingerprint) {
            match Recipe::from_artifact(&hit.artifact) {
                Ok(recipe) => {
                    let source = match hit.kind {
                        HitKind::Exact => RecipeSource::ExactHit,
                        HitKind::Similar => RecipeSource::SimilarityHit,
                    };
                    return Ok(RecipeOutcome {
                        recipe,
                        artifact: hit.artifact,
                        source,
                        cache_key: hit.key,
                        access_count: hit.access_count,
                        score: Some(hit.score),
                    });
                }
                Err(e) => warn!("Cached artifact {} no longer decodes, regenerating: {e}", hit.key),
            }
        }

        let prompt = self.prompt_for(request, profile, preferences, macros)?;
        let raw = retry(&self.retry, |attempt| {
            debug!("Generating recipe (attempt {})", attempt + 1);
            self.generator.generate(&prompt)
        })
        .await
        .map_err(|(message, attempts)| GenerateError::Provider { message, attempts })?;

        let (recipe, artifact) = validate_artifact(&raw).inspect_err(|e| {
            warn!("Discarding generator output that failed validation: {e}");
        })?;

        let cache_key = CacheManager::key_for(&fingerprint);
        let evicted = self.cache.store(&fingerprint, artifact.clone());
        info!(
            "Generated recipe '{}' cached under {cache_key} ({} evicted)",
            recipe.name,
            evicted.len()
        );

        Ok(RecipeOutcome {
            recipe,
            artifact,
            source: RecipeSource::Generated,
            cache_key,
            access_count: 1,
            score: None,
        })
    }
}
