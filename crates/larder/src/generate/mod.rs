//! Recipe generation on cache misses.
//!
//! The external provider sits behind the [`Generator`] trait.
//! [`OpenRouterGenerator`] is the production implementation; tests script
//! their own. [`RecipeService`] runs the full get-or-generate pipeline:
//!
//! ```text
//! normalize ─► cache lookup ─► hit ──────────────────────────────► recipe
//!                  │
//!                  └─ miss ─► assemble prompt ─► generate (retry)
//!                                 ─► validate ─► cache store ─► recipe
//! ```

pub mod config;
pub mod openrouter;
pub mod retry;
pub mod service;

pub use config::GeneratorConfig;
pub use openrouter::OpenRouterGenerator;
pub use retry::RetryConfig;
pub use service::{GenerateError, RecipeOutcome, RecipeService, RecipeSource};

use crate::prompt::AssembledPrompt;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`Generator::generate`].
pub type GenerationFuture<'a> = Pin<Box<dyn Future<Output = Result<String, String>> + Send + 'a>>;

/// An external text generator.
///
/// Returns the raw model output, expected to be a JSON recipe. Errors are
/// provider error strings; see [`retry::classify`] for how they are treated.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &AssembledPrompt) -> GenerationFuture<'_>;
}
