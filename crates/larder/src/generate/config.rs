//! Generator settings.

use crate::DEFAULT_MODEL;

/// Model parameters for the generator. Retries are configured on the
/// [`RecipeService`](super::RecipeService) that drives it.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 2048,
            temperature: 0.7,
        }
    }
}

impl GeneratorConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}
