//! Personalized recipe generation with a safety-gated artifact cache.
//!
//! Generating a recipe with an LLM is slow and costs money, and many
//! requests are near-duplicates of earlier ones. `larder` sits in front of
//! the generator: each request is normalized into a fingerprint together
//! with the user's profile and preferences, and a previously generated
//! recipe is reused when the fingerprint matches exactly or is similar
//! enough. A cached recipe is never served across different allergy sets.
//!
//! # Getting started
//!
//! ```ignore
//! use larder::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     let store = FileStore::open("/var/cache/larder").map_err(|e| e.to_string())?;
//!     let cache = CacheManager::new(Arc::new(store), CacheConfig::default());
//!
//!     let client = OpenRouterClient::new(std::env::var("OPENROUTER_KEY").unwrap())?;
//!     let generator = OpenRouterGenerator::new(client, GeneratorConfig::default());
//!
//!     let service = RecipeService::new(cache, generator);
//!     let profile = UserProfile::default()
//!         .with_skill_level("basic_skills")
//!         .with_kitchen_tools(["stove"]);
//!     let outcome = service
//!         .get_or_generate(
//!             &GenerationRequest::new("quick breakfast with eggs"),
//!             &profile,
//!             &Preferences::default(),
//!             None,
//!         )
//!         .await
//!         .map_err(|e| e.to_string())?;
//!
//!     println!("{} ({:?})", outcome.recipe.name, outcome.source);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`context`] | Request/profile/preferences records, normalization, fingerprint hashing |
//! | [`cache`] | [`CacheManager`](cache::CacheManager), similarity scoring, eviction, stores |
//! | [`prompt`] | Section builders, template population, [`PromptAssembler`] |
//! | [`recipe`] | The recipe schema and generator-output validation |
//! | [`generate`] | The [`Generator`] seam, retries, [`RecipeService`] |
//!
//! [`PromptAssembler`]: prompt::PromptAssembler
//! [`Generator`]: generate::Generator
//! [`RecipeService`]: generate::RecipeService

pub mod cache;
pub mod context;
pub mod generate;
pub mod prelude;
pub mod prompt;
pub mod recipe;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

// ── Constants ──────────────────────────────────────────────────────

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model for recipe generation.
pub const DEFAULT_MODEL: &str = "z-ai/glm-5";

// ── Schema generation ──────────────────────────────────────────────

/// Generate a JSON Schema object for a type that derives
/// `schemars::JsonSchema`.
///
/// ```
/// use larder::json_schema_for;
/// use schemars::JsonSchema;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct Dish {
///     name: String,
///     #[serde(default)]
///     servings: Option<u32>,
/// }
///
/// let schema = json_schema_for::<Dish>();
/// assert_eq!(schema["type"], "object");
/// assert!(schema["required"].as_array().unwrap().contains(&"name".into()));
/// ```
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
}

// ── Request types ──────────────────────────────────────────────────

/// Chat completion request body. Unset optional fields are omitted.
#[derive(Serialize, Debug, Default)]
pub struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "is_zero_u32")]
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "is_zero_f32")]
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}
fn is_zero_f32(v: &f32) -> bool {
    *v == 0.0
}

/// JSON output format type.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ResponseFormatType {
    #[serde(rename = "json_object")]
    JsonObject,
}

/// JSON output mode.
#[derive(Serialize, Debug)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub fmt_type: ResponseFormatType,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            fmt_type: ResponseFormatType::JsonObject,
        }
    }
}

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A chat message.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

// ── Response types ─────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Clean return type from [`OpenRouterClient::chat`].
#[derive(Debug)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub usage: Option<UsageInfo>,
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

impl RawChatResponse {
    fn into_completion(self) -> Result<ChatCompletion, String> {
        if let Some(err) = self.error {
            return Err(format!("OpenRouter API error: {}", err.message));
        }
        let choice = self.choices.and_then(|c| c.into_iter().next());
        Ok(match choice {
            Some(c) => ChatCompletion {
                content: c.message.content,
                usage: self.usage,
                finish_reason: c.finish_reason,
            },
            None => ChatCompletion {
                content: None,
                usage: self.usage,
                finish_reason: None,
            },
        })
    }
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for the OpenRouter chat completions API.
pub struct OpenRouterClient {
    client: reqwest::Client,
    api_key: String,
    referer: String,
    title: String,
}

impl std::fmt::Debug for OpenRouterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterClient")
            .field("referer", &self.referer)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

impl OpenRouterClient {
    /// Create a client with the given API key and default headers.
    pub fn new(api_key: impl Into<String>) -> Result<Self, String> {
        Self::with_headers(api_key, "https://github.com/tacryt-socryp/larder", "larder")
    }

    /// Create a client with custom Referer and X-Title headers.
    pub fn with_headers(
        api_key: impl Into<String>,
        referer: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent("larder/0.1")
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            referer: referer.into(),
            title: title.into(),
        })
    }

    /// Send a chat completion request.
    pub async fn chat(&self, body: &ChatRequest) -> Result<ChatCompletion, String> {
        debug!(
            "LLM request: model={}, messages={}, max_tokens={}, temp={}",
            body.model.as_deref().unwrap_or("(none)"),
            body.messages.len(),
            body.max_tokens,
            body.temperature,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();
        let resp = self
            .client
            .post(OPENROUTER_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| format!("failed to read response: {e}"))?;
        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(format!("OpenRouter API HTTP {status}: {text}"));
        }

        let parsed: RawChatResponse =
            serde_json::from_str(&text).map_err(|e| format!("failed to parse response: {e}"))?;
        if let Some(ref usage) = parsed.usage {
            debug!(
                "Token usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens.unwrap_or(0),
                usage.completion_tokens.unwrap_or(0),
                usage.total_tokens.unwrap_or(0),
            );
        }
        parsed.into_completion()
    }
}
