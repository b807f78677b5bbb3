//! [`Generator`] backed by the OpenRouter chat-completions API.

use super::config::GeneratorConfig;
use super::{GenerationFuture, Generator};
use crate::prompt::AssembledPrompt;
use crate::{ChatRequest, Message, OpenRouterClient, ResponseFormat};
use tracing::debug;

/// Sends the assembled prompt as a system + user message pair and asks for
/// a JSON object back.
#[derive(Debug)]
pub struct OpenRouterGenerator {
    client: OpenRouterClient,
    config: GeneratorConfig,
}

impl OpenRouterGenerator {
    pub fn new(client: OpenRouterClient, config: GeneratorConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn request(&self, prompt: &AssembledPrompt) -> ChatRequest {
        ChatRequest {
            model: Some(self.config.model.clone()),
            messages: vec![
                Message::system(prompt.system.clone()),
                Message::user(prompt.user.clone()),
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            response_format: Some(ResponseFormat::json_object()),
            ..Default::default()
        }
    }
}

impl Generator for OpenRouterGenerator {
    fn generate(&self, prompt: &AssembledPrompt) -> GenerationFuture<'_> {
        let body = self.request(prompt);
        Box::pin(async move {
            let completion = self.client.chat(&body).await?;
            if completion.finish_reason.as_deref() == Some("length") {
                debug!("Generation hit the token limit; output is likely truncated");
            }
            completion
                .content
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| "empty response from generator".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_prompt_and_json_mode() {
        let client = OpenRouterClient::new("test-key").unwrap();
        let generator = OpenRouterGenerator::new(
            client,
            GeneratorConfig::default().with_model("test/model"),
        );
        let prompt = AssembledPrompt {
            system: "sys".into(),
            user: "usr".into(),
        };
        let json = serde_json::to_value(generator.request(&prompt)).unwrap();
        assert_eq!(json["model"], "test/model");
        assert_eq!(json["messages"][0]["content"], "sys");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["max_tokens"], 2048);
    }
}
