use super::ChatBackend;
use crate::config::{LlmProvider, ModelConfig};
use async_trait::async_trait;
use crewline_core::LlmError;

/// OpenAI-compatible API backend.
///
/// Works with OpenAI, OpenRouter, Groq, and any other provider that
/// implements the OpenAI chat completions API.
pub struct OpenAiBackend {
    config: ModelConfig,
    http: reqwest::Client,
}

impl OpenAiBackend {
    /// Creates a backend for the given model configuration.
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn add_provider_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json");

        // OpenRouter requires extra headers
        if matches!(self.config.provider, LlmProvider::OpenRouter) {
            request
                .header("HTTP-Referer", "https://crewline.dev")
                .header("X-Title", "Crewline")
        } else {
            request
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn complete(&self, system_prompt: &str, user_content: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.config.base_url());

        let body = serde_json::json!({
            "model": self.config.model_id,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_content },
            ],
        });

        let resp = self
            .add_provider_headers(self.http.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::message(format!("request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| LlmError::message(format!("response read failed: {e}")))?;

        if !status.is_success() {
            return Err(LlmError::status(
                status.as_u16(),
                format!("chat completions error {status}: {text}"),
            ));
        }

        let json: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| LlmError::message(format!("malformed response body: {e}")))?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| LlmError::message("response is missing message content"))
    }
}
