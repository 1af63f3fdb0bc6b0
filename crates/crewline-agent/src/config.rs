use serde::{Deserialize, Serialize};

/// Supported model providers. All speak the OpenAI chat completions API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI or any self-hosted OpenAI-compatible endpoint.
    OpenAi,
    /// OpenRouter aggregation service.
    OpenRouter,
    /// Groq cloud inference — OpenAI-compatible API, free tier with rate limits.
    Groq,
}

/// Configuration for the model every teammate invocation goes through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Which provider endpoint to talk to.
    pub provider: LlmProvider,
    /// Provider-side model identifier.
    pub model_id: String,
    /// Bearer token for the provider.
    pub api_key: String,
    /// Overrides the provider's default base URL when set.
    pub api_base_url: Option<String>,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum tokens to generate per call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

impl ModelConfig {
    /// The base URL to send requests to.
    pub fn base_url(&self) -> &str {
        if let Some(url) = &self.api_base_url {
            url
        } else {
            match self.provider {
                LlmProvider::OpenAi => "https://api.openai.com",
                LlmProvider::OpenRouter => "https://openrouter.ai/api",
                LlmProvider::Groq => "https://api.groq.com/openai",
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_override() {
        let config = ModelConfig {
            provider: LlmProvider::OpenAi,
            model_id: "gpt-test".into(),
            api_key: "k".into(),
            api_base_url: Some("http://localhost:8080".into()),
            temperature: 0.0,
            max_tokens: 256,
        };
        assert_eq!(config.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_serde_defaults() {
        let config: ModelConfig = serde_json::from_str(
            r#"{"provider":"groq","model_id":"m","api_key":"k","api_base_url":null}"#,
        )
        .unwrap();
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.max_tokens, 4096);
        assert_eq!(config.base_url(), "https://api.groq.com/openai");
    }
}
