/// OpenAI-compatible chat completions backend.
pub mod openai;

use async_trait::async_trait;
use crewline_core::LlmError;

/// Trait for language-model provider backends.
///
/// The engine only needs single-shot completions: a role-scoped system
/// instruction plus assembled user content in, generated text out. Failures
/// surface as [`LlmError`] so the retry wrapper can classify them.
///
/// To add a new provider:
/// 1. Create a new module in `backends/`
/// 2. Implement `ChatBackend` for your struct
/// 3. Add the variant to `LlmProvider` in `config.rs`
/// 4. Wire it up in `LlmClient::new()` in `client.rs`
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Single-shot chat completion.
    async fn complete(&self, system_prompt: &str, user_content: &str) -> Result<String, LlmError>;
}
