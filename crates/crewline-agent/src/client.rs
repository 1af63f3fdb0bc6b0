use crate::backends::openai::OpenAiBackend;
use crate::backends::ChatBackend;
use crate::config::ModelConfig;
use crate::retry::{execute_with_retry, RetryPolicy};
use crewline_core::LlmError;

/// LLM client pairing a provider backend with the bounded-retry wrapper.
///
/// Every completion goes through [`execute_with_retry`]: transient failures
/// (rate limits, provider exhaustion) are retried with capped backoff,
/// anything else propagates to the caller untouched.
pub struct LlmClient {
    backend: Box<dyn ChatBackend>,
    retry: RetryPolicy,
}

impl LlmClient {
    /// Creates a client for the configured provider with the default policy.
    pub fn new(config: ModelConfig) -> Self {
        Self {
            backend: Box::new(OpenAiBackend::new(config)),
            retry: RetryPolicy::default(),
        }
    }

    /// Creates a client from a pre-built backend (for custom providers and
    /// tests).
    pub fn from_backend(backend: Box<dyn ChatBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    /// Single-shot completion with retry.
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_content: &str,
    ) -> Result<String, LlmError> {
        execute_with_retry(&self.retry, || {
            self.backend.complete(system_prompt, user_content)
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// A backend that fails with a rate limit a fixed number of times, then
    /// succeeds.
    struct FlakyBackend {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl ChatBackend for FlakyBackend {
        async fn complete(
            &self,
            _system_prompt: &str,
            user_content: &str,
        ) -> Result<String, LlmError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(LlmError::status(429, "too many requests"))
            } else {
                Ok(format!("echo: {user_content}"))
            }
        }
    }

    fn instant_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 10,
            backoff_base_ms: 0,
            backoff_max_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_client_retries_through_rate_limits() {
        let client = LlmClient::from_backend(
            Box::new(FlakyBackend {
                failures: 2,
                calls: AtomicU32::new(0),
            }),
            instant_policy(),
        );
        let out = client.complete("sys", "hello").await.unwrap();
        assert_eq!(out, "echo: hello");
    }
}
