use crewline_core::LlmError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{error, warn};

/// Message substrings that mark a failure as provider exhaustion, matched
/// case-insensitively anywhere in the cause chain.
const EXHAUSTED_HINTS: [&str; 4] = [
    "http 429",
    "all accounts exhausted",
    "last error: http 403",
    "status=429",
];

/// Configures the bounded-retry wrapper around external model calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum total attempts before the last error is rethrown.
    pub max_attempts: u32,
    /// Backoff grows linearly with the attempt number, in milliseconds.
    pub backoff_base_ms: u64,
    /// Cap for the backoff delay, in milliseconds.
    pub backoff_max_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff_base_ms: 300,
            backoff_max_ms: 3000,
        }
    }
}

/// Computes the delay before the next attempt: `min(base * attempt, max)`.
fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> u64 {
    policy
        .backoff_base_ms
        .saturating_mul(u64::from(attempt))
        .min(policy.backoff_max_ms)
}

/// Determines whether a failure is transient and worth retrying.
///
/// Walks the full cause chain: a rate-limit status (429) anywhere in the
/// chain is retryable, a forbidden/quota status (403) is retryable only when
/// its message carries an exhaustion hint, and any link whose message carries
/// one of the hints is retryable regardless of status.
pub fn is_retryable(err: &LlmError) -> bool {
    err.chain().any(|e| match e.status {
        Some(429) => true,
        Some(403) => contains_exhausted_hint(&e.message),
        _ => contains_exhausted_hint(&e.message),
    })
}

fn contains_exhausted_hint(message: &str) -> bool {
    let lower = message.to_lowercase();
    EXHAUSTED_HINTS.iter().any(|hint| lower.contains(hint))
}

/// Executes `op` with bounded retry and linear-capped backoff.
///
/// Non-retryable failures are rethrown immediately; retryable ones are
/// retried up to `policy.max_attempts` total attempts, then the last observed
/// failure is rethrown. Cancelling the returned future drops the whole retry
/// loop, so an interrupted backoff never resumes.
pub async fn execute_with_retry<T, F, Fut>(policy: &RetryPolicy, op: F) -> Result<T, LlmError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut last: Option<LlmError> = None;
    for attempt in 1..=policy.max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retryable(&err) || attempt >= policy.max_attempts {
                    error!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        error = %err,
                        "model call failed, giving up"
                    );
                    return Err(err);
                }
                let delay = backoff_delay(policy, attempt);
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay,
                    error = %err,
                    "retryable model failure, backing off"
                );
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                last = Some(err);
            }
        }
    }
    Err(last.unwrap_or_else(|| LlmError::message("model call failed unexpectedly")))
}
