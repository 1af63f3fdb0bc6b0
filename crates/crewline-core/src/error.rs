use thiserror::Error;

/// A convenience `Result` alias using [`CrewError`].
pub type CrewResult<T> = Result<T, CrewError>;

/// Top-level error type for Crewline.
///
/// The first three variants are detected synchronously under the workspace
/// lock and are never retried. [`CrewError::External`] wraps failures of the
/// language-model collaborator after the retry wrapper has given up.
#[derive(Debug, Error)]
pub enum CrewError {
    /// An unknown workspace or task id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed input: unknown teammate, unknown dependency, self-dependency,
    /// or a task with no resolvable executor.
    #[error("validation: {0}")]
    Validation(String),

    /// An illegal lifecycle transition or a guarded structural edit.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A language-model call that failed after exhausting retries, or failed
    /// with a non-retryable cause.
    #[error("external call failed: {0}")]
    External(#[from] LlmError),
}

/// A typed failure from the language-model collaborator.
///
/// Carries the HTTP-like status (when the provider reported one), a message,
/// and an optional wrapped cause. Retry classification walks the whole cause
/// chain rather than inspecting only the outermost failure.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct LlmError {
    /// Provider status code, e.g. `Some(429)` for a rate limit.
    pub status: Option<u16>,
    /// Human-readable failure description (may include the response body).
    pub message: String,
    /// The wrapped lower-level failure, if any.
    #[source]
    pub cause: Option<Box<LlmError>>,
}

impl LlmError {
    /// A failure with a message but no status code (e.g. a transport error).
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            cause: None,
        }
    }

    /// A failure carrying a provider status code.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
            cause: None,
        }
    }

    /// Wraps `cause` beneath this error.
    pub fn with_cause(mut self, cause: LlmError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Iterates over this error and every wrapped cause, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &LlmError> {
        std::iter::successors(Some(self), |err| err.cause.as_deref())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            CrewError::NotFound("workspace abc".into()).to_string(),
            "not found: workspace abc"
        );
        assert_eq!(
            CrewError::Conflict("task is not pending".into()).to_string(),
            "conflict: task is not pending"
        );
    }

    #[test]
    fn test_llm_error_chain() {
        let err = LlmError::message("request failed")
            .with_cause(LlmError::status(429, "too many requests"));

        let statuses: Vec<Option<u16>> = err.chain().map(|e| e.status).collect();
        assert_eq!(statuses, vec![None, Some(429)]);
    }

    #[test]
    fn test_llm_error_into_crew_error() {
        let err: CrewError = LlmError::status(500, "boom").into();
        assert!(matches!(err, CrewError::External(_)));
        assert_eq!(err.to_string(), "external call failed: boom");
    }
}
