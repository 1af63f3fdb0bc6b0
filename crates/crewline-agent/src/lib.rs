//! LLM invocation for Crewline.
//!
//! Provides the provider-agnostic [`ChatBackend`] seam, an OpenAI-compatible
//! HTTP backend, and the resilient bounded-retry wrapper that shields task
//! execution from transient provider failures.
//!
//! # Main types
//!
//! - [`ChatBackend`] — Trait every provider backend implements.
//! - [`OpenAiBackend`] — reqwest-based OpenAI-compatible backend.
//! - [`LlmClient`] — Backend plus retry policy, the engine's entry point.
//! - [`RetryPolicy`] / [`execute_with_retry`] — Bounded retry with capped backoff.
//! - [`ModelConfig`] / [`LlmProvider`] — Provider configuration.

/// Provider backends.
pub mod backends;
/// LLM client with retry.
pub mod client;
/// Provider and model configuration.
pub mod config;
/// Bounded-retry execution and failure classification.
pub mod retry;

pub use backends::openai::OpenAiBackend;
pub use backends::ChatBackend;
pub use client::LlmClient;
pub use config::{LlmProvider, ModelConfig};
pub use retry::{execute_with_retry, is_retryable, RetryPolicy};
