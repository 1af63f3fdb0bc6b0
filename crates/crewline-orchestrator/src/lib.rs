//! Team orchestration for Crewline.
//!
//! Owns the workspace registry (one lock per workspace) and the task
//! execution pipeline that turns a claimed task into an LLM call and a
//! recorded result.
//!
//! # Main types
//!
//! - [`WorkspaceRegistry`] — Locked store of team workspaces.
//! - [`TaskRunner`] — Claim, prompt, execute, complete.

/// Workspace store and per-workspace locking.
pub mod registry;
/// Task execution pipeline.
pub mod runner;

pub use registry::WorkspaceRegistry;
pub use runner::TaskRunner;
