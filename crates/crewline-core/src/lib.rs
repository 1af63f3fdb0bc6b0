//! Core types and error definitions for Crewline.
//!
//! This crate provides the domain entities shared across all Crewline crates:
//! the workspace aggregate, the dependency-gated task lifecycle, the mailbox
//! protocol, and the unified error taxonomy.
//!
//! # Main types
//!
//! - [`CrewError`] — Unified error enum (NotFound / Validation / Conflict / External).
//! - [`CrewResult`] — Convenience alias for `Result<T, CrewError>`.
//! - [`LlmError`] — Typed failure from the language-model collaborator.
//! - [`Workspace`] — One team's teammates, task graph, mailbox, and plan version.
//! - [`Task`] / [`TaskStatus`] — A unit of work and its three-state lifecycle.
//! - [`Teammate`] — A role-labeled participant with private history and a mail cursor.
//! - [`MailMessage`] — An addressed entry in the workspace mailbox.
//! - [`WorkspaceState`] — Serializable snapshot for external observers.

/// Error taxonomy and result alias.
pub mod error;
/// Mailbox message type.
pub mod mail;
/// Task entity and lifecycle states.
pub mod task;
/// Workspace aggregate, teammates, and snapshot views.
pub mod workspace;

pub use error::{CrewError, CrewResult, LlmError};
pub use mail::MailMessage;
pub use task::{Task, TaskStatus};
pub use workspace::{
    is_leader_role, Teammate, TeammateSpec, TeammateView, TaskView, Workspace, WorkspaceState,
};
