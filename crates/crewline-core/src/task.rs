use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a task.
///
/// Transitions only move forward: Pending → InProgress → Completed. There is
/// no cancellation path and no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, waiting for its dependencies and a claim.
    Pending,
    /// Claimed by a teammate and executing.
    InProgress,
    /// Finished with a recorded result. Terminal.
    Completed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A unit of work in a workspace's task graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier for this task.
    pub id: Uuid,
    /// Short title.
    pub title: String,
    /// Detailed description of what to do.
    pub description: String,
    /// Ids of tasks that must be Completed before this one may be claimed.
    pub dependencies: Vec<Uuid>,
    /// Current lifecycle state.
    pub status: TaskStatus,
    /// The teammate currently responsible, once claimed or pre-assigned.
    pub assignee_id: Option<Uuid>,
    /// The recorded output, set when the task completes.
    pub result: Option<String>,
    /// Creation timestamp; also the stable ordering key for listings.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every mutation, for tracking task flow.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new Pending task.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        dependencies: Vec<Uuid>,
        assignee_id: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            dependencies,
            status: TaskStatus::Pending,
            assignee_id,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub(crate) fn set_assignee(&mut self, assignee_id: Uuid) {
        self.assignee_id = Some(assignee_id);
        self.updated_at = Utc::now();
    }

    pub(crate) fn set_result(&mut self, result: impl Into<String>) {
        self.result = Some(result.into());
        self.updated_at = Utc::now();
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
