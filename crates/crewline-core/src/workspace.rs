use crate::error::{CrewError, CrewResult};
use crate::mail::MailMessage;
use crate::task::{Task, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Role labels that mark a teammate as the workspace leader, matched
/// case-insensitively as substrings.
const LEADER_ROLE_HINTS: [&str; 5] = ["leader", "lead", "manager", "planner", "orchestrator"];

/// Returns true if the given role label qualifies as a leadership role.
pub fn is_leader_role(role: &str) -> bool {
    let lower = role.to_lowercase();
    LEADER_ROLE_HINTS.iter().any(|hint| lower.contains(hint))
}

/// Caller-supplied description of a teammate to materialize at workspace
/// creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeammateSpec {
    /// Display name, e.g. "Alice".
    pub name: String,
    /// Role label, e.g. "Researcher" or "Team Lead".
    pub role: String,
}

impl TeammateSpec {
    /// Creates a spec from name and role.
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
        }
    }
}

/// A named, role-labeled participant bound to a model identifier.
///
/// Teammates are created with the workspace and never deleted. They are
/// mutated only by appending history entries and advancing the mailbox
/// cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teammate {
    /// Unique identifier for this teammate.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Role label; leadership roles are matched by [`is_leader_role`].
    pub role: String,
    /// The model identifier used for this teammate's executions.
    pub model: String,
    /// Append-only private history of task/result pairs.
    pub history: Vec<String>,
    /// Offset into the workspace mailbox up to which messages have been
    /// scanned on this teammate's behalf.
    pub mailbox_cursor: usize,
}

impl Teammate {
    /// Materializes a teammate from a spec and the configured model id.
    pub fn new(spec: &TeammateSpec, model: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: spec.name.clone(),
            role: spec.role.clone(),
            model: model.into(),
            history: Vec::new(),
            mailbox_cursor: 0,
        }
    }

    /// The most recent `window` history entries, oldest first.
    pub fn recent_history(&self, window: usize) -> &[String] {
        let start = self.history.len().saturating_sub(window);
        &self.history[start..]
    }
}

/// The top-level aggregate: one team's teammates, task graph, mailbox, and
/// plan version.
///
/// A `Workspace` owns its own consistency rules but not its locking — the
/// registry serializes all access through one mutex per workspace, so every
/// method here assumes it runs under that exclusion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    /// Unique identifier for this workspace.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// The shared objective all teammates work toward.
    pub objective: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Monotonic counter bumped on every structural change to the task graph
    /// (create/update/delete), never on status transitions or mail.
    pub plan_version: u64,
    /// Teammates keyed by id.
    pub teammates: HashMap<Uuid, Teammate>,
    /// Tasks keyed by id.
    pub tasks: HashMap<Uuid, Task>,
    /// The ordered, append-only message log.
    pub mailbox: Vec<MailMessage>,
}

impl Workspace {
    /// Creates an empty workspace.
    pub fn new(name: impl Into<String>, objective: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            objective: objective.into(),
            created_at: Utc::now(),
            plan_version: 0,
            teammates: HashMap::new(),
            tasks: HashMap::new(),
            mailbox: Vec::new(),
        }
    }

    /// Adds a teammate and returns its id.
    pub fn add_teammate(&mut self, spec: &TeammateSpec, model: &str) -> Uuid {
        let teammate = Teammate::new(spec, model);
        let id = teammate.id;
        self.teammates.insert(id, teammate);
        id
    }

    /// Looks up a teammate, failing with a Validation error if absent.
    pub fn teammate(&self, teammate_id: Uuid) -> CrewResult<&Teammate> {
        self.teammates
            .get(&teammate_id)
            .ok_or_else(|| CrewError::Validation(format!("unknown teammate {teammate_id}")))
    }

    fn teammate_mut(&mut self, teammate_id: Uuid) -> CrewResult<&mut Teammate> {
        self.teammates
            .get_mut(&teammate_id)
            .ok_or_else(|| CrewError::Validation(format!("unknown teammate {teammate_id}")))
    }

    /// Looks up a task, failing with a NotFound error if absent.
    pub fn task(&self, task_id: Uuid) -> CrewResult<&Task> {
        self.tasks
            .get(&task_id)
            .ok_or_else(|| CrewError::NotFound(format!("task {task_id} not found")))
    }

    fn task_mut(&mut self, task_id: Uuid) -> CrewResult<&mut Task> {
        self.tasks
            .get_mut(&task_id)
            .ok_or_else(|| CrewError::NotFound(format!("task {task_id} not found")))
    }

    /// A task is ready iff every dependency resolves to a Completed task.
    /// A missing dependency counts as not ready, never as satisfied.
    pub fn is_ready(&self, task: &Task) -> bool {
        task.dependencies.iter().all(|dep_id| {
            self.tasks
                .get(dep_id)
                .is_some_and(|dep| dep.status == TaskStatus::Completed)
        })
    }

    fn validate_assignee(&self, assignee_id: Option<Uuid>) -> CrewResult<()> {
        if let Some(id) = assignee_id {
            if !self.teammates.contains_key(&id) {
                return Err(CrewError::Validation(format!("unknown assignee {id}")));
            }
        }
        Ok(())
    }

    fn validate_dependencies(&self, dependencies: &[Uuid], task_id: Option<Uuid>) -> CrewResult<()> {
        for dep_id in dependencies {
            if Some(*dep_id) == task_id {
                return Err(CrewError::Validation(format!(
                    "task {dep_id} cannot depend on itself"
                )));
            }
            if !self.tasks.contains_key(dep_id) {
                return Err(CrewError::Validation(format!(
                    "dependency task {dep_id} not found"
                )));
            }
        }
        Ok(())
    }

    /// Inserts a new Pending task and bumps the plan version.
    pub fn create_task(
        &mut self,
        title: &str,
        description: &str,
        dependencies: &[Uuid],
        assignee_id: Option<Uuid>,
    ) -> CrewResult<Task> {
        self.validate_assignee(assignee_id)?;
        self.validate_dependencies(dependencies, None)?;

        let task = Task::new(title, description, dependencies.to_vec(), assignee_id);
        let snapshot = task.clone();
        self.tasks.insert(task.id, task);
        self.plan_version += 1;
        Ok(snapshot)
    }

    /// Edits a Pending task's title, description, dependencies, or assignee.
    ///
    /// `None` fields are left unchanged. Bumps the plan version.
    pub fn update_task(
        &mut self,
        task_id: Uuid,
        title: Option<&str>,
        description: Option<&str>,
        dependencies: Option<&[Uuid]>,
        assignee_id: Option<Uuid>,
    ) -> CrewResult<Task> {
        let status = self.task(task_id)?.status;
        if status != TaskStatus::Pending {
            return Err(CrewError::Conflict(
                "only pending tasks can be edited".into(),
            ));
        }
        self.validate_assignee(assignee_id)?;
        if let Some(deps) = dependencies {
            self.validate_dependencies(deps, Some(task_id))?;
        }

        let task = self.task_mut(task_id)?;
        if let Some(title) = title {
            task.title = title.to_string();
        }
        if let Some(description) = description {
            task.description = description.to_string();
        }
        if let Some(deps) = dependencies {
            task.dependencies = deps.to_vec();
        }
        if let Some(assignee) = assignee_id {
            task.assignee_id = Some(assignee);
        }
        task.touch();
        let snapshot = task.clone();
        self.plan_version += 1;
        Ok(snapshot)
    }

    /// Removes a Pending task that no other non-Completed task depends on.
    /// Bumps the plan version.
    pub fn delete_task(&mut self, task_id: Uuid) -> CrewResult<()> {
        let status = self.task(task_id)?.status;
        if status != TaskStatus::Pending {
            return Err(CrewError::Conflict(
                "only pending tasks can be deleted".into(),
            ));
        }
        let blocked = self.tasks.values().any(|t| {
            t.id != task_id
                && t.status != TaskStatus::Completed
                && t.dependencies.contains(&task_id)
        });
        if blocked {
            return Err(CrewError::Conflict(format!(
                "task {task_id} is still a dependency of an active task"
            )));
        }
        self.tasks.remove(&task_id);
        self.plan_version += 1;
        Ok(())
    }

    /// Claims a ready Pending task for a teammate: sets the assignee and
    /// transitions to InProgress. Does not touch the plan version.
    pub fn claim_task(&mut self, task_id: Uuid, teammate_id: Uuid) -> CrewResult<Task> {
        let teammate_id = self.teammate(teammate_id)?.id;
        let task = self.task(task_id)?;
        if task.status != TaskStatus::Pending {
            return Err(CrewError::Conflict("task is not pending".into()));
        }
        if !self.is_ready(task) {
            return Err(CrewError::Conflict(
                "task dependencies are not completed".into(),
            ));
        }
        let task = self.task_mut(task_id)?;
        task.set_assignee(teammate_id);
        task.set_status(TaskStatus::InProgress);
        Ok(task.clone())
    }

    /// Completes an InProgress task: records the result and transitions to
    /// Completed. Only the current assignee may complete. Does not touch the
    /// plan version.
    pub fn complete_task(
        &mut self,
        task_id: Uuid,
        teammate_id: Uuid,
        result: &str,
    ) -> CrewResult<Task> {
        self.teammate(teammate_id)?;
        let task = self.task(task_id)?;
        if task.status != TaskStatus::InProgress {
            return Err(CrewError::Conflict("task is not in progress".into()));
        }
        if task.assignee_id != Some(teammate_id) {
            return Err(CrewError::Conflict(
                "only the assignee can complete this task".into(),
            ));
        }
        let task = self.task_mut(task_id)?;
        task.set_result(result);
        task.set_status(TaskStatus::Completed);
        Ok(task.clone())
    }

    /// Appends an addressed message to the mailbox. Both teammate ids must
    /// resolve. Does not touch the plan version.
    pub fn send_message(
        &mut self,
        from_id: Uuid,
        to_id: Uuid,
        content: &str,
    ) -> CrewResult<MailMessage> {
        self.teammate(from_id)?;
        self.teammate(to_id)?;
        let message = MailMessage::new(from_id, to_id, content);
        self.mailbox.push(message.clone());
        Ok(message)
    }

    /// Returns the messages addressed to a teammate since its cursor, in
    /// append order, and advances the cursor to the end of the mailbox.
    ///
    /// The cursor moves past non-matching entries too — those were addressed
    /// to someone else and are not "missed". Each message is therefore
    /// returned to its recipient exactly once.
    pub fn drain_unread(&mut self, teammate_id: Uuid) -> CrewResult<Vec<MailMessage>> {
        let cursor = self.teammate(teammate_id)?.mailbox_cursor;
        let unread: Vec<MailMessage> = self.mailbox[cursor..]
            .iter()
            .filter(|m| m.to_id == teammate_id)
            .cloned()
            .collect();
        let end = self.mailbox.len();
        self.teammate_mut(teammate_id)?.mailbox_cursor = end;
        Ok(unread)
    }

    /// Appends an entry to a teammate's private history.
    pub fn append_history(&mut self, teammate_id: Uuid, entry: impl Into<String>) -> CrewResult<()> {
        self.teammate_mut(teammate_id)?.history.push(entry.into());
        Ok(())
    }

    /// True if any teammate carries a leadership role.
    pub fn has_leader(&self) -> bool {
        self.teammates.values().any(|t| is_leader_role(&t.role))
    }

    /// Injects a synthesized leader teammate if none exists. Returns true if
    /// one was injected. Leader repair is roster maintenance, not a task-graph
    /// change, so the plan version is untouched.
    pub fn ensure_leader(&mut self, model: &str) -> bool {
        if self.has_leader() {
            return false;
        }
        self.add_teammate(&TeammateSpec::new("Coordinator", "Team Lead"), model);
        true
    }

    /// An immutable snapshot of the whole workspace for external observers.
    pub fn snapshot(&self) -> WorkspaceState {
        let mut teammates: Vec<TeammateView> = self
            .teammates
            .values()
            .map(|t| TeammateView {
                id: t.id,
                name: t.name.clone(),
                role: t.role.clone(),
                model: t.model.clone(),
            })
            .collect();
        teammates.sort_by(|a, b| a.name.cmp(&b.name));

        let mut tasks: Vec<&Task> = self.tasks.values().collect();
        tasks.sort_by_key(|t| t.created_at);
        let tasks = tasks
            .into_iter()
            .map(|t| TaskView {
                id: t.id,
                title: t.title.clone(),
                description: t.description.clone(),
                dependencies: t.dependencies.clone(),
                status: t.status,
                assignee_id: t.assignee_id,
                result: t.result.clone(),
                created_at: t.created_at,
                updated_at: t.updated_at,
            })
            .collect();

        WorkspaceState {
            id: self.id,
            name: self.name.clone(),
            objective: self.objective.clone(),
            created_at: self.created_at,
            plan_version: self.plan_version,
            teammates,
            tasks,
        }
    }
}

/// Teammate fields exposed in a [`WorkspaceState`] snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeammateView {
    /// Teammate id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Role label.
    pub role: String,
    /// Bound model identifier.
    pub model: String,
}

/// Task fields exposed in a [`WorkspaceState`] snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskView {
    /// Task id.
    pub id: Uuid,
    /// Short title.
    pub title: String,
    /// Detailed description.
    pub description: String,
    /// Dependency task ids.
    pub dependencies: Vec<Uuid>,
    /// Current lifecycle state.
    pub status: TaskStatus,
    /// Current assignee, if any.
    pub assignee_id: Option<Uuid>,
    /// Recorded result, if completed.
    pub result: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A serializable snapshot of a workspace, with tasks in creation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceState {
    /// Workspace id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Team objective.
    pub objective: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Structural-change counter; stale cached plans can be detected by
    /// comparing against it.
    pub plan_version: u64,
    /// Teammates, sorted by name.
    pub teammates: Vec<TeammateView>,
    /// Tasks, sorted by creation time.
    pub tasks: Vec<TaskView>,
}
