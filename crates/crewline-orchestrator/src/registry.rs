use crewline_core::{
    CrewError, CrewResult, MailMessage, Task, TeammateSpec, Workspace, WorkspaceState,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

/// Process-wide store of workspaces.
///
/// Each workspace is one unit of mutual exclusion: every read or write of its
/// teammates, tasks, or mailbox happens while holding that workspace's lock,
/// acquired through [`WorkspaceRegistry::lock_workspace`]. Different
/// workspaces are fully independent and can be mutated concurrently.
///
/// The registry is an injected store with explicit lifecycle — construct one
/// per process (or per test) rather than reaching for a global.
pub struct WorkspaceRegistry {
    /// The model identifier every teammate is materialized with.
    model_id: String,
    workspaces: RwLock<HashMap<Uuid, Arc<Mutex<Workspace>>>>,
}

impl WorkspaceRegistry {
    /// Creates an empty registry whose teammates will use the given model.
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            workspaces: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a workspace, materializes the requested teammates, and
    /// guarantees a leader-role teammate exists (synthesizing one if none of
    /// the requested teammates qualify).
    pub async fn create_workspace(
        &self,
        name: &str,
        objective: &str,
        teammate_specs: &[TeammateSpec],
    ) -> WorkspaceState {
        let mut workspace = Workspace::new(name, objective);
        for spec in teammate_specs {
            workspace.add_teammate(spec, &self.model_id);
        }
        if workspace.ensure_leader(&self.model_id) {
            info!(workspace_id = %workspace.id, "no leader requested, injected a coordinator");
        }

        let state = workspace.snapshot();
        let id = workspace.id;
        self.workspaces
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(workspace)));

        info!(
            workspace_id = %id,
            teammates = state.teammates.len(),
            "workspace created"
        );
        state
    }

    /// Acquires the exclusive lock on a workspace, failing with NotFound for
    /// unknown ids.
    ///
    /// The leader invariant is re-checked (and repaired) on every
    /// acquisition. Callers must not hold the guard across slow external
    /// calls — validate, mutate, release.
    pub async fn lock_workspace(&self, workspace_id: Uuid) -> CrewResult<OwnedMutexGuard<Workspace>> {
        let arc = self
            .workspaces
            .read()
            .await
            .get(&workspace_id)
            .cloned()
            .ok_or_else(|| CrewError::NotFound(format!("workspace {workspace_id} not found")))?;

        let mut workspace = arc.lock_owned().await;
        if workspace.ensure_leader(&self.model_id) {
            warn!(workspace_id = %workspace_id, "leader missing, injected a coordinator");
        }
        Ok(workspace)
    }

    /// Returns a snapshot of the workspace.
    pub async fn get_state(&self, workspace_id: Uuid) -> CrewResult<WorkspaceState> {
        let workspace = self.lock_workspace(workspace_id).await?;
        Ok(workspace.snapshot())
    }

    /// Creates a task. Validates the assignee and every dependency id, and
    /// bumps the plan version.
    pub async fn create_task(
        &self,
        workspace_id: Uuid,
        title: &str,
        description: &str,
        dependencies: &[Uuid],
        assignee_id: Option<Uuid>,
    ) -> CrewResult<Task> {
        let mut workspace = self.lock_workspace(workspace_id).await?;
        let task = workspace.create_task(title, description, dependencies, assignee_id)?;
        info!(
            workspace_id = %workspace_id,
            task_id = %task.id,
            plan_version = workspace.plan_version,
            "task created"
        );
        Ok(task)
    }

    /// Edits a Pending task; `None` fields are left unchanged. Bumps the plan
    /// version.
    pub async fn update_task(
        &self,
        workspace_id: Uuid,
        task_id: Uuid,
        title: Option<&str>,
        description: Option<&str>,
        dependencies: Option<&[Uuid]>,
        assignee_id: Option<Uuid>,
    ) -> CrewResult<Task> {
        let mut workspace = self.lock_workspace(workspace_id).await?;
        let task = workspace.update_task(task_id, title, description, dependencies, assignee_id)?;
        info!(
            workspace_id = %workspace_id,
            task_id = %task_id,
            plan_version = workspace.plan_version,
            "task updated"
        );
        Ok(task)
    }

    /// Deletes a Pending task that no active task depends on. Bumps the plan
    /// version.
    pub async fn delete_task(&self, workspace_id: Uuid, task_id: Uuid) -> CrewResult<()> {
        let mut workspace = self.lock_workspace(workspace_id).await?;
        workspace.delete_task(task_id)?;
        info!(
            workspace_id = %workspace_id,
            task_id = %task_id,
            plan_version = workspace.plan_version,
            "task deleted"
        );
        Ok(())
    }

    /// Claims a ready Pending task for a teammate.
    pub async fn claim_task(
        &self,
        workspace_id: Uuid,
        task_id: Uuid,
        teammate_id: Uuid,
    ) -> CrewResult<Task> {
        let mut workspace = self.lock_workspace(workspace_id).await?;
        let task = workspace.claim_task(task_id, teammate_id)?;
        info!(
            workspace_id = %workspace_id,
            task_id = %task_id,
            teammate_id = %teammate_id,
            "task claimed"
        );
        Ok(task)
    }

    /// Completes an InProgress task with an externally produced result. Only
    /// the current assignee may complete.
    pub async fn complete_task(
        &self,
        workspace_id: Uuid,
        task_id: Uuid,
        teammate_id: Uuid,
        result: &str,
    ) -> CrewResult<Task> {
        let mut workspace = self.lock_workspace(workspace_id).await?;
        let task = workspace.complete_task(task_id, teammate_id, result)?;
        info!(
            workspace_id = %workspace_id,
            task_id = %task_id,
            teammate_id = %teammate_id,
            "task completed"
        );
        Ok(task)
    }

    /// Appends an addressed message to the workspace mailbox.
    pub async fn send_message(
        &self,
        workspace_id: Uuid,
        from_id: Uuid,
        to_id: Uuid,
        content: &str,
    ) -> CrewResult<MailMessage> {
        let mut workspace = self.lock_workspace(workspace_id).await?;
        let message = workspace.send_message(from_id, to_id, content)?;
        info!(
            workspace_id = %workspace_id,
            from_id = %from_id,
            to_id = %to_id,
            "message sent"
        );
        Ok(message)
    }
}
