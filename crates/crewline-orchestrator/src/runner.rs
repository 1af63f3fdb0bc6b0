use crate::registry::WorkspaceRegistry;
use crewline_agent::LlmClient;
use crewline_core::{CrewError, CrewResult, MailMessage, Task, TaskStatus, Teammate, Workspace};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// How many recent history entries a teammate carries into its prompt.
const HISTORY_WINDOW: usize = 6;

/// Executes tasks through the configured LLM.
///
/// `run_task` runs in three phases. Phase one holds the workspace lock just
/// long enough to resolve the executor, claim the task if needed, drain the
/// executor's mailbox, and assemble the prompt. Phase two calls the model
/// with no lock held. Phase three re-acquires the lock to record history and
/// complete the task.
///
/// If the model call fails, phase three never runs: the task stays
/// InProgress with its assignee intact, so a later run resumes the claim
/// instead of starting over.
pub struct TaskRunner {
    registry: Arc<WorkspaceRegistry>,
    llm: LlmClient,
}

impl TaskRunner {
    /// Creates a runner over the given registry and client.
    pub fn new(registry: Arc<WorkspaceRegistry>, llm: LlmClient) -> Self {
        Self { registry, llm }
    }

    /// Executes one task end to end and returns the model's deliverable.
    ///
    /// The executor is the explicit override if given, otherwise the task's
    /// current assignee. A task with neither fails with a Validation error;
    /// executor selection is the caller's decision, never the engine's.
    pub async fn run_task(
        &self,
        workspace_id: Uuid,
        task_id: Uuid,
        executor_override: Option<Uuid>,
    ) -> CrewResult<String> {
        let (system, prompt, task, executor_id) = {
            let mut workspace = self.registry.lock_workspace(workspace_id).await?;
            let task = workspace.task(task_id)?.clone();

            let executor_id = executor_override.or(task.assignee_id).ok_or_else(|| {
                CrewError::Validation(format!(
                    "task {task_id} has no assignee and no executor was given"
                ))
            })?;

            if task.status == TaskStatus::Pending {
                workspace.claim_task(task_id, executor_id)?;
            } else if task.status != TaskStatus::InProgress {
                return Err(CrewError::Conflict(format!(
                    "task {task_id} is already completed"
                )));
            } else {
                // resuming an existing claim; make sure the executor exists
                workspace.teammate(executor_id)?;
            }

            let task = workspace.task(task_id)?.clone();
            let unread = workspace.drain_unread(executor_id)?;
            let executor = workspace.teammate(executor_id)?;
            let system = system_prompt(executor);
            let prompt = build_prompt(&workspace, &task, executor, &unread);
            (system, prompt, task, executor_id)
        };
        // lock released: the model call must never block the workspace

        info!(
            workspace_id = %workspace_id,
            task_id = %task_id,
            executor_id = %executor_id,
            "executing task"
        );
        let output = self.llm.complete(&system, &prompt).await?;

        let mut workspace = self.registry.lock_workspace(workspace_id).await?;
        workspace.append_history(
            executor_id,
            format!("TASK: {}\n{}", task.title, task.description),
        )?;
        workspace.append_history(executor_id, format!("OUTPUT: {output}"))?;
        workspace.complete_task(task_id, executor_id, &output)?;
        drop(workspace);

        info!(
            workspace_id = %workspace_id,
            task_id = %task_id,
            executor_id = %executor_id,
            "task completed"
        );
        Ok(output)
    }
}

/// Role-scoped system instruction for an executor.
fn system_prompt(executor: &Teammate) -> String {
    format!(
        "You are a specialized teammate in an AI agent team. Role: {}. \
         Work in small, concrete steps and output actionable results. \
         If context is missing, state assumptions explicitly.",
        executor.role
    )
}

/// Assembles the user prompt from the objective, the task, dependency
/// outputs, freshly drained mail, and the executor's recent history.
fn build_prompt(
    workspace: &Workspace,
    task: &Task,
    executor: &Teammate,
    unread: &[MailMessage],
) -> String {
    let dependency_context = task
        .dependencies
        .iter()
        .map(|dep_id| {
            let result = workspace
                .tasks
                .get(dep_id)
                .and_then(|dep| dep.result.as_deref())
                .unwrap_or("");
            format!("Dependency {dep_id}: {result}")
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mailbox_context = if unread.is_empty() {
        "No unread teammate messages.".to_string()
    } else {
        unread
            .iter()
            .map(|m| format!("From {}: {}", m.from_id, m.content))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let history_context = executor.recent_history(HISTORY_WINDOW).join("\n");

    format!(
        "Team objective:\n{}\n\n\
         Task title: {}\n\
         Task details:\n{}\n\n\
         Dependency outputs:\n{}\n\n\
         Unread mailbox:\n{}\n\n\
         Recent personal context:\n{}\n\n\
         Return a concise deliverable for this task.",
        workspace.objective,
        task.title,
        task.description,
        dependency_context,
        mailbox_context,
        history_context
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crewline_core::TeammateSpec;

    fn seeded_workspace() -> (Workspace, Uuid) {
        let mut ws = Workspace::new("launch", "ship the beta");
        let alice = ws.add_teammate(&TeammateSpec::new("Alice", "Researcher"), "gpt-test");
        (ws, alice)
    }

    #[test]
    fn test_system_prompt_carries_role() {
        let (ws, alice) = seeded_workspace();
        let prompt = system_prompt(ws.teammate(alice).unwrap());
        assert!(prompt.contains("Role: Researcher"));
    }

    #[test]
    fn test_prompt_includes_objective_and_dependency_outputs() {
        let (mut ws, alice) = seeded_workspace();
        let a = ws.create_task("gather", "collect sources", &[], Some(alice)).unwrap();
        ws.claim_task(a.id, alice).unwrap();
        ws.complete_task(a.id, alice, "three sources found").unwrap();
        let b = ws
            .create_task("summarize", "write a summary", &[a.id], Some(alice))
            .unwrap();

        let task = ws.task(b.id).unwrap().clone();
        let executor = ws.teammate(alice).unwrap();
        let prompt = build_prompt(&ws, &task, executor, &[]);

        assert!(prompt.contains("Team objective:\nship the beta"));
        assert!(prompt.contains("Task title: summarize"));
        assert!(prompt.contains("three sources found"));
        assert!(prompt.contains("No unread teammate messages."));
    }

    #[test]
    fn test_prompt_lists_unread_mail() {
        let (mut ws, alice) = seeded_workspace();
        let bob = ws.add_teammate(&TeammateSpec::new("Bob", "Team Lead"), "gpt-test");
        let task = ws.create_task("t", "d", &[], Some(alice)).unwrap();
        ws.send_message(bob, alice, "focus on pricing").unwrap();

        let unread = ws.drain_unread(alice).unwrap();
        let task = ws.task(task.id).unwrap().clone();
        let executor = ws.teammate(alice).unwrap();
        let prompt = build_prompt(&ws, &task, executor, &unread);

        assert!(prompt.contains("focus on pricing"));
        assert!(!prompt.contains("No unread teammate messages."));
    }

    #[test]
    fn test_prompt_history_is_windowed() {
        let (mut ws, alice) = seeded_workspace();
        let task = ws.create_task("t", "d", &[], Some(alice)).unwrap();
        for i in 0..10 {
            ws.append_history(alice, format!("entry {i}")).unwrap();
        }

        let task = ws.task(task.id).unwrap().clone();
        let executor = ws.teammate(alice).unwrap();
        let prompt = build_prompt(&ws, &task, executor, &[]);

        assert!(!prompt.contains("entry 3"));
        assert!(prompt.contains("entry 4"));
        assert!(prompt.contains("entry 9"));
    }

    #[test]
    fn test_prompt_tolerates_dangling_dependency() {
        let (mut ws, alice) = seeded_workspace();
        let task = ws.create_task("t", "d", &[], Some(alice)).unwrap();
        let mut task = ws.task(task.id).unwrap().clone();
        task.dependencies = vec![Uuid::new_v4()];

        let executor = ws.teammate(alice).unwrap();
        let prompt = build_prompt(&ws, &task, executor, &[]);
        assert!(prompt.contains("Dependency "));
    }
}
