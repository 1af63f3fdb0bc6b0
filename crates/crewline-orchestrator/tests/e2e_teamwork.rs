//! End-to-end orchestration tests over a scripted in-process backend.

use async_trait::async_trait;
use crewline_agent::{ChatBackend, LlmClient, RetryPolicy};
use crewline_core::{CrewError, LlmError, TaskStatus, TeammateSpec};
use crewline_orchestrator::{TaskRunner, WorkspaceRegistry};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Backend that replays a script of replies and records every prompt it
/// receives. An exhausted script keeps answering with a stock deliverable.
struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn complete(&self, _system_prompt: &str, user_content: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(user_content.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("stock deliverable".to_string()))
    }
}

fn instant_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 10,
        backoff_base_ms: 0,
        backoff_max_ms: 0,
    }
}

fn harness(replies: Vec<Result<String, LlmError>>) -> (Arc<WorkspaceRegistry>, TaskRunner, Arc<ScriptedBackend>) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let registry = Arc::new(WorkspaceRegistry::new("gpt-test"));
    let backend = Arc::new(ScriptedBackend::new(replies));
    let client = LlmClient::from_backend(Box::new(SharedBackend(backend.clone())), instant_policy());
    let runner = TaskRunner::new(registry.clone(), client);
    (registry, runner, backend)
}

/// Adapter so the test can keep a handle on the backend the client owns.
struct SharedBackend(Arc<ScriptedBackend>);

#[async_trait]
impl ChatBackend for SharedBackend {
    async fn complete(&self, system_prompt: &str, user_content: &str) -> Result<String, LlmError> {
        self.0.complete(system_prompt, user_content).await
    }
}

#[tokio::test]
async fn test_full_task_lifecycle() {
    let (registry, runner, _) = harness(vec![Ok("market research summary".into())]);

    let state = registry
        .create_workspace(
            "beta launch",
            "ship the beta to early users",
            &[TeammateSpec::new("Alice", "Researcher")],
        )
        .await;
    assert_eq!(state.teammates.len(), 2); // Alice plus the injected leader
    let alice = state
        .teammates
        .iter()
        .find(|t| t.name == "Alice")
        .unwrap()
        .id;

    let task = registry
        .create_task(state.id, "research", "survey the market", &[], Some(alice))
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    let plan_before = registry.get_state(state.id).await.unwrap().plan_version;

    let output = runner.run_task(state.id, task.id, None).await.unwrap();
    assert_eq!(output, "market research summary");

    let state = registry.get_state(state.id).await.unwrap();
    let done = &state.tasks[0];
    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.assignee_id, Some(alice));
    assert_eq!(done.result.as_deref(), Some("market research summary"));
    // execution is not a plan change
    assert_eq!(state.plan_version, plan_before);

    // the run left a task/output pair in the executor's history
    let workspace = registry.lock_workspace(state.id).await.unwrap();
    let history = &workspace.teammate(alice).unwrap().history;
    assert_eq!(history.len(), 2);
    assert!(history[0].starts_with("TASK: research"));
    assert!(history[1].starts_with("OUTPUT: market research summary"));
}

#[tokio::test]
async fn test_run_without_executor_fails_validation() {
    let (registry, runner, _) = harness(vec![]);
    let state = registry
        .create_workspace("w", "o", &[TeammateSpec::new("Alice", "Researcher")])
        .await;
    let task = registry
        .create_task(state.id, "t", "d", &[], None)
        .await
        .unwrap();

    let err = runner.run_task(state.id, task.id, None).await.unwrap_err();
    assert!(matches!(err, CrewError::Validation(_)));

    // nothing was claimed
    let state = registry.get_state(state.id).await.unwrap();
    assert_eq!(state.tasks[0].status, TaskStatus::Pending);
}

#[tokio::test]
async fn test_failed_model_call_keeps_claim_for_resume() {
    let (registry, runner, _) = harness(vec![
        Err(LlmError::status(400, "bad request")),
        Ok("second try deliverable".into()),
    ]);
    let state = registry
        .create_workspace("w", "o", &[TeammateSpec::new("Alice", "Researcher")])
        .await;
    let alice = state
        .teammates
        .iter()
        .find(|t| t.name == "Alice")
        .unwrap()
        .id;
    let task = registry
        .create_task(state.id, "t", "d", &[], Some(alice))
        .await
        .unwrap();

    let err = runner.run_task(state.id, task.id, None).await.unwrap_err();
    assert!(matches!(err, CrewError::External(_)));

    // the claim survives the failure
    let snapshot = registry.get_state(state.id).await.unwrap();
    assert_eq!(snapshot.tasks[0].status, TaskStatus::InProgress);
    assert_eq!(snapshot.tasks[0].assignee_id, Some(alice));

    // a later run resumes the in-progress task and completes it
    let output = runner.run_task(state.id, task.id, None).await.unwrap();
    assert_eq!(output, "second try deliverable");
    let snapshot = registry.get_state(state.id).await.unwrap();
    assert_eq!(snapshot.tasks[0].status, TaskStatus::Completed);
}

#[tokio::test]
async fn test_transient_failures_are_retried_within_one_run() {
    let (registry, runner, backend) = harness(vec![
        Err(LlmError::status(429, "rate limited")),
        Err(LlmError::message("HTTP 429 from provider")),
        Ok("after retries".into()),
    ]);
    let state = registry
        .create_workspace("w", "o", &[TeammateSpec::new("Alice", "Researcher")])
        .await;
    let alice = state
        .teammates
        .iter()
        .find(|t| t.name == "Alice")
        .unwrap()
        .id;
    let task = registry
        .create_task(state.id, "t", "d", &[], Some(alice))
        .await
        .unwrap();

    let output = runner.run_task(state.id, task.id, None).await.unwrap();
    assert_eq!(output, "after retries");
    assert_eq!(backend.prompts().len(), 3);
}

#[tokio::test]
async fn test_completed_task_cannot_run_again() {
    let (registry, runner, _) = harness(vec![Ok("done".into())]);
    let state = registry
        .create_workspace("w", "o", &[TeammateSpec::new("Alice", "Researcher")])
        .await;
    let alice = state
        .teammates
        .iter()
        .find(|t| t.name == "Alice")
        .unwrap()
        .id;
    let task = registry
        .create_task(state.id, "t", "d", &[], Some(alice))
        .await
        .unwrap();

    runner.run_task(state.id, task.id, None).await.unwrap();
    let err = runner.run_task(state.id, task.id, None).await.unwrap_err();
    assert!(matches!(err, CrewError::Conflict(_)));
}

#[tokio::test]
async fn test_dependency_outputs_and_mail_reach_the_prompt() {
    let (registry, runner, backend) = harness(vec![
        Ok("pricing analysis".into()),
        Ok("final report".into()),
    ]);
    let state = registry
        .create_workspace(
            "w",
            "decide pricing",
            &[
                TeammateSpec::new("Alice", "Researcher"),
                TeammateSpec::new("Bob", "Team Lead"),
            ],
        )
        .await;
    let alice = state
        .teammates
        .iter()
        .find(|t| t.name == "Alice")
        .unwrap()
        .id;
    let bob = state.teammates.iter().find(|t| t.name == "Bob").unwrap().id;

    let analysis = registry
        .create_task(state.id, "analyze", "analyze pricing", &[], Some(alice))
        .await
        .unwrap();
    runner.run_task(state.id, analysis.id, None).await.unwrap();

    let report = registry
        .create_task(
            state.id,
            "report",
            "write the report",
            &[analysis.id],
            Some(alice),
        )
        .await
        .unwrap();
    registry
        .send_message(state.id, bob, alice, "keep it under one page")
        .await
        .unwrap();

    runner.run_task(state.id, report.id, None).await.unwrap();

    let prompts = backend.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("No unread teammate messages."));
    assert!(prompts[1].contains("pricing analysis"));
    assert!(prompts[1].contains("keep it under one page"));
    // the first run's history feeds the second prompt
    assert!(prompts[1].contains("TASK: analyze"));
}

#[tokio::test]
async fn test_executor_override_claims_unassigned_task() {
    let (registry, runner, _) = harness(vec![Ok("override output".into())]);
    let state = registry
        .create_workspace("w", "o", &[TeammateSpec::new("Alice", "Researcher")])
        .await;
    let alice = state
        .teammates
        .iter()
        .find(|t| t.name == "Alice")
        .unwrap()
        .id;
    let task = registry
        .create_task(state.id, "t", "d", &[], None)
        .await
        .unwrap();

    let output = runner.run_task(state.id, task.id, Some(alice)).await.unwrap();
    assert_eq!(output, "override output");
    let snapshot = registry.get_state(state.id).await.unwrap();
    assert_eq!(snapshot.tasks[0].assignee_id, Some(alice));
}

#[tokio::test]
async fn test_blocked_task_cannot_run() {
    let (registry, runner, _) = harness(vec![]);
    let state = registry
        .create_workspace("w", "o", &[TeammateSpec::new("Alice", "Researcher")])
        .await;
    let alice = state
        .teammates
        .iter()
        .find(|t| t.name == "Alice")
        .unwrap()
        .id;
    let gate = registry
        .create_task(state.id, "gate", "", &[], Some(alice))
        .await
        .unwrap();
    let blocked = registry
        .create_task(state.id, "blocked", "", &[gate.id], Some(alice))
        .await
        .unwrap();

    let err = runner.run_task(state.id, blocked.id, None).await.unwrap_err();
    assert!(matches!(err, CrewError::Conflict(_)));
}

#[tokio::test]
async fn test_unknown_ids_are_rejected() {
    let (registry, runner, _) = harness(vec![]);
    let err = runner
        .run_task(Uuid::new_v4(), Uuid::new_v4(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, CrewError::NotFound(_)));

    let state = registry
        .create_workspace("w", "o", &[TeammateSpec::new("Alice", "Researcher")])
        .await;
    let err = runner
        .run_task(state.id, Uuid::new_v4(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, CrewError::NotFound(_)));
}
