use async_trait::async_trait;
use chrono::{DateTime, Utc};

use acr_core::{ClaimOutcome, NewTaskOptions, Recommendation, Result, Task, TaskFilter};

/// Full task lifecycle contract (spec §4.3). Implementations own the
/// optimistic-locking claim protocol and the claim/progress timeout sweep;
/// callers never mutate a [`Task`] directly.
#[async_trait]
pub trait WorkDistributorContract: Send + Sync {
    async fn create_task(&self, title: &str, description: &str, options: NewTaskOptions) -> Result<Task>;

    /// Six-step optimistic-locking claim protocol. `expected_version` is
    /// optional; when supplied it must match the task's current
    /// `claim_version` or the call fails with `VersionMismatch`.
    async fn claim_task(
        &self,
        task_id: &str,
        agent_id: &str,
        expected_version: Option<u64>,
    ) -> Result<ClaimOutcome>;

    async fn start_task(&self, task_id: &str, agent_id: &str) -> Result<Task>;

    async fn complete_task(
        &self,
        task_id: &str,
        agent_id: &str,
        result: Option<serde_json::Value>,
    ) -> Result<Task>;

    async fn fail_task(&self, task_id: &str, agent_id: &str, error: &str) -> Result<Task>;

    async fn release_task(&self, task_id: &str, agent_id: &str) -> Result<Task>;

    /// Idempotent except for already-completed tasks, which return `Ok(false)`.
    async fn cancel_task(&self, task_id: &str) -> Result<bool>;

    async fn get_task(&self, task_id: &str) -> Result<Task>;

    async fn get_tasks(&self, filter: &TaskFilter) -> Vec<Task>;

    async fn get_available_tasks_for_agent(&self, agent_id: &str) -> Vec<Task>;

    async fn get_assignment_recommendations(&self, task_id: &str, limit: usize) -> Vec<Recommendation>;

    /// Tick-driven claim-timeout auto-release and progress-timeout event
    /// firing. Must be invoked periodically by the owning runtime loop.
    async fn sweep(&self, now: DateTime<Utc>);
}
