use async_trait::async_trait;

use acr_core::{AgentStats, Milestone, OverallStatus, ProgressEntry, ProgressOptions, Result, TaskStatus};

/// Progress and milestone tracking contract (spec §4.4). Milestone progress
/// is always derived; callers never set it directly except implicitly
/// through task completion percentages reaching 100.
#[async_trait]
pub trait ProgressTrackerContract: Send + Sync {
    async fn report_progress(
        &self,
        agent_id: &str,
        task_id: &str,
        percentage: f64,
        status: &str,
        options: ProgressOptions,
    ) -> Result<ProgressEntry>;

    async fn get_history(&self, task_id: &str) -> Vec<ProgressEntry>;

    async fn get_latest(&self, task_id: &str) -> Option<ProgressEntry>;

    async fn create_milestone(
        &self,
        name: &str,
        description: &str,
        required_task_ids: Vec<String>,
        parent_milestone_id: Option<String>,
    ) -> Result<Milestone>;

    async fn get_milestone(&self, milestone_id: &str) -> Result<Milestone>;

    async fn recompute_milestone(&self, milestone_id: &str) -> Result<Milestone>;

    async fn get_agent_stats(&self, agent_id: &str) -> AgentStats;

    /// Records a completion/failure against an agent's running statistics.
    async fn record_task_outcome(&self, agent_id: &str, completed: bool, minutes: Option<i64>);

    /// Pure function of the statuses of a task set (spec §4.4). The
    /// distributor crate owns task state; callers supply the statuses they
    /// already hold rather than this crate depending on `acr-work`.
    fn overall_status(&self, task_statuses: &[TaskStatus]) -> OverallStatus;
}
