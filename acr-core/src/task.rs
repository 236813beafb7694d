use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::Role;
use crate::message::Priority;

/// Task lifecycle states.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    Available,
    Claimed,
    InProgress,
    Blocked,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// A unit of work tracked through claim/progress/completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub required_role: Option<Role>,
    pub required_capabilities: Vec<String>,
    pub dependencies: Vec<String>,
    pub claimed_by: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub claim_version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub estimated_minutes: Option<i64>,
    pub actual_minutes: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub metadata: HashMap<String, Value>,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub parent_task_id: Option<String>,
    pub subtask_ids: Vec<String>,
    pub max_retries: u32,
    pub retry_count: u32,
}

impl Task {
    /// Invariant (iii) from spec §3: blocked iff some dependency is not
    /// completed, given the completion status of every dependency.
    pub fn dependencies_satisfied(&self, dependency_statuses: &HashMap<String, TaskStatus>) -> bool {
        self.dependencies.iter().all(|dep| {
            dependency_statuses
                .get(dep)
                .map(|status| *status == TaskStatus::Completed)
                .unwrap_or(false)
        })
    }

    pub fn is_claimed_by(&self, agent_id: &str) -> bool {
        self.claimed_by.as_deref() == Some(agent_id)
    }
}

/// Options accepted when creating a new task. Mirrors the optional fields in
/// spec §4.3's `createTask(title, description, options)` signature.
#[derive(Debug, Clone, Default)]
pub struct NewTaskOptions {
    pub priority: Option<Priority>,
    pub required_role: Option<Role>,
    pub required_capabilities: Vec<String>,
    pub dependencies: Vec<String>,
    pub estimated_minutes: Option<i64>,
    pub metadata: HashMap<String, Value>,
    pub parent_task_id: Option<String>,
    pub max_retries: Option<u32>,
}

/// Filter criteria for [`crate::traits::WorkDistributorContract::get_tasks`].
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub claimed_by: Option<String>,
    pub required_role: Option<Role>,
    pub parent_task_id: Option<String>,
}

/// Outcome of a claim attempt (spec §4.3 optimistic locking protocol).
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimOutcome {
    pub success: bool,
    pub task: Option<Task>,
    pub reason: Option<String>,
    pub conflict: Option<ClaimConflict>,
}

/// Conflict payload returned when a claim loses a race.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimConflict {
    pub claimed_by: String,
    pub claimed_at: DateTime<Utc>,
    pub claim_version: u64,
}

/// One scored `{task, agent}` recommendation (spec §4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub task_id: String,
    pub agent_id: String,
    pub score: f64,
    pub reasons: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_with_deps(deps: Vec<&str>) -> Task {
        Task {
            id: "t-1".into(),
            title: "t".into(),
            description: "d".into(),
            status: TaskStatus::Blocked,
            priority: Priority::Normal,
            required_role: None,
            required_capabilities: vec![],
            dependencies: deps.into_iter().map(String::from).collect(),
            claimed_by: None,
            claimed_at: None,
            claim_version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            estimated_minutes: None,
            actual_minutes: None,
            started_at: None,
            completed_at: None,
            metadata: HashMap::new(),
            result: None,
            error: None,
            parent_task_id: None,
            subtask_ids: vec![],
            max_retries: 3,
            retry_count: 0,
        }
    }

    #[test]
    fn dependencies_satisfied_requires_all_completed() {
        let task = task_with_deps(vec!["d-1", "d-2"]);
        let mut statuses = HashMap::new();
        statuses.insert("d-1".to_string(), TaskStatus::Completed);
        assert!(!task.dependencies_satisfied(&statuses));

        statuses.insert("d-2".to_string(), TaskStatus::Completed);
        assert!(task.dependencies_satisfied(&statuses));
    }

    #[test]
    fn no_dependencies_is_always_satisfied() {
        let task = task_with_deps(vec![]);
        assert!(task.dependencies_satisfied(&HashMap::new()));
    }
}
