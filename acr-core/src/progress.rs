use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single append-only progress report for a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressEntry {
    pub id: String,
    pub task_id: String,
    pub agent_id: String,
    pub percentage: f64,
    pub status: String,
    pub message: String,
    pub details: Option<Value>,
    pub timestamp: DateTime<Utc>,
    pub time_spent_minutes: Option<i64>,
    pub estimated_remaining_minutes: Option<i64>,
    pub blockers: Option<Vec<String>>,
    pub metadata: HashMap<String, Value>,
}

/// Options accepted by `reportProgress` beyond the required positional
/// fields (spec §4.4).
#[derive(Debug, Clone, Default)]
pub struct ProgressOptions {
    pub details: Option<Value>,
    pub time_spent_minutes: Option<i64>,
    pub estimated_remaining_minutes: Option<i64>,
    pub blockers: Option<Vec<String>>,
    pub metadata: HashMap<String, Value>,
}

/// Milestone lifecycle status.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MilestoneStatus {
    Pending,
    InProgress,
    Achieved,
    Missed,
    Deferred,
}

/// An aggregate progress marker derived from tasks and/or child milestones.
/// `progress` is always *derived* (spec §4.4) — callers never set it
/// directly except implicitly via `achieved`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Milestone {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: MilestoneStatus,
    pub target_date: Option<DateTime<Utc>>,
    pub completed_date: Option<DateTime<Utc>>,
    pub required_task_ids: Vec<String>,
    pub progress: f64,
    pub parent_milestone_id: Option<String>,
    pub child_milestone_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner: Option<String>,
    pub tags: Vec<String>,
}

/// Per-agent statistics tracked by the progress tracker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AgentStats {
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub total_time_minutes: i64,
    pub recent_completion_minutes: Vec<i64>,
}

impl AgentStats {
    pub const MAX_RECENT_COMPLETIONS: usize = 100;

    /// Success rate defaults to 1.0 when there is no history, per spec §4.4.
    pub fn success_rate(&self) -> f64 {
        let total = self.tasks_completed + self.tasks_failed;
        if total == 0 {
            1.0
        } else {
            self.tasks_completed as f64 / total as f64
        }
    }

    pub fn record_completion(&mut self, minutes: i64) {
        self.tasks_completed += 1;
        self.total_time_minutes += minutes;
        self.recent_completion_minutes.push(minutes);
        if self.recent_completion_minutes.len() > Self::MAX_RECENT_COMPLETIONS {
            self.recent_completion_minutes.remove(0);
        }
    }

    pub fn record_failure(&mut self) {
        self.tasks_failed += 1;
    }
}

/// Aggregate status derived from a set of task statuses (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverallStatus {
    NotStarted,
    InProgress,
    Blocked,
    Completed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_rate_defaults_to_one_with_no_history() {
        let stats = AgentStats::default();
        assert_eq!(stats.success_rate(), 1.0);
    }

    #[test]
    fn success_rate_reflects_completions_and_failures() {
        let mut stats = AgentStats::default();
        stats.record_completion(10);
        stats.record_completion(5);
        stats.record_failure();
        assert!((stats.success_rate() - (2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn recent_completions_bounded_to_100() {
        let mut stats = AgentStats::default();
        for i in 0..150 {
            stats.record_completion(i);
        }
        assert_eq!(stats.recent_completion_minutes.len(), AgentStats::MAX_RECENT_COMPLETIONS);
        assert_eq!(stats.tasks_completed, 150);
    }
}
