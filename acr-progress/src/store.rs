use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::json;
use tracing::{debug, info};

use acr_core::error::{AcrError, Result};
use acr_core::events::{AcrEvent, EventSink, NoopEventSink};
use acr_core::message::Priority;
use acr_core::progress::{AgentStats, Milestone, MilestoneStatus, OverallStatus, ProgressEntry, ProgressOptions};
use acr_core::task::TaskStatus;
use acr_core::traits::TopicPublisher;

use crate::config::{MAX_HISTORY_PER_TASK, PROGRESS_TOPIC};
use crate::contract::ProgressTrackerContract;

/// In-process progress and milestone store. Per-task history lives behind a
/// single table-wide lock, mirroring the rest of the runtime's subsystems;
/// milestones get their own table since recomputation walks the parent chain
/// independently of any one task's history.
pub struct InMemoryProgressTracker {
    history: RwLock<HashMap<String, VecDeque<ProgressEntry>>>,
    latest: RwLock<HashMap<String, ProgressEntry>>,
    milestones: RwLock<HashMap<String, Milestone>>,
    agent_stats: RwLock<HashMap<String, AgentStats>>,
    publisher: Option<Arc<dyn TopicPublisher>>,
    sink: Arc<dyn EventSink>,
}

impl InMemoryProgressTracker {
    pub fn new(publisher: Option<Arc<dyn TopicPublisher>>, sink: Arc<dyn EventSink>) -> Self {
        info!("initializing in-memory progress tracker");
        Self {
            history: RwLock::new(HashMap::new()),
            latest: RwLock::new(HashMap::new()),
            milestones: RwLock::new(HashMap::new()),
            agent_stats: RwLock::new(HashMap::new()),
            publisher,
            sink,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(None, Arc::new(NoopEventSink))
    }

    fn emit(&self, event: AcrEvent) {
        self.sink.emit(event);
    }

    /// Walks from `milestone_id` up through `parentMilestoneId` links,
    /// recomputing each ancestor in turn. The DAG is acyclic by construction
    /// (spec §4.4), so this always terminates at a parentless root.
    fn recompute_chain(&self, milestone_id: &str) -> Result<Milestone> {
        let mut table = self.milestones.write();
        let latest = self.latest.read();

        let mut current_id = milestone_id.to_string();
        let mut result = None;
        loop {
            let parent_id = {
                let milestone = table
                    .get_mut(&current_id)
                    .ok_or_else(|| AcrError::not_found(&current_id))?;

                let progress = if !milestone.required_task_ids.is_empty() {
                    let sum: f64 = milestone
                        .required_task_ids
                        .iter()
                        .map(|id| latest.get(id).map(|entry| entry.percentage).unwrap_or(0.0))
                        .sum();
                    sum / milestone.required_task_ids.len() as f64
                } else if !milestone.child_milestone_ids.is_empty() {
                    // Children must already be recomputed by the time an
                    // ancestor is reached, since callers always recompute
                    // from the leaf that changed upward.
                    0.0
                } else {
                    0.0
                };

                milestone.progress = progress;
                milestone.updated_at = Utc::now();

                if milestone.progress >= 100.0 && milestone.status != MilestoneStatus::Achieved {
                    milestone.status = MilestoneStatus::Achieved;
                    milestone.completed_date = Some(Utc::now());
                    debug!(milestone_id = %current_id, "milestone achieved");
                } else if milestone.progress > 0.0
                    && milestone.progress < 100.0
                    && milestone.status == MilestoneStatus::Pending
                {
                    milestone.status = MilestoneStatus::InProgress;
                }

                if current_id == milestone_id {
                    result = Some(milestone.clone());
                }
                // Child-derived milestones are only provisionally updated
                // here (true progress settles in `recompute_child_derived`
                // below); only emit for milestones whose progress is final
                // at this point.
                if !milestone.required_task_ids.is_empty() || milestone.child_milestone_ids.is_empty() {
                    self.emit(AcrEvent::MilestoneStatusChanged {
                        milestone_id: current_id.clone(),
                    });
                }

                milestone.parent_milestone_id.clone()
            };

            match parent_id {
                Some(parent) => current_id = parent,
                None => break,
            }
        }

        // Child-derived progress requires a second pass once every leaf in
        // the chain has its own progress settled, since a milestone with
        // children (rather than `requiredTaskIds`) depends on siblings that
        // may not share this call's ancestor chain.
        self.recompute_child_derived(&mut table);

        result.ok_or_else(|| AcrError::not_found(milestone_id))
    }

    fn recompute_child_derived(&self, table: &mut HashMap<String, Milestone>) {
        let ids: Vec<String> = table
            .iter()
            .filter(|(_, m)| m.required_task_ids.is_empty() && !m.child_milestone_ids.is_empty())
            .map(|(id, _)| id.clone())
            .collect();

        for id in ids {
            let child_ids = table.get(&id).unwrap().child_milestone_ids.clone();
            let progresses: Vec<f64> = child_ids.iter().filter_map(|c| table.get(c).map(|m| m.progress)).collect();
            let progress = if progresses.is_empty() {
                0.0
            } else {
                progresses.iter().sum::<f64>() / progresses.len() as f64
            };
            if let Some(milestone) = table.get_mut(&id) {
                milestone.progress = progress;
                if milestone.progress >= 100.0 && milestone.status != MilestoneStatus::Achieved {
                    milestone.status = MilestoneStatus::Achieved;
                    milestone.completed_date = Some(Utc::now());
                } else if milestone.progress > 0.0
                    && milestone.progress < 100.0
                    && milestone.status == MilestoneStatus::Pending
                {
                    milestone.status = MilestoneStatus::InProgress;
                }
                self.emit(AcrEvent::MilestoneStatusChanged { milestone_id: id });
            }
        }
    }
}

#[async_trait]
impl ProgressTrackerContract for InMemoryProgressTracker {
    async fn report_progress(
        &self,
        agent_id: &str,
        task_id: &str,
        percentage: f64,
        status: &str,
        options: ProgressOptions,
    ) -> Result<ProgressEntry> {
        let percentage = percentage.clamp(0.0, 100.0);
        let now = Utc::now();
        let entry = ProgressEntry {
            id: acr_core::generate_id("progress"),
            task_id: task_id.to_string(),
            agent_id: agent_id.to_string(),
            percentage,
            status: status.to_string(),
            message: String::new(),
            details: options.details,
            timestamp: now,
            time_spent_minutes: options.time_spent_minutes,
            estimated_remaining_minutes: options.estimated_remaining_minutes,
            blockers: options.blockers,
            metadata: options.metadata,
        };

        {
            let mut history = self.history.write();
            let queue = history.entry(task_id.to_string()).or_default();
            queue.push_back(entry.clone());
            while queue.len() > MAX_HISTORY_PER_TASK {
                queue.pop_front();
            }
        }
        self.latest.write().insert(task_id.to_string(), entry.clone());

        let affected: Vec<String> = self
            .milestones
            .read()
            .iter()
            .filter(|(_, m)| m.required_task_ids.iter().any(|id| id == task_id))
            .map(|(id, _)| id.clone())
            .collect();
        for milestone_id in affected {
            let _ = self.recompute_chain(&milestone_id);
        }

        self.emit(AcrEvent::ProgressReported {
            task_id: task_id.to_string(),
            percentage,
        });

        if let Some(publisher) = &self.publisher {
            let body = json!({
                "taskId": task_id,
                "agentId": agent_id,
                "percentage": percentage,
                "status": status,
                "timestamp": now.to_rfc3339(),
            });
            let _ = publisher.publish(PROGRESS_TOPIC, "progress", body, Priority::Normal);
        }

        Ok(entry)
    }

    async fn get_history(&self, task_id: &str) -> Vec<ProgressEntry> {
        self.history
            .read()
            .get(task_id)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    async fn get_latest(&self, task_id: &str) -> Option<ProgressEntry> {
        self.latest.read().get(task_id).cloned()
    }

    async fn create_milestone(
        &self,
        name: &str,
        description: &str,
        required_task_ids: Vec<String>,
        parent_milestone_id: Option<String>,
    ) -> Result<Milestone> {
        let now = Utc::now();
        let id = acr_core::generate_id("milestone");
        let milestone = Milestone {
            id: id.clone(),
            name: name.to_string(),
            description: description.to_string(),
            status: MilestoneStatus::Pending,
            target_date: None,
            completed_date: None,
            required_task_ids,
            progress: 0.0,
            parent_milestone_id: parent_milestone_id.clone(),
            child_milestone_ids: Vec::new(),
            created_at: now,
            updated_at: now,
            owner: None,
            tags: Vec::new(),
        };

        let mut table = self.milestones.write();
        if let Some(parent_id) = &parent_milestone_id {
            let parent = table.get_mut(parent_id).ok_or_else(|| AcrError::not_found(parent_id))?;
            parent.child_milestone_ids.push(id.clone());
        }
        table.insert(id.clone(), milestone.clone());
        drop(table);

        info!(milestone_id = %id, "milestone created");
        self.emit(AcrEvent::MilestoneCreated { milestone_id: id });
        Ok(milestone)
    }

    async fn get_milestone(&self, milestone_id: &str) -> Result<Milestone> {
        self.milestones
            .read()
            .get(milestone_id)
            .cloned()
            .ok_or_else(|| AcrError::not_found(milestone_id))
    }

    async fn recompute_milestone(&self, milestone_id: &str) -> Result<Milestone> {
        self.recompute_chain(milestone_id)
    }

    async fn get_agent_stats(&self, agent_id: &str) -> AgentStats {
        self.agent_stats.read().get(agent_id).cloned().unwrap_or_default()
    }

    async fn record_task_outcome(&self, agent_id: &str, completed: bool, minutes: Option<i64>) {
        let mut table = self.agent_stats.write();
        let stats = table.entry(agent_id.to_string()).or_default();
        if completed {
            stats.record_completion(minutes.unwrap_or(0));
        } else {
            stats.record_failure();
        }
    }

    fn overall_status(&self, task_statuses: &[TaskStatus]) -> OverallStatus {
        if task_statuses.is_empty() {
            return OverallStatus::NotStarted;
        }
        let total = task_statuses.len();
        let completed = task_statuses.iter().filter(|s| **s == TaskStatus::Completed).count();
        if completed == total {
            return OverallStatus::Completed;
        }
        let any_blocked = task_statuses.iter().any(|s| *s == TaskStatus::Blocked);
        let any_in_progress = task_statuses.iter().any(|s| *s == TaskStatus::InProgress);
        if any_blocked && !any_in_progress {
            OverallStatus::Blocked
        } else if any_in_progress {
            OverallStatus::InProgress
        } else {
            OverallStatus::NotStarted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn report_progress_clamps_and_updates_latest() {
        let tracker = InMemoryProgressTracker::with_defaults();
        let entry = tracker
            .report_progress("a-1", "t-1", 150.0, "working", ProgressOptions::default())
            .await
            .unwrap();
        assert_eq!(entry.percentage, 100.0);
        assert_eq!(tracker.get_latest("t-1").await.unwrap().percentage, 100.0);
    }

    #[tokio::test]
    async fn history_is_bounded_to_configured_max() {
        let tracker = InMemoryProgressTracker::with_defaults();
        for i in 0..(MAX_HISTORY_PER_TASK + 5) {
            tracker
                .report_progress("a-1", "t-1", (i % 100) as f64, "working", ProgressOptions::default())
                .await
                .unwrap();
        }
        assert_eq!(tracker.get_history("t-1").await.len(), MAX_HISTORY_PER_TASK);
    }

    #[tokio::test]
    async fn milestone_achieves_when_required_tasks_reach_full_progress() {
        let tracker = InMemoryProgressTracker::with_defaults();
        let milestone = tracker
            .create_milestone("m", "d", vec!["t-1".to_string(), "t-2".to_string()], None)
            .await
            .unwrap();

        tracker
            .report_progress("a-1", "t-1", 100.0, "done", ProgressOptions::default())
            .await
            .unwrap();
        let recomputed = tracker.get_milestone(&milestone.id).await.unwrap();
        assert_eq!(recomputed.status, MilestoneStatus::InProgress);
        assert_eq!(recomputed.progress, 50.0);

        tracker
            .report_progress("a-1", "t-2", 100.0, "done", ProgressOptions::default())
            .await
            .unwrap();
        let achieved = tracker.get_milestone(&milestone.id).await.unwrap();
        assert_eq!(achieved.status, MilestoneStatus::Achieved);
        assert!(achieved.completed_date.is_some());
    }

    #[tokio::test]
    async fn milestone_recompute_cascades_to_parent() {
        let tracker = InMemoryProgressTracker::with_defaults();
        let parent = tracker.create_milestone("parent", "d", vec![], None).await.unwrap();
        let child = tracker
            .create_milestone("child", "d", vec!["t-1".to_string()], Some(parent.id.clone()))
            .await
            .unwrap();

        tracker
            .report_progress("a-1", "t-1", 100.0, "done", ProgressOptions::default())
            .await
            .unwrap();
        tracker.recompute_milestone(&child.id).await.unwrap();

        let parent_after = tracker.get_milestone(&parent.id).await.unwrap();
        assert_eq!(parent_after.progress, 100.0);
        assert_eq!(parent_after.status, MilestoneStatus::Achieved);
    }

    #[test]
    fn overall_status_matches_spec_rules() {
        let tracker = InMemoryProgressTracker::with_defaults();
        assert_eq!(tracker.overall_status(&[]), OverallStatus::NotStarted);
        assert_eq!(
            tracker.overall_status(&[TaskStatus::Completed, TaskStatus::Completed]),
            OverallStatus::Completed
        );
        assert_eq!(
            tracker.overall_status(&[TaskStatus::Blocked, TaskStatus::Completed]),
            OverallStatus::Blocked
        );
        assert_eq!(
            tracker.overall_status(&[TaskStatus::Blocked, TaskStatus::InProgress]),
            OverallStatus::InProgress
        );
        assert_eq!(
            tracker.overall_status(&[TaskStatus::Available]),
            OverallStatus::NotStarted
        );
    }
}
