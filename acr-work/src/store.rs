use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use acr_core::agent::AgentStatus;
use acr_core::error::{AcrError, Result};
use acr_core::events::{AcrEvent, EventSink, NoopEventSink};
use acr_core::message::Priority;
use acr_core::task::{ClaimConflict, ClaimOutcome, NewTaskOptions, Recommendation, Task, TaskFilter, TaskStatus};
use acr_core::traits::{AgentCurrentTaskSetter, AgentDirectory, TopicPublisher};

use crate::config::{CLAIM_TIMEOUT_SECS, DEFAULT_MAX_RETRIES, PROGRESS_TIMEOUT_SECS, TASK_STATUS_TOPIC};
use crate::contract::WorkDistributorContract;

struct TaskRecord {
    task: Task,
    claim_deadline: Option<DateTime<Utc>>,
    progress_deadline: Option<DateTime<Utc>>,
    progress_timeout_fired: bool,
}

impl TaskRecord {
    fn new(task: Task) -> Self {
        Self {
            task,
            claim_deadline: None,
            progress_deadline: None,
            progress_timeout_fired: false,
        }
    }
}

/// In-process task store. One table-wide lock guards every task, mirroring
/// [`acr_registry::InMemoryRegistry`]'s rationale: claim/start/complete/fail
/// critical sections are short map operations, never awaited while held.
pub struct InMemoryWorkDistributor {
    tasks: RwLock<HashMap<String, TaskRecord>>,
    directory: Arc<dyn AgentDirectory>,
    current_task_setter: Arc<dyn AgentCurrentTaskSetter>,
    publisher: Option<Arc<dyn TopicPublisher>>,
    sink: Arc<dyn EventSink>,
}

impl InMemoryWorkDistributor {
    pub fn new(
        directory: Arc<dyn AgentDirectory>,
        current_task_setter: Arc<dyn AgentCurrentTaskSetter>,
        publisher: Option<Arc<dyn TopicPublisher>>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        info!("initializing in-memory work distributor");
        Self {
            tasks: RwLock::new(HashMap::new()),
            directory,
            current_task_setter,
            publisher,
            sink,
        }
    }

    pub fn with_defaults(
        directory: Arc<dyn AgentDirectory>,
        current_task_setter: Arc<dyn AgentCurrentTaskSetter>,
    ) -> Self {
        Self::new(directory, current_task_setter, None, Arc::new(NoopEventSink))
    }

    fn emit(&self, event: AcrEvent) {
        self.sink.emit(event);
    }

    fn publish_status(&self, task_id: &str, status: TaskStatus, agent_id: Option<&str>, extra: Value) {
        if let Some(publisher) = &self.publisher {
            let mut body = json!({
                "taskId": task_id,
                "status": format!("{:?}", status),
                "agentId": agent_id,
                "timestamp": Utc::now().to_rfc3339(),
            });
            if let (Value::Object(map), Value::Object(extra_map)) = (&mut body, extra) {
                map.extend(extra_map);
            }
            if let Err(err) = publisher.publish(TASK_STATUS_TOPIC, "task.status", body, Priority::Normal) {
                warn!(%task_id, error = %err, "failed to publish task status");
            }
        }
    }

    fn dependency_statuses(table: &HashMap<String, TaskRecord>, deps: &[String]) -> HashMap<String, TaskStatus> {
        deps.iter()
            .filter_map(|id| table.get(id).map(|r| (id.clone(), r.task.status)))
            .collect()
    }

    /// Agent eligibility: live (active/idle), not busy, matching role (if
    /// required) and carrying every required capability (spec §4.3 step 5).
    fn eligible(&self, agent_id: &str, task: &Task) -> Result<()> {
        let agent = self
            .directory
            .get(agent_id)
            .ok_or_else(|| AcrError::not_found(agent_id))?;

        if !matches!(agent.status, AgentStatus::Active | AgentStatus::Idle) {
            return Err(AcrError::Ineligible(format!(
                "agent {agent_id} is not available to claim tasks (status {:?})",
                agent.status
            )));
        }
        if let Some(role) = task.required_role {
            if agent.role != role {
                return Err(AcrError::Ineligible(format!(
                    "agent {agent_id} role {:?} does not match required role {:?}",
                    agent.role, role
                )));
            }
        }
        if !agent.has_all_capabilities(&task.required_capabilities) {
            return Err(AcrError::Ineligible(format!(
                "agent {agent_id} lacks a required capability for task {}",
                task.id
            )));
        }
        Ok(())
    }

    /// Scans every task for one newly unblocked by `completed_task_id`'s
    /// completion and flips it from `blocked` to `available` once all of its
    /// dependencies are completed.
    fn unblock_dependents(&self, table: &mut HashMap<String, TaskRecord>, completed_task_id: &str) {
        let dependents: Vec<String> = table
            .iter()
            .filter(|(_, record)| {
                record.task.status == TaskStatus::Blocked
                    && record.task.dependencies.iter().any(|d| d == completed_task_id)
            })
            .map(|(id, _)| id.clone())
            .collect();

        for dependent_id in dependents {
            let statuses = Self::dependency_statuses(
                table,
                &table.get(&dependent_id).expect("dependent exists").task.dependencies.clone(),
            );
            if let Some(record) = table.get_mut(&dependent_id) {
                if record.task.dependencies_satisfied(&statuses) {
                    record.task.status = TaskStatus::Available;
                    record.task.updated_at = Utc::now();
                    debug!(task_id = %dependent_id, "task unblocked by dependency completion");
                    self.emit(AcrEvent::TaskUnblocked {
                        task_id: dependent_id.clone(),
                    });
                    self.publish_status(&dependent_id, TaskStatus::Available, None, json!({}));
                }
            }
        }
    }
}

#[async_trait]
impl WorkDistributorContract for InMemoryWorkDistributor {
    async fn create_task(&self, title: &str, description: &str, options: NewTaskOptions) -> Result<Task> {
        let mut table = self.tasks.write();

        for dep in &options.dependencies {
            if !table.contains_key(dep) {
                return Err(AcrError::invalid(format!("unknown dependency {dep}")));
            }
        }

        let now = Utc::now();
        let id = acr_core::generate_id("task");
        let initial_status = if options.dependencies.iter().all(|d| {
            table
                .get(d)
                .map(|r| r.task.status == TaskStatus::Completed)
                .unwrap_or(false)
        }) {
            TaskStatus::Available
        } else {
            TaskStatus::Blocked
        };

        let task = Task {
            id: id.clone(),
            title: title.to_string(),
            description: description.to_string(),
            status: initial_status,
            priority: options.priority.unwrap_or(Priority::Normal),
            required_role: options.required_role,
            required_capabilities: options.required_capabilities,
            dependencies: options.dependencies,
            claimed_by: None,
            claimed_at: None,
            claim_version: 0,
            created_at: now,
            updated_at: now,
            estimated_minutes: options.estimated_minutes,
            actual_minutes: None,
            started_at: None,
            completed_at: None,
            metadata: options.metadata,
            result: None,
            error: None,
            parent_task_id: options.parent_task_id.clone(),
            subtask_ids: Vec::new(),
            max_retries: options.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            retry_count: 0,
        };

        if let Some(parent_id) = &options.parent_task_id {
            if let Some(parent) = table.get_mut(parent_id) {
                parent.task.subtask_ids.push(id.clone());
            }
        }

        table.insert(id.clone(), TaskRecord::new(task.clone()));
        info!(task_id = %id, status = ?initial_status, "task created");
        self.emit(AcrEvent::TaskCreated { task_id: id.clone() });
        Ok(task)
    }

    async fn claim_task(
        &self,
        task_id: &str,
        agent_id: &str,
        expected_version: Option<u64>,
    ) -> Result<ClaimOutcome> {
        // Step 5 (eligibility) only reads the registry directory, so it is
        // validated before acquiring the write lock to avoid holding it
        // across a foreign call; steps 1-4 and the atomic claim itself (step
        // 6) all run under a single write-lock acquisition below.
        let snapshot_task = self
            .tasks
            .read()
            .get(task_id)
            .map(|r| r.task.clone())
            .ok_or_else(|| AcrError::not_found(task_id))?;
        if snapshot_task.status == TaskStatus::Available {
            self.eligible(agent_id, &snapshot_task)?;
        }

        let mut table = self.tasks.write();
        let deps = {
            let record = table.get(task_id).ok_or_else(|| AcrError::not_found(task_id))?;

            // Step 2a: a blocked task fails with DependenciesPending even if
            // expectedVersion matches (spec's claim-eligibility boundary),
            // so it must be special-cased ahead of the generic "already
            // claimed" branch below.
            if record.task.status == TaskStatus::Blocked {
                return Err(AcrError::DependenciesPending(task_id.to_string()));
            }

            // Step 2b: already claimed by someone else.
            if record.task.status != TaskStatus::Available {
                return Ok(ClaimOutcome {
                    success: false,
                    task: Some(record.task.clone()),
                    reason: Some("already claimed".to_string()),
                    conflict: Some(ClaimConflict {
                        claimed_by: record.task.claimed_by.clone().unwrap_or_default(),
                        claimed_at: record.task.claimed_at.unwrap_or(record.task.updated_at),
                        claim_version: record.task.claim_version,
                    }),
                });
            }
            record.task.dependencies.clone()
        };

        // Step 3: every dependency must be completed.
        let dep_statuses = Self::dependency_statuses(&table, &deps);
        let record = table.get_mut(task_id).unwrap();
        if !record.task.dependencies_satisfied(&dep_statuses) {
            return Err(AcrError::DependenciesPending(task_id.to_string()));
        }

        // Step 4: optimistic-lock version check.
        if let Some(expected) = expected_version {
            if expected != record.task.claim_version {
                return Err(AcrError::VersionMismatch {
                    task_id: task_id.to_string(),
                    expected,
                    actual: record.task.claim_version,
                });
            }
        }

        // Step 5 re-validated under the write lock to close the TOCTOU gap
        // against a concurrent status change by another agent.
        self.eligible(agent_id, &record.task)?;

        // Step 6: atomic claim.
        let now = Utc::now();
        record.task.status = TaskStatus::Claimed;
        record.task.claimed_by = Some(agent_id.to_string());
        record.task.claimed_at = Some(now);
        record.task.claim_version += 1;
        record.task.updated_at = now;
        record.claim_deadline = Some(now + chrono::Duration::seconds(CLAIM_TIMEOUT_SECS));
        let claimed_task = record.task.clone();
        drop(table);

        self.current_task_setter
            .set_current_task(agent_id, Some(task_id.to_string()))
            .await?;

        info!(%task_id, %agent_id, "task claimed");
        self.emit(AcrEvent::TaskClaimed {
            task_id: task_id.to_string(),
            agent_id: agent_id.to_string(),
        });
        self.publish_status(task_id, TaskStatus::Claimed, Some(agent_id), json!({}));

        Ok(ClaimOutcome {
            success: true,
            task: Some(claimed_task),
            reason: None,
            conflict: None,
        })
    }

    async fn start_task(&self, task_id: &str, agent_id: &str) -> Result<Task> {
        let mut table = self.tasks.write();
        let record = table.get_mut(task_id).ok_or_else(|| AcrError::not_found(task_id))?;

        if !record.task.is_claimed_by(agent_id) {
            return Err(AcrError::NotOwned {
                task_id: task_id.to_string(),
                agent_id: agent_id.to_string(),
            });
        }
        if record.task.status != TaskStatus::Claimed {
            return Err(AcrError::Invalid(format!(
                "task {task_id} cannot be started from status {:?}",
                record.task.status
            )));
        }

        let now = Utc::now();
        record.task.status = TaskStatus::InProgress;
        record.task.started_at = Some(now);
        record.task.updated_at = now;
        record.claim_deadline = None;
        record.progress_deadline = Some(now + chrono::Duration::seconds(PROGRESS_TIMEOUT_SECS));
        record.progress_timeout_fired = false;
        let task = record.task.clone();
        drop(table);

        info!(%task_id, %agent_id, "task started");
        self.emit(AcrEvent::TaskStarted { task_id: task_id.to_string() });
        self.publish_status(task_id, TaskStatus::InProgress, Some(agent_id), json!({}));
        Ok(task)
    }

    async fn complete_task(&self, task_id: &str, agent_id: &str, result: Option<Value>) -> Result<Task> {
        let task = {
            let mut table = self.tasks.write();
            let record = table.get_mut(task_id).ok_or_else(|| AcrError::not_found(task_id))?;

            if !record.task.is_claimed_by(agent_id) {
                return Err(AcrError::NotOwned {
                    task_id: task_id.to_string(),
                    agent_id: agent_id.to_string(),
                });
            }

            let now = Utc::now();
            record.task.status = TaskStatus::Completed;
            record.task.completed_at = Some(now);
            record.task.updated_at = now;
            record.task.result = result;
            record.task.actual_minutes = record
                .task
                .started_at
                .map(|started| (now - started).num_minutes().max(0));
            record.claim_deadline = None;
            record.progress_deadline = None;

            record.task.clone()
        };

        {
            let mut table = self.tasks.write();
            self.unblock_dependents(&mut table, task_id);
        }

        self.current_task_setter.set_current_task(agent_id, None).await?;

        info!(%task_id, %agent_id, "task completed");
        self.emit(AcrEvent::TaskCompleted { task_id: task_id.to_string() });
        self.publish_status(task_id, TaskStatus::Completed, Some(agent_id), json!({}));
        Ok(task)
    }

    async fn fail_task(&self, task_id: &str, agent_id: &str, error: &str) -> Result<Task> {
        let (task, retried) = {
            let mut table = self.tasks.write();
            let record = table.get_mut(task_id).ok_or_else(|| AcrError::not_found(task_id))?;

            if !record.task.is_claimed_by(agent_id) {
                return Err(AcrError::NotOwned {
                    task_id: task_id.to_string(),
                    agent_id: agent_id.to_string(),
                });
            }

            let now = Utc::now();
            record.task.retry_count += 1;
            record.task.error = Some(error.to_string());
            record.task.updated_at = now;

            let retried = record.task.retry_count < record.task.max_retries;
            if retried {
                record.task.status = TaskStatus::Available;
                record.task.claimed_by = None;
                record.task.claimed_at = None;
                record.claim_deadline = None;
            } else {
                record.task.status = TaskStatus::Failed;
                record.claim_deadline = None;
                record.progress_deadline = None;
            }
            (record.task.clone(), retried)
        };

        self.current_task_setter.set_current_task(agent_id, None).await?;

        if retried {
            warn!(%task_id, %agent_id, retry_count = task.retry_count, "task failed, retrying");
            self.emit(AcrEvent::TaskRetrying {
                task_id: task_id.to_string(),
                retry_count: task.retry_count,
            });
            self.publish_status(task_id, TaskStatus::Available, None, json!({ "error": error }));
        } else {
            warn!(%task_id, %agent_id, "task failed permanently");
            self.emit(AcrEvent::TaskFailed {
                task_id: task_id.to_string(),
                reason: error.to_string(),
            });
            self.publish_status(task_id, TaskStatus::Failed, Some(agent_id), json!({ "error": error }));
        }
        Ok(task)
    }

    async fn release_task(&self, task_id: &str, agent_id: &str) -> Result<Task> {
        let mut table = self.tasks.write();
        let record = table.get_mut(task_id).ok_or_else(|| AcrError::not_found(task_id))?;

        if !record.task.is_claimed_by(agent_id) {
            return Err(AcrError::NotOwned {
                task_id: task_id.to_string(),
                agent_id: agent_id.to_string(),
            });
        }

        record.task.status = TaskStatus::Available;
        record.task.claimed_by = None;
        record.task.claimed_at = None;
        record.task.started_at = None;
        record.task.updated_at = Utc::now();
        record.claim_deadline = None;
        record.progress_deadline = None;
        let task = record.task.clone();
        drop(table);

        self.current_task_setter.set_current_task(agent_id, None).await?;

        info!(%task_id, %agent_id, "task released");
        self.emit(AcrEvent::TaskReleased { task_id: task_id.to_string() });
        self.publish_status(task_id, TaskStatus::Available, None, json!({}));
        Ok(task)
    }

    async fn cancel_task(&self, task_id: &str) -> Result<bool> {
        let mut table = self.tasks.write();
        let record = table.get_mut(task_id).ok_or_else(|| AcrError::not_found(task_id))?;

        if record.task.status == TaskStatus::Completed {
            return Ok(false);
        }

        record.task.status = TaskStatus::Cancelled;
        record.task.updated_at = Utc::now();
        record.claim_deadline = None;
        record.progress_deadline = None;
        drop(table);

        info!(%task_id, "task cancelled");
        self.emit(AcrEvent::TaskCancelled { task_id: task_id.to_string() });
        self.publish_status(task_id, TaskStatus::Cancelled, None, json!({}));
        Ok(true)
    }

    async fn get_task(&self, task_id: &str) -> Result<Task> {
        self.tasks
            .read()
            .get(task_id)
            .map(|r| r.task.clone())
            .ok_or_else(|| AcrError::not_found(task_id))
    }

    async fn get_tasks(&self, filter: &TaskFilter) -> Vec<Task> {
        self.tasks
            .read()
            .values()
            .filter(|r| {
                if let Some(status) = filter.status {
                    if r.task.status != status {
                        return false;
                    }
                }
                if let Some(claimed_by) = &filter.claimed_by {
                    if r.task.claimed_by.as_ref() != Some(claimed_by) {
                        return false;
                    }
                }
                if let Some(role) = filter.required_role {
                    if r.task.required_role != Some(role) {
                        return false;
                    }
                }
                if let Some(parent) = &filter.parent_task_id {
                    if r.task.parent_task_id.as_ref() != Some(parent) {
                        return false;
                    }
                }
                true
            })
            .map(|r| r.task.clone())
            .collect()
    }

    async fn get_available_tasks_for_agent(&self, agent_id: &str) -> Vec<Task> {
        let table = self.tasks.read();
        table
            .values()
            .filter(|r| r.task.status == TaskStatus::Available)
            .filter(|r| self.eligible(agent_id, &r.task).is_ok())
            .map(|r| r.task.clone())
            .collect()
    }

    async fn get_assignment_recommendations(&self, task_id: &str, limit: usize) -> Vec<Recommendation> {
        let task = match self.tasks.read().get(task_id).map(|r| r.task.clone()) {
            Some(task) => task,
            None => return Vec::new(),
        };

        let candidates = self.directory.live_agents();
        let mut scored: Vec<Recommendation> = candidates
            .into_iter()
            .filter_map(|agent| {
                let mut score = 0.0;
                let mut reasons = Vec::new();

                if let Some(role) = task.required_role {
                    if agent.role == role {
                        score += 20.0;
                        reasons.push("role match".to_string());
                    }
                }
                for capability in &task.required_capabilities {
                    if let Some(proficiency) = agent.capability_proficiency(capability) {
                        score += 10.0;
                        score += 10.0 * proficiency;
                        reasons.push(format!("has capability {capability}"));
                    }
                }
                if agent.status == AgentStatus::Idle {
                    score += 15.0;
                    reasons.push("idle".to_string());
                } else if agent.status == AgentStatus::Active
                    && (Utc::now() - agent.last_activity).num_seconds() <= 60
                {
                    score += 5.0;
                    reasons.push("recently active".to_string());
                }

                if score <= 0.0 {
                    return None;
                }
                Some(Recommendation {
                    task_id: task_id.to_string(),
                    agent_id: agent.id,
                    score,
                    reasons,
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        scored
    }

    async fn sweep(&self, now: DateTime<Utc>) {
        let mut table = self.tasks.write();
        let mut released = Vec::new();
        let mut progress_timed_out = Vec::new();

        for (id, record) in table.iter_mut() {
            if record.task.status == TaskStatus::Claimed {
                if let Some(deadline) = record.claim_deadline {
                    if now >= deadline {
                        record.task.status = TaskStatus::Available;
                        let claimant = record.task.claimed_by.take();
                        record.task.claimed_at = None;
                        record.task.updated_at = now;
                        record.claim_deadline = None;
                        released.push((id.clone(), claimant));
                    }
                }
            }
            if record.task.status == TaskStatus::InProgress && !record.progress_timeout_fired {
                if let Some(deadline) = record.progress_deadline {
                    if now >= deadline {
                        record.progress_timeout_fired = true;
                        progress_timed_out.push(id.clone());
                    }
                }
            }
        }
        drop(table);

        for (task_id, claimant) in released {
            warn!(%task_id, "claim timed out, released back to available");
            self.emit(AcrEvent::ClaimTimeout { task_id: task_id.clone() });
            self.publish_status(&task_id, TaskStatus::Available, None, json!({}));
            if let Some(agent_id) = claimant {
                if let Err(err) = self.current_task_setter.set_current_task(&agent_id, None).await {
                    warn!(%agent_id, error = %err, "failed to clear current task after claim timeout");
                }
            }
        }
        for task_id in progress_timed_out {
            debug!(%task_id, "progress timeout fired");
            self.emit(AcrEvent::ProgressTimeout { task_id });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use acr_core::agent::{Agent, AgentFilter, Capability, Role, Surface};
    use acr_core::events::NoopEventSink;

    use super::*;

    struct FakeDirectory {
        agents: Mutex<HashMap<String, Agent>>,
    }

    impl FakeDirectory {
        fn new(agents: Vec<Agent>) -> Self {
            Self {
                agents: Mutex::new(agents.into_iter().map(|a| (a.id.clone(), a)).collect()),
            }
        }

        fn set_status(&self, id: &str, status: AgentStatus) {
            if let Some(agent) = self.agents.lock().unwrap().get_mut(id) {
                agent.status = status;
            }
        }
    }

    impl AgentDirectory for FakeDirectory {
        fn get(&self, agent_id: &str) -> Option<Agent> {
            self.agents.lock().unwrap().get(agent_id).cloned()
        }
        fn discover(&self, _filter: &AgentFilter) -> Vec<Agent> {
            self.agents.lock().unwrap().values().cloned().collect()
        }
        fn live_agents(&self) -> Vec<Agent> {
            self.agents
                .lock()
                .unwrap()
                .values()
                .filter(|a| a.status.is_live())
                .cloned()
                .collect()
        }
    }

    struct FakeTaskSetter {
        directory: Arc<FakeDirectory>,
    }

    #[async_trait]
    impl AgentCurrentTaskSetter for FakeTaskSetter {
        async fn set_current_task(&self, agent_id: &str, task_id: Option<String>) -> Result<()> {
            if let Some(agent) = self.directory.agents.lock().unwrap().get_mut(agent_id) {
                agent.current_task_id = task_id.clone();
                agent.status = if task_id.is_some() {
                    AgentStatus::Busy
                } else {
                    AgentStatus::Idle
                };
            }
            Ok(())
        }
    }

    fn agent(id: &str, role: Role, status: AgentStatus) -> Agent {
        Agent {
            id: id.to_string(),
            role,
            capabilities: vec![Capability::new("rust", 0.9)],
            status,
            parent: None,
            children: Default::default(),
            surface: Surface::Cli,
            session: "s-1".into(),
            registered_at: Utc::now(),
            last_heartbeat: Utc::now(),
            last_activity: Utc::now(),
            current_task_id: None,
            metadata: Default::default(),
        }
    }

    fn harness(agents: Vec<Agent>) -> (InMemoryWorkDistributor, Arc<FakeDirectory>) {
        let directory = Arc::new(FakeDirectory::new(agents));
        let setter = Arc::new(FakeTaskSetter { directory: directory.clone() });
        let distributor = InMemoryWorkDistributor::new(directory.clone(), setter, None, Arc::new(NoopEventSink));
        (distributor, directory)
    }

    #[tokio::test]
    async fn claim_start_complete_happy_path() {
        let (distributor, _directory) = harness(vec![agent("a-1", Role::Implementer, AgentStatus::Idle)]);
        let task = distributor
            .create_task("t", "d", NewTaskOptions::default())
            .await
            .unwrap();

        let outcome = distributor.claim_task(&task.id, "a-1", None).await.unwrap();
        assert!(outcome.success);

        let started = distributor.start_task(&task.id, "a-1").await.unwrap();
        assert_eq!(started.status, TaskStatus::InProgress);

        let completed = distributor.complete_task(&task.id, "a-1", None).await.unwrap();
        assert_eq!(completed.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn claim_rejects_ineligible_busy_agent() {
        let (distributor, _directory) = harness(vec![agent("a-1", Role::Implementer, AgentStatus::Busy)]);
        let task = distributor
            .create_task("t", "d", NewTaskOptions::default())
            .await
            .unwrap();

        let err = distributor.claim_task(&task.id, "a-1", None).await.unwrap_err();
        assert!(err.is_ineligible());
    }

    #[tokio::test]
    async fn second_claim_reports_conflict() {
        let (distributor, _directory) = harness(vec![
            agent("a-1", Role::Implementer, AgentStatus::Idle),
            agent("a-2", Role::Implementer, AgentStatus::Idle),
        ]);
        let task = distributor
            .create_task("t", "d", NewTaskOptions::default())
            .await
            .unwrap();

        distributor.claim_task(&task.id, "a-1", None).await.unwrap();
        let second = distributor.claim_task(&task.id, "a-2", None).await.unwrap();
        assert!(!second.success);
        assert!(second.conflict.is_some());
    }

    #[tokio::test]
    async fn claiming_a_blocked_task_fails_with_dependencies_pending() {
        let (distributor, _directory) = harness(vec![agent("a-1", Role::Implementer, AgentStatus::Idle)]);
        let dep = distributor
            .create_task("dep", "d", NewTaskOptions::default())
            .await
            .unwrap();
        let mut options = NewTaskOptions::default();
        options.dependencies = vec![dep.id.clone()];
        let blocked = distributor.create_task("blocked", "d", options).await.unwrap();
        assert_eq!(blocked.status, TaskStatus::Blocked);

        let err = distributor
            .claim_task(&blocked.id, "a-1", None)
            .await
            .unwrap_err();
        assert!(err.is_dependencies_pending());
    }

    #[tokio::test]
    async fn dependent_task_unblocks_on_completion() {
        let (distributor, _directory) = harness(vec![agent("a-1", Role::Implementer, AgentStatus::Idle)]);
        let dep = distributor
            .create_task("dep", "d", NewTaskOptions::default())
            .await
            .unwrap();
        let mut options = NewTaskOptions::default();
        options.dependencies = vec![dep.id.clone()];
        let blocked = distributor.create_task("blocked", "d", options).await.unwrap();
        assert_eq!(blocked.status, TaskStatus::Blocked);

        distributor.claim_task(&dep.id, "a-1", None).await.unwrap();
        distributor.start_task(&dep.id, "a-1").await.unwrap();
        distributor.complete_task(&dep.id, "a-1", None).await.unwrap();

        let refreshed = distributor.get_task(&blocked.id).await.unwrap();
        assert_eq!(refreshed.status, TaskStatus::Available);
    }

    #[tokio::test]
    async fn fail_task_retries_then_terminally_fails() {
        let (distributor, _directory) = harness(vec![agent("a-1", Role::Implementer, AgentStatus::Idle)]);
        let mut options = NewTaskOptions::default();
        options.max_retries = Some(1);
        let task = distributor.create_task("t", "d", options).await.unwrap();

        distributor.claim_task(&task.id, "a-1", None).await.unwrap();
        let failed = distributor.fail_task(&task.id, "a-1", "boom").await.unwrap();
        assert_eq!(failed.status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn sweep_releases_expired_claim() {
        let (distributor, directory) = harness(vec![agent("a-1", Role::Implementer, AgentStatus::Idle)]);
        let task = distributor
            .create_task("t", "d", NewTaskOptions::default())
            .await
            .unwrap();
        distributor.claim_task(&task.id, "a-1", None).await.unwrap();
        directory.set_status("a-1", AgentStatus::Busy);

        let future = Utc::now() + chrono::Duration::seconds(CLAIM_TIMEOUT_SECS + 1);
        distributor.sweep(future).await;

        let refreshed = distributor.get_task(&task.id).await.unwrap();
        assert_eq!(refreshed.status, TaskStatus::Available);
    }

    #[tokio::test]
    async fn recommendations_rank_idle_role_matches_highest() {
        let (distributor, _directory) = harness(vec![
            agent("a-1", Role::Implementer, AgentStatus::Idle),
            agent("a-2", Role::Researcher, AgentStatus::Idle),
        ]);
        let mut options = NewTaskOptions::default();
        options.required_role = Some(Role::Implementer);
        options.required_capabilities = vec!["rust".to_string()];
        let task = distributor.create_task("t", "d", options).await.unwrap();

        let recs = distributor.get_assignment_recommendations(&task.id, 5).await;
        assert_eq!(recs[0].agent_id, "a-1");
    }
}
