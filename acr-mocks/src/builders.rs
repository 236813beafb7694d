//! Fluent builders for constructing domain types in tests.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde_json::Value;

use acr_core::agent::{Agent, AgentStatus, Capability, Role, Surface};
use acr_core::plan::{CrdtPlanItem, PlanItemPriority, PlanItemStatus};
use acr_core::task::{NewTaskOptions, Task, TaskStatus};

/// Builder for [`Agent`] instances with sensible defaults.
pub struct AgentBuilder {
    agent: Agent,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            agent: Agent {
                id: "agent-test-001".to_string(),
                role: Role::Implementer,
                capabilities: vec![Capability::new("rust", 0.8)],
                status: AgentStatus::Active,
                parent: None,
                children: HashSet::new(),
                surface: Surface::Cli,
                session: "session-test".to_string(),
                registered_at: now,
                last_heartbeat: now,
                last_activity: now,
                current_task_id: None,
                metadata: HashMap::new(),
            },
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.agent.id = id.into();
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.agent.role = role;
        self
    }

    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.agent.status = status;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Vec<Capability>) -> Self {
        self.agent.capabilities = capabilities;
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.agent.parent = Some(parent.into());
        self
    }

    pub fn with_surface(mut self, surface: Surface) -> Self {
        self.agent.surface = surface;
        self
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.agent.session = session.into();
        self
    }

    pub fn with_current_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.agent.current_task_id = Some(task_id.into());
        self
    }

    pub fn build(self) -> Agent {
        self.agent
    }
}

/// Builder for [`Task`] instances.
pub struct TaskBuilder {
    task: Task,
}

impl Default for TaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskBuilder {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            task: Task {
                id: "task-test-001".to_string(),
                title: "Test task".to_string(),
                description: "A task used in tests".to_string(),
                status: TaskStatus::Available,
                priority: acr_core::message::Priority::Normal,
                required_role: None,
                required_capabilities: Vec::new(),
                dependencies: Vec::new(),
                claimed_by: None,
                claimed_at: None,
                claim_version: 0,
                created_at: now,
                updated_at: now,
                estimated_minutes: None,
                actual_minutes: None,
                started_at: None,
                completed_at: None,
                metadata: HashMap::new(),
                result: None,
                error: None,
                parent_task_id: None,
                subtask_ids: Vec::new(),
                max_retries: 3,
                retry_count: 0,
            },
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.task.id = id.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.task.title = title.into();
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.task.status = status;
        self
    }

    pub fn with_required_role(mut self, role: Role) -> Self {
        self.task.required_role = Some(role);
        self
    }

    pub fn with_required_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.task.required_capabilities = capabilities;
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.task.dependencies = dependencies;
        self
    }

    pub fn with_claimed_by(mut self, agent_id: impl Into<String>) -> Self {
        self.task.claimed_by = Some(agent_id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.task.metadata.insert(key.into(), value);
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

/// Builder for [`NewTaskOptions`], the parameter object `createTask` accepts.
pub struct NewTaskOptionsBuilder {
    options: NewTaskOptions,
}

impl Default for NewTaskOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NewTaskOptionsBuilder {
    pub fn new() -> Self {
        Self {
            options: NewTaskOptions::default(),
        }
    }

    pub fn with_required_role(mut self, role: Role) -> Self {
        self.options.required_role = Some(role);
        self
    }

    pub fn with_required_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.options.required_capabilities = capabilities;
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.options.dependencies = dependencies;
        self
    }

    pub fn with_parent_task_id(mut self, parent_task_id: impl Into<String>) -> Self {
        self.options.parent_task_id = Some(parent_task_id.into());
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.options.max_retries = Some(max_retries);
        self
    }

    pub fn build(self) -> NewTaskOptions {
        self.options
    }
}

/// Builder for [`CrdtPlanItem`]. Every setter performs a local write under a
/// fixed `node_id`, mirroring how a single replica accumulates edits before
/// ever meeting a concurrent write from another node.
pub struct PlanItemBuilder {
    item: CrdtPlanItem,
    node_id: String,
    clock: u64,
}

impl PlanItemBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        let node_id = "N-test".to_string();
        Self {
            item: CrdtPlanItem::new(id, &node_id, Utc::now()),
            node_id,
            clock: 0,
        }
    }

    fn next_ts(&mut self) -> i64 {
        self.clock += 1;
        self.clock as i64
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        let ts = self.next_ts();
        self.item.title.set(title.into(), &self.node_id, ts);
        self
    }

    pub fn with_status(mut self, status: PlanItemStatus) -> Self {
        let ts = self.next_ts();
        self.item.status.set(status, &self.node_id, ts);
        self
    }

    pub fn with_priority(mut self, priority: PlanItemPriority) -> Self {
        let ts = self.next_ts();
        self.item.priority.set(priority, &self.node_id, ts);
        self
    }

    pub fn with_assigned_to(mut self, agent_id: impl Into<String>) -> Self {
        let ts = self.next_ts();
        self.item.assigned_to.set(Some(agent_id.into()), &self.node_id, ts);
        self
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        let ts = self.next_ts();
        self.item.progress.set(progress, &self.node_id, ts);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let ts = self.next_ts();
        self.item.tags.add(tag.into(), self.node_id.clone(), ts);
        self
    }

    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        let ts = self.next_ts();
        self.item.dependencies.add(dependency.into(), self.node_id.clone(), ts);
        self
    }

    pub fn build(self) -> CrdtPlanItem {
        self.item
    }
}
