//! Standalone fixture functions for common test setups.

use acr_core::agent::{Agent, AgentStatus, Role};
use acr_core::plan::{CrdtPlanItem, PlanItemStatus};
use acr_core::progress::{Milestone, MilestoneStatus, ProgressEntry};
use acr_core::task::{Task, TaskStatus};
use chrono::Utc;

use crate::builders::{AgentBuilder, PlanItemBuilder, TaskBuilder};

pub fn create_test_agent() -> Agent {
    AgentBuilder::new().build()
}

pub fn create_test_agent_with_id(id: impl Into<String>) -> Agent {
    AgentBuilder::new().with_id(id).build()
}

pub fn create_test_agent_with_status(status: AgentStatus) -> Agent {
    AgentBuilder::new().with_status(status).build()
}

pub fn create_test_agents(count: usize) -> Vec<Agent> {
    (0..count)
        .map(|i| AgentBuilder::new().with_id(format!("agent-test-{i:03}")).build())
        .collect()
}

/// One agent per [`AgentStatus`] variant, useful for exercising discovery
/// filters across the full liveness range.
pub fn create_agents_in_all_statuses() -> Vec<Agent> {
    [
        AgentStatus::Initializing,
        AgentStatus::Active,
        AgentStatus::Busy,
        AgentStatus::Idle,
        AgentStatus::ShuttingDown,
        AgentStatus::Offline,
        AgentStatus::Crashed,
    ]
    .into_iter()
    .enumerate()
    .map(|(i, status)| {
        AgentBuilder::new()
            .with_id(format!("agent-status-{i}"))
            .with_status(status)
            .build()
    })
    .collect()
}

pub fn create_test_task() -> Task {
    TaskBuilder::new().build()
}

pub fn create_test_task_with_id(id: impl Into<String>) -> Task {
    TaskBuilder::new().with_id(id).build()
}

pub fn create_test_task_with_status(status: TaskStatus) -> Task {
    TaskBuilder::new().with_status(status).build()
}

pub fn create_test_task_with_role(role: Role) -> Task {
    TaskBuilder::new().with_required_role(role).build()
}

pub fn create_test_tasks(count: usize) -> Vec<Task> {
    (0..count)
        .map(|i| TaskBuilder::new().with_id(format!("task-test-{i:03}")).build())
        .collect()
}

/// One task per [`TaskStatus`] variant.
pub fn create_tasks_in_all_statuses() -> Vec<Task> {
    [
        TaskStatus::Available,
        TaskStatus::Claimed,
        TaskStatus::InProgress,
        TaskStatus::Blocked,
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ]
    .into_iter()
    .enumerate()
    .map(|(i, status)| {
        TaskBuilder::new()
            .with_id(format!("task-status-{i}"))
            .with_status(status)
            .build()
    })
    .collect()
}

pub fn create_test_plan_item(id: impl Into<String>) -> CrdtPlanItem {
    PlanItemBuilder::new(id).with_title("Test item").build()
}

pub fn create_test_plan_item_with_status(id: impl Into<String>, status: PlanItemStatus) -> CrdtPlanItem {
    PlanItemBuilder::new(id)
        .with_title("Test item")
        .with_status(status)
        .build()
}

pub fn create_test_progress_entry(task_id: impl Into<String>, agent_id: impl Into<String>) -> ProgressEntry {
    ProgressEntry {
        id: "progress-test-001".to_string(),
        task_id: task_id.into(),
        agent_id: agent_id.into(),
        percentage: 50.0,
        status: "in progress".to_string(),
        message: "making progress".to_string(),
        details: None,
        timestamp: Utc::now(),
        time_spent_minutes: Some(10),
        estimated_remaining_minutes: Some(10),
        blockers: None,
        metadata: Default::default(),
    }
}

pub fn create_test_milestone(id: impl Into<String>) -> Milestone {
    let now = Utc::now();
    Milestone {
        id: id.into(),
        name: "Test milestone".to_string(),
        description: "A milestone used in tests".to_string(),
        status: MilestoneStatus::Pending,
        target_date: None,
        completed_date: None,
        required_task_ids: Vec::new(),
        progress: 0.0,
        parent_milestone_id: None,
        child_milestone_ids: Vec::new(),
        created_at: now,
        updated_at: now,
        owner: None,
        tags: Vec::new(),
    }
}
