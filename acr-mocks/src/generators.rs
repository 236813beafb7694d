//! Random test data generators using the `fake` crate, plus `proptest`
//! strategies for property-based tests.

use chrono::Utc;
use fake::faker::lorem::en::{Paragraph, Sentence};
use fake::Fake;
use proptest::prelude::*;
use rand::Rng;

use acr_core::agent::{Agent, AgentStatus, Capability, Role, Surface};
use acr_core::task::{Task, TaskStatus};

use crate::builders::{AgentBuilder, TaskBuilder};

/// Generate a realistic agent id (e.g., "agent-rust-architect-042").
pub fn generate_agent_id() -> String {
    let pool = generate_agent_name();
    let number: u32 = (1..999).fake();
    format!("agent-{pool}-{number:03}")
}

/// Generate a realistic agent name from a pool of coordination-relevant roles.
pub fn generate_agent_name() -> String {
    let names = [
        "rust-architect",
        "protocol-specialist",
        "integration-lead",
        "testing-expert",
        "documentation-specialist",
        "project-finalizer",
        "security-auditor",
        "performance-optimizer",
        "planning-coordinator",
    ];
    names[rand::thread_rng().gen_range(0..names.len())].to_string()
}

pub fn generate_random_role() -> Role {
    let roles = [
        Role::Planner,
        Role::Implementer,
        Role::Auditor,
        Role::Cleaner,
        Role::Researcher,
        Role::Coordinator,
        Role::Specialist,
    ];
    roles[rand::thread_rng().gen_range(0..roles.len())]
}

pub fn generate_random_agent_status() -> AgentStatus {
    let statuses = [
        AgentStatus::Initializing,
        AgentStatus::Active,
        AgentStatus::Busy,
        AgentStatus::Idle,
        AgentStatus::ShuttingDown,
        AgentStatus::Offline,
        AgentStatus::Crashed,
    ];
    statuses[rand::thread_rng().gen_range(0..statuses.len())]
}

pub fn generate_random_surface() -> Surface {
    let surfaces = [
        Surface::Web,
        Surface::Mobile,
        Surface::Desktop,
        Surface::Api,
        Surface::Slack,
        Surface::Cli,
    ];
    surfaces[rand::thread_rng().gen_range(0..surfaces.len())]
}

pub fn generate_random_agent() -> Agent {
    AgentBuilder::new()
        .with_id(generate_agent_id())
        .with_role(generate_random_role())
        .with_status(generate_random_agent_status())
        .with_surface(generate_random_surface())
        .with_capabilities(vec![Capability::new(generate_agent_name(), rand::thread_rng().gen_range(0.0..1.0))])
        .build()
}

/// Generate a realistic task title.
pub fn generate_task_title() -> String {
    Sentence(3..8).fake()
}

/// Generate a realistic task description.
pub fn generate_task_description() -> String {
    Paragraph(2..5).fake()
}

pub fn generate_random_task_status() -> TaskStatus {
    let statuses = [
        TaskStatus::Available,
        TaskStatus::Claimed,
        TaskStatus::InProgress,
        TaskStatus::Blocked,
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ];
    statuses[rand::thread_rng().gen_range(0..statuses.len())]
}

pub fn generate_random_task() -> Task {
    let id: u32 = (1..99999).fake();
    TaskBuilder::new()
        .with_id(format!("task-{id}"))
        .with_title(generate_task_title())
        .with_status(generate_random_task_status())
        .build()
}

/// Configurable agent generator, useful when a test wants several agents
/// sharing a fixed role or capability pool.
pub struct AgentGenerator {
    pub role: Role,
    pub capability_pool: Vec<String>,
}

impl Default for AgentGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentGenerator {
    pub fn new() -> Self {
        Self {
            role: Role::Implementer,
            capability_pool: vec!["rust".to_string(), "testing".to_string()],
        }
    }

    pub fn generate(&self) -> Agent {
        let capability = &self.capability_pool[rand::thread_rng().gen_range(0..self.capability_pool.len())];
        AgentBuilder::new()
            .with_id(generate_agent_id())
            .with_role(self.role)
            .with_capabilities(vec![Capability::new(capability.clone(), 0.7)])
            .build()
    }
}

/// Proptest strategy for generating valid agent roles.
pub fn role_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::Planner),
        Just(Role::Implementer),
        Just(Role::Auditor),
        Just(Role::Cleaner),
        Just(Role::Researcher),
        Just(Role::Coordinator),
        Just(Role::Specialist),
    ]
}

/// Proptest strategy for generating valid agent statuses.
pub fn agent_status_strategy() -> impl Strategy<Value = AgentStatus> {
    prop_oneof![
        Just(AgentStatus::Initializing),
        Just(AgentStatus::Active),
        Just(AgentStatus::Busy),
        Just(AgentStatus::Idle),
        Just(AgentStatus::ShuttingDown),
        Just(AgentStatus::Offline),
        Just(AgentStatus::Crashed),
    ]
}

/// Proptest strategy for generating valid task statuses.
pub fn task_status_strategy() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Available),
        Just(TaskStatus::Claimed),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Blocked),
        Just(TaskStatus::Completed),
        Just(TaskStatus::Failed),
        Just(TaskStatus::Cancelled),
    ]
}

/// Proptest strategy for generating complete agents.
pub fn agent_strategy() -> impl Strategy<Value = Agent> {
    ("[a-z-]{5,20}", role_strategy(), agent_status_strategy()).prop_map(|(id, role, status)| {
        let now = Utc::now();
        Agent {
            id,
            role,
            capabilities: vec![Capability::new("rust", 0.8)],
            status,
            parent: None,
            children: Default::default(),
            surface: Surface::Cli,
            session: "session-prop".to_string(),
            registered_at: now,
            last_heartbeat: now,
            last_activity: now,
            current_task_id: None,
            metadata: Default::default(),
        }
    })
}

/// Proptest strategy for generating complete tasks.
pub fn task_strategy() -> impl Strategy<Value = Task> {
    (
        "[a-z0-9-]{5,20}",
        "[A-Za-z ]{5,50}",
        "[A-Za-z0-9 .,!?]{10,200}",
        task_status_strategy(),
    )
        .prop_map(|(id, title, description, status)| {
            let now = Utc::now();
            Task {
                id,
                title,
                description,
                status,
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
                metadata: Default::default(),
                result: None,
                error: None,
                parent_task_id: None,
                subtask_ids: Vec::new(),
                max_retries: 3,
                retry_count: 0,
            }
        })
}
