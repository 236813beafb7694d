use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;

use acr_core::agent::{Agent, AgentFilter, AgentStatus, Capability, Role, Surface};
use acr_core::error::Result;

/// Result of a `heartbeat` call (spec §4.1). `pending_messages` and
/// `pending_tasks` are always zero here: the registry does not depend on the
/// message bus or work distributor crates, so the runtime facade that
/// composes all subsystems fills those two fields in before returning the
/// response to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct HeartbeatResult {
    pub accepted: bool,
    pub next_heartbeat_ms: u64,
    pub pending_messages: u32,
    pub pending_tasks: u32,
    pub server_time: DateTime<Utc>,
}

impl HeartbeatResult {
    /// Returned for a heartbeat from an id the registry has never seen.
    pub fn rejected(server_time: DateTime<Utc>) -> Self {
        Self {
            accepted: false,
            next_heartbeat_ms: 0,
            pending_messages: 0,
            pending_tasks: 0,
            server_time,
        }
    }
}

/// Registration parameters accepted by `register` (spec §4.1).
#[derive(Debug, Clone)]
pub struct NewAgent {
    pub id: String,
    pub role: Role,
    pub capabilities: Vec<Capability>,
    pub parent: Option<String>,
    pub surface: Surface,
    pub session: String,
    pub metadata: HashMap<String, Value>,
}

/// Agent lifecycle and discovery contract.
///
/// Implementations must be thread-safe and serialize mutations of a single
/// agent record against concurrent callers (spec §5).
#[async_trait]
pub trait RegistryContract: Send + Sync {
    /// Registers a new agent.
    ///
    /// # Errors
    /// * `AcrError::AlreadyRegistered` if `id` is already present in any
    ///   non-offline, non-crashed state.
    async fn register(&self, new_agent: NewAgent) -> Result<Agent>;

    /// Unregisters an agent, transitioning it through `shuttingDown` before
    /// removal, detaching its parent and orphaning its children.
    ///
    /// Returns `false` if the id was not present.
    async fn unregister(&self, id: &str) -> Result<bool>;

    /// Records a liveness signal, resetting the missed-heartbeat counter and
    /// updating `lastActivity`. An unknown id yields a rejected result
    /// rather than an error, per spec §4.1 edge cases.
    async fn heartbeat(
        &self,
        id: &str,
        status: Option<AgentStatus>,
        current_task_id: Option<Option<String>>,
    ) -> Result<HeartbeatResult>;

    /// Atomically sets status, emitting `agentStatusChanged` when it differs
    /// from the prior value.
    async fn update_status(&self, id: &str, status: AgentStatus) -> Result<Agent>;

    /// Couples current-task and status: a non-null task id forces `busy`; a
    /// null task id transitions `busy` to `idle`.
    async fn update_current_task(&self, id: &str, task_id: Option<String>) -> Result<Agent>;

    async fn get(&self, id: &str) -> Result<Agent>;

    async fn discover_peers(&self, filter: AgentFilter) -> Result<Vec<Agent>>;

    async fn find_by_capability(&self, name: &str, min_proficiency: f64) -> Result<Vec<Agent>>;

    async fn find_by_role(&self, role: Role, active_only: bool) -> Result<Vec<Agent>>;

    /// Advances the liveness state machine: increments missed-heartbeat
    /// counters for agents whose interval has elapsed, demotes agents past
    /// the threshold to `offline`, and garbage-collects crashed records past
    /// the retention window. Returns the ids that transitioned.
    async fn sweep(&self, now: DateTime<Utc>) -> Result<Vec<String>>;
}
