use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fixed set of agent specializations used for task eligibility.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Planner,
    Implementer,
    Auditor,
    Cleaner,
    Researcher,
    Coordinator,
    Specialist,
}

/// Liveness and workload status of an agent.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AgentStatus {
    Initializing,
    Active,
    Busy,
    Idle,
    ShuttingDown,
    Offline,
    Crashed,
}

impl AgentStatus {
    /// Statuses a broadcast/discovery query considers "alive" for fan-out
    /// and recommendation purposes.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Active | Self::Busy | Self::Idle)
    }

    /// Terminal statuses the message bus's delivery loop skips entirely.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Offline | Self::Crashed)
    }
}

/// Tag describing where an agent is running.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Surface {
    Web,
    Mobile,
    Desktop,
    Api,
    Slack,
    Cli,
}

/// A named competence an agent can offer, with a proficiency in `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Capability {
    pub name: String,
    pub description: String,
    pub proficiency: f64,
    pub dependencies: Vec<String>,
}

impl Capability {
    pub fn new(name: impl Into<String>, proficiency: f64) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            proficiency: proficiency.clamp(0.0, 1.0),
            dependencies: Vec::new(),
        }
    }
}

/// An autonomous worker identified by a unique opaque string id.
///
/// Parent/child links are identity references only — the registry never
/// takes ownership of a parent or child record through this struct, only a
/// relation (spec §9, "Parent/child graphs").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    pub id: String,
    pub role: Role,
    pub capabilities: Vec<Capability>,
    pub status: AgentStatus,
    pub parent: Option<String>,
    pub children: HashSet<String>,
    pub surface: Surface,
    pub session: String,
    pub registered_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub current_task_id: Option<String>,
    pub metadata: HashMap<String, Value>,
}

impl Agent {
    /// Agent ids present in capability lookups must carry ALL the listed
    /// capability names, per the discovery contract in spec §4.1.
    pub fn has_all_capabilities(&self, names: &[String]) -> bool {
        names
            .iter()
            .all(|name| self.capabilities.iter().any(|c| &c.name == name))
    }

    pub fn capability_proficiency(&self, name: &str) -> Option<f64> {
        self.capabilities
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.proficiency)
    }
}

/// Filter criteria for [`crate::traits::AgentDirectory::discover`]. All
/// fields are optional; specified fields combine with AND semantics.
/// `capabilities` matches the superset pattern used for task eligibility
/// (spec §4.1): an agent must carry every named capability, each at or
/// above `min_proficiency`. An empty vec applies no capability filter.
#[derive(Debug, Clone, Default)]
pub struct AgentFilter {
    pub role: Option<Role>,
    pub status: Option<AgentStatus>,
    pub surface: Option<Surface>,
    pub session: Option<String>,
    pub capabilities: Vec<String>,
    pub min_proficiency: f64,
    pub active_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_agent() -> Agent {
        Agent {
            id: "agent-1".into(),
            role: Role::Implementer,
            capabilities: vec![Capability::new("rust", 0.9), Capability::new("sql", 0.4)],
            status: AgentStatus::Active,
            parent: None,
            children: HashSet::new(),
            surface: Surface::Cli,
            session: "s-1".into(),
            registered_at: Utc::now(),
            last_heartbeat: Utc::now(),
            last_activity: Utc::now(),
            current_task_id: None,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn capability_superset_check() {
        let agent = sample_agent();
        assert!(agent.has_all_capabilities(&["rust".to_string()]));
        assert!(agent.has_all_capabilities(&["rust".to_string(), "sql".to_string()]));
        assert!(!agent.has_all_capabilities(&["rust".to_string(), "go".to_string()]));
    }

    #[test]
    fn status_liveness_classification() {
        assert!(AgentStatus::Active.is_live());
        assert!(AgentStatus::Busy.is_live());
        assert!(AgentStatus::Idle.is_live());
        assert!(!AgentStatus::Offline.is_live());
        assert!(AgentStatus::Offline.is_terminal());
        assert!(AgentStatus::Crashed.is_terminal());
        assert!(!AgentStatus::Active.is_terminal());
    }
}
