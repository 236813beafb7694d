use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use acr_core::agent::{Agent, AgentFilter, AgentStatus, Role, Surface};
use acr_core::error::{AcrError, Result};
use acr_core::events::{AcrEvent, EventSink, NoopEventSink};
use acr_core::traits::AgentDirectory;

use crate::config::{CRASHED_RETENTION_SECS, HEARTBEAT_INTERVAL_SECS, MISSED_HEARTBEAT_THRESHOLD};
use crate::contract::{HeartbeatResult, NewAgent, RegistryContract};

struct AgentRecord {
    agent: Agent,
    missed_heartbeats: u32,
    crashed_at: Option<DateTime<Utc>>,
}

/// In-process agent directory. A single table-wide lock is used rather than
/// per-agent locks: discovery queries scan the whole table anyway, and the
/// critical sections here are short, non-blocking map operations (spec §5
/// permits any serialization scheme that is logically single-writer per
/// object).
pub struct InMemoryRegistry {
    agents: RwLock<HashMap<String, AgentRecord>>,
    sink: Arc<dyn EventSink>,
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new(Arc::new(NoopEventSink))
    }
}

impl InMemoryRegistry {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        info!("initializing in-memory agent registry");
        Self {
            agents: RwLock::new(HashMap::new()),
            sink,
        }
    }

    fn emit(&self, event: AcrEvent) {
        self.sink.emit(event);
    }

    fn matches(record: &AgentRecord, filter: &AgentFilter) -> bool {
        let agent = &record.agent;
        if let Some(role) = filter.role {
            if agent.role != role {
                return false;
            }
        }
        if let Some(status) = filter.status {
            if agent.status != status {
                return false;
            }
        }
        if let Some(surface) = filter.surface {
            if agent.surface != surface {
                return false;
            }
        }
        if let Some(session) = &filter.session {
            if &agent.session != session {
                return false;
            }
        }
        if filter.active_only && !agent.status.is_live() {
            return false;
        }
        if !filter.capabilities.is_empty() {
            if !agent.has_all_capabilities(&filter.capabilities) {
                return false;
            }
            let meets_proficiency = filter
                .capabilities
                .iter()
                .all(|name| agent.capability_proficiency(name).map(|p| p >= filter.min_proficiency).unwrap_or(false));
            if !meets_proficiency {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl RegistryContract for InMemoryRegistry {
    async fn register(&self, new_agent: NewAgent) -> Result<Agent> {
        let mut table = self.agents.write();
        if let Some(existing) = table.get(&new_agent.id) {
            if !existing.agent.status.is_terminal() {
                return Err(AcrError::AlreadyRegistered(new_agent.id));
            }
        }

        let now = Utc::now();
        let agent = Agent {
            id: new_agent.id.clone(),
            role: new_agent.role,
            capabilities: new_agent.capabilities,
            status: AgentStatus::Initializing,
            parent: new_agent.parent.clone(),
            children: Default::default(),
            surface: new_agent.surface,
            session: new_agent.session,
            registered_at: now,
            last_heartbeat: now,
            last_activity: now,
            current_task_id: None,
            metadata: new_agent.metadata,
        };

        if let Some(parent_id) = &new_agent.parent {
            if let Some(parent) = table.get_mut(parent_id) {
                parent.agent.children.insert(new_agent.id.clone());
            }
        }

        table.insert(
            new_agent.id.clone(),
            AgentRecord {
                agent: agent.clone(),
                missed_heartbeats: 0,
                crashed_at: None,
            },
        );
        drop(table);

        self.emit(AcrEvent::AgentRegistered {
            agent_id: agent.id.clone(),
        });
        Ok(agent)
    }

    async fn unregister(&self, id: &str) -> Result<bool> {
        let mut table = self.agents.write();
        let Some(record) = table.get_mut(id) else {
            return Ok(false);
        };
        record.agent.status = AgentStatus::ShuttingDown;

        let parent = record.agent.parent.clone();
        let children: Vec<String> = record.agent.children.iter().cloned().collect();

        if let Some(parent_id) = parent {
            if let Some(parent_record) = table.get_mut(&parent_id) {
                parent_record.agent.children.remove(id);
            }
        }
        for child_id in children {
            if let Some(child_record) = table.get_mut(&child_id) {
                child_record.agent.parent = None;
            }
        }

        table.remove(id);
        drop(table);

        self.emit(AcrEvent::AgentUnregistered {
            agent_id: id.to_string(),
        });
        Ok(true)
    }

    async fn heartbeat(
        &self,
        id: &str,
        status: Option<AgentStatus>,
        current_task_id: Option<Option<String>>,
    ) -> Result<HeartbeatResult> {
        let now = Utc::now();
        let mut table = self.agents.write();
        let Some(record) = table.get_mut(id) else {
            return Ok(HeartbeatResult::rejected(now));
        };

        record.missed_heartbeats = 0;
        record.agent.last_heartbeat = now;
        record.agent.last_activity = now;

        if let Some(task_id) = current_task_id {
            record.agent.current_task_id = task_id;
        }

        if let Some(new_status) = status {
            let old_status = record.agent.status;
            if old_status != new_status {
                record.agent.status = new_status;
                drop(table);
                self.emit(AcrEvent::AgentStatusChanged {
                    agent_id: id.to_string(),
                    old: old_status,
                    new: new_status,
                });
                return Ok(HeartbeatResult {
                    accepted: true,
                    next_heartbeat_ms: (HEARTBEAT_INTERVAL_SECS * 1000) as u64,
                    pending_messages: 0,
                    pending_tasks: 0,
                    server_time: now,
                });
            }
        }

        Ok(HeartbeatResult {
            accepted: true,
            next_heartbeat_ms: (HEARTBEAT_INTERVAL_SECS * 1000) as u64,
            pending_messages: 0,
            pending_tasks: 0,
            server_time: now,
        })
    }

    async fn update_status(&self, id: &str, status: AgentStatus) -> Result<Agent> {
        let mut table = self.agents.write();
        let record = table
            .get_mut(id)
            .ok_or_else(|| AcrError::not_found(id.to_string()))?;

        let old_status = record.agent.status;
        if old_status == status {
            return Ok(record.agent.clone());
        }
        record.agent.status = status;
        if status == AgentStatus::Crashed {
            record.crashed_at = Some(Utc::now());
        }
        let agent = record.agent.clone();
        drop(table);

        self.emit(AcrEvent::AgentStatusChanged {
            agent_id: id.to_string(),
            old: old_status,
            new: status,
        });
        if status == AgentStatus::Crashed {
            self.emit(AcrEvent::AgentCrashed {
                agent_id: id.to_string(),
            });
        }
        Ok(agent)
    }

    async fn update_current_task(&self, id: &str, task_id: Option<String>) -> Result<Agent> {
        let mut table = self.agents.write();
        let record = table
            .get_mut(id)
            .ok_or_else(|| AcrError::not_found(id.to_string()))?;

        let old_status = record.agent.status;
        record.agent.current_task_id = task_id.clone();
        record.agent.status = match (&task_id, old_status) {
            (Some(_), _) => AgentStatus::Busy,
            (None, AgentStatus::Busy) => AgentStatus::Idle,
            (None, other) => other,
        };
        let new_status = record.agent.status;
        let agent = record.agent.clone();
        drop(table);

        if old_status != new_status {
            self.emit(AcrEvent::AgentStatusChanged {
                agent_id: id.to_string(),
                old: old_status,
                new: new_status,
            });
        }
        Ok(agent)
    }

    async fn get(&self, id: &str) -> Result<Agent> {
        self.agents
            .read()
            .get(id)
            .map(|record| record.agent.clone())
            .ok_or_else(|| AcrError::not_found(id.to_string()))
    }

    async fn discover_peers(&self, filter: AgentFilter) -> Result<Vec<Agent>> {
        let table = self.agents.read();
        let mut agents: Vec<Agent> = table
            .values()
            .filter(|record| Self::matches(record, &filter))
            .map(|record| record.agent.clone())
            .collect();
        agents.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        Ok(agents)
    }

    async fn find_by_capability(&self, name: &str, min_proficiency: f64) -> Result<Vec<Agent>> {
        let filter = AgentFilter {
            capabilities: vec![name.to_string()],
            min_proficiency,
            ..Default::default()
        };
        self.discover_peers(filter).await
    }

    async fn find_by_role(&self, role: Role, active_only: bool) -> Result<Vec<Agent>> {
        let filter = AgentFilter {
            role: Some(role),
            active_only,
            ..Default::default()
        };
        self.discover_peers(filter).await
    }

    async fn sweep(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let mut transitioned = Vec::new();
        let mut table = self.agents.write();
        let mut to_remove = Vec::new();

        for (id, record) in table.iter_mut() {
            if record.agent.status.is_terminal() {
                if record.agent.status == AgentStatus::Crashed {
                    if let Some(crashed_at) = record.crashed_at {
                        if (now - crashed_at).num_seconds() >= CRASHED_RETENTION_SECS {
                            to_remove.push(id.clone());
                        }
                    }
                }
                continue;
            }

            let elapsed = (now - record.agent.last_heartbeat).num_seconds();
            let expected_misses = (elapsed / HEARTBEAT_INTERVAL_SECS).max(0) as u32;
            if expected_misses > record.missed_heartbeats {
                record.missed_heartbeats = expected_misses;
                debug!(agent_id = %id, missed = record.missed_heartbeats, "missed heartbeat");
                transitioned.push(id.clone());

                if record.missed_heartbeats >= MISSED_HEARTBEAT_THRESHOLD {
                    let old_status = record.agent.status;
                    record.agent.status = AgentStatus::Offline;
                    warn!(agent_id = %id, "agent transitioned to offline after missed heartbeats");
                    self.emit(AcrEvent::AgentStatusChanged {
                        agent_id: id.clone(),
                        old: old_status,
                        new: AgentStatus::Offline,
                    });
                } else {
                    self.emit(AcrEvent::HeartbeatMissed {
                        agent_id: id.clone(),
                        count: record.missed_heartbeats,
                    });
                }
            }
        }

        for id in &to_remove {
            table.remove(id);
        }
        drop(table);

        Ok(transitioned)
    }
}

#[async_trait]
impl acr_core::traits::AgentCurrentTaskSetter for InMemoryRegistry {
    async fn set_current_task(&self, agent_id: &str, task_id: Option<String>) -> Result<()> {
        self.update_current_task(agent_id, task_id).await?;
        Ok(())
    }
}

impl AgentDirectory for InMemoryRegistry {
    fn get(&self, agent_id: &str) -> Option<Agent> {
        self.agents
            .read()
            .get(agent_id)
            .map(|record| record.agent.clone())
    }

    fn discover(&self, filter: &AgentFilter) -> Vec<Agent> {
        let table = self.agents.read();
        let mut agents: Vec<Agent> = table
            .values()
            .filter(|record| Self::matches(record, filter))
            .map(|record| record.agent.clone())
            .collect();
        agents.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        agents
    }

    fn live_agents(&self) -> Vec<Agent> {
        self.agents
            .read()
            .values()
            .filter(|record| record.agent.status.is_live())
            .map(|record| record.agent.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acr_core::agent::Capability;

    fn new_agent(id: &str) -> NewAgent {
        NewAgent {
            id: id.to_string(),
            role: Role::Implementer,
            capabilities: vec![Capability::new("rust", 0.9)],
            parent: None,
            surface: Surface::Cli,
            session: "s-1".to_string(),
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn register_rejects_duplicate_active_id() {
        let registry = InMemoryRegistry::default();
        registry.register(new_agent("a-1")).await.unwrap();
        let err = registry.register(new_agent("a-1")).await.unwrap_err();
        assert!(matches!(err, AcrError::AlreadyRegistered(_)));
    }

    #[tokio::test]
    async fn register_reuses_slot_after_offline() {
        let registry = InMemoryRegistry::default();
        registry.register(new_agent("a-1")).await.unwrap();
        registry
            .update_status("a-1", AgentStatus::Offline)
            .await
            .unwrap();
        let agent = registry.register(new_agent("a-1")).await.unwrap();
        assert_eq!(agent.status, AgentStatus::Initializing);
    }

    #[tokio::test]
    async fn unregister_orphans_children_and_detaches_parent() {
        let registry = InMemoryRegistry::default();
        registry.register(new_agent("parent")).await.unwrap();
        let mut child = new_agent("child");
        child.parent = Some("parent".to_string());
        registry.register(child).await.unwrap();

        registry.unregister("parent").await.unwrap();
        let child_agent = registry.get("child").await.unwrap();
        assert!(child_agent.parent.is_none());
    }

    #[tokio::test]
    async fn update_current_task_couples_status() {
        let registry = InMemoryRegistry::default();
        registry.register(new_agent("a-1")).await.unwrap();

        let busy = registry
            .update_current_task("a-1", Some("t-1".to_string()))
            .await
            .unwrap();
        assert_eq!(busy.status, AgentStatus::Busy);

        let idle = registry.update_current_task("a-1", None).await.unwrap();
        assert_eq!(idle.status, AgentStatus::Idle);
    }

    #[tokio::test]
    async fn heartbeat_from_unknown_id_is_rejected() {
        let registry = InMemoryRegistry::default();
        let result = registry
            .heartbeat("ghost", None, None)
            .await
            .unwrap();
        assert!(!result.accepted);
    }

    #[tokio::test]
    async fn sweep_transitions_to_offline_after_threshold_misses() {
        let registry = InMemoryRegistry::default();
        registry.register(new_agent("a-1")).await.unwrap();
        registry
            .update_status("a-1", AgentStatus::Active)
            .await
            .unwrap();

        let start = registry.get("a-1").await.unwrap().last_heartbeat;
        let past_two_intervals = start + chrono::Duration::seconds(2 * HEARTBEAT_INTERVAL_SECS);
        registry.sweep(past_two_intervals).await.unwrap();
        assert_eq!(registry.get("a-1").await.unwrap().status, AgentStatus::Active);

        let past_three_intervals = start + chrono::Duration::seconds(3 * HEARTBEAT_INTERVAL_SECS);
        registry.sweep(past_three_intervals).await.unwrap();
        assert_eq!(registry.get("a-1").await.unwrap().status, AgentStatus::Offline);
    }

    #[tokio::test]
    async fn discover_peers_orders_by_last_activity_descending() {
        let registry = InMemoryRegistry::default();
        registry.register(new_agent("a-1")).await.unwrap();
        registry.register(new_agent("a-2")).await.unwrap();
        registry
            .heartbeat("a-1", None, None)
            .await
            .unwrap();

        let agents = registry.discover_peers(AgentFilter::default()).await.unwrap();
        assert_eq!(agents[0].id, "a-1");
    }
}
