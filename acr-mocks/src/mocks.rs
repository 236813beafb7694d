//! Mock implementations of the seam traits in `acr_core::traits`, with
//! call-history tracking and error injection, mirroring how a repository
//! double is built for use outside of the concrete registry/bus crates.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use acr_core::agent::{Agent, AgentFilter};
use acr_core::error::{AcrError, Result};
use acr_core::message::Priority;
use acr_core::traits::{AgentCurrentTaskSetter, AgentDirectory, TopicPublisher};

/// In-memory [`AgentDirectory`] double with call-history tracking.
#[derive(Default)]
pub struct MockAgentDirectory {
    agents: Mutex<HashMap<String, Agent>>,
    call_history: Mutex<Vec<String>>,
}

impl MockAgentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agents(agents: Vec<Agent>) -> Self {
        let directory = Self::new();
        {
            let mut table = directory.agents.lock();
            for agent in agents {
                table.insert(agent.id.clone(), agent);
            }
        }
        directory
    }

    pub fn insert(&self, agent: Agent) {
        self.agents.lock().insert(agent.id.clone(), agent);
    }

    pub fn call_history(&self) -> Vec<String> {
        self.call_history.lock().clone()
    }

    pub fn clear_history(&self) {
        self.call_history.lock().clear();
    }

    pub fn assert_called(&self, method: &str) {
        let history = self.call_history();
        assert!(
            history.iter().any(|call| call == method),
            "expected '{method}' to have been called, history: {history:?}"
        );
    }

    fn record_call(&self, method: &str) {
        self.call_history.lock().push(method.to_string());
    }
}

impl AgentDirectory for MockAgentDirectory {
    fn get(&self, agent_id: &str) -> Option<Agent> {
        self.record_call("get");
        self.agents.lock().get(agent_id).cloned()
    }

    fn discover(&self, filter: &AgentFilter) -> Vec<Agent> {
        self.record_call("discover");
        self.agents
            .lock()
            .values()
            .filter(|agent| {
                filter.role.map(|role| agent.role == role).unwrap_or(true)
                    && filter.status.map(|status| agent.status == status).unwrap_or(true)
                    && filter.surface.map(|surface| agent.surface == surface).unwrap_or(true)
                    && filter
                        .session
                        .as_ref()
                        .map(|session| &agent.session == session)
                        .unwrap_or(true)
                    && (filter.capabilities.is_empty()
                        || (agent.has_all_capabilities(&filter.capabilities)
                            && filter.capabilities.iter().all(|name| {
                                agent
                                    .capability_proficiency(name)
                                    .map(|p| p >= filter.min_proficiency)
                                    .unwrap_or(false)
                            })))
                    && (!filter.active_only || agent.status.is_live())
            })
            .cloned()
            .collect()
    }

    fn live_agents(&self) -> Vec<Agent> {
        self.record_call("live_agents");
        self.agents
            .lock()
            .values()
            .filter(|agent| agent.status.is_live())
            .cloned()
            .collect()
    }
}

/// In-memory [`TopicPublisher`] double with call-history tracking and error
/// injection for exercising a dependent subsystem's failure paths.
#[derive(Default)]
pub struct MockTopicPublisher {
    published: Mutex<Vec<(String, String, Value, Priority)>>,
    call_history: Mutex<Vec<String>>,
    error_injection: Mutex<Option<AcrError>>,
    next_id: Mutex<u64>,
}

impl MockTopicPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject_error(&self, error: AcrError) {
        *self.error_injection.lock() = Some(error);
    }

    pub fn clear_error(&self) {
        self.error_injection.lock().take();
    }

    pub fn published(&self) -> Vec<(String, String, Value, Priority)> {
        self.published.lock().clone()
    }

    pub fn call_history(&self) -> Vec<String> {
        self.call_history.lock().clone()
    }

    pub fn assert_called(&self, method: &str) {
        let history = self.call_history();
        assert!(
            history.iter().any(|call| call == method),
            "expected '{method}' to have been called, history: {history:?}"
        );
    }

    fn check_error_injection(&self) -> Result<()> {
        if let Some(error) = self.error_injection.lock().take() {
            return Err(error);
        }
        Ok(())
    }
}

impl TopicPublisher for MockTopicPublisher {
    fn publish(&self, topic: &str, subject: &str, body: Value, priority: Priority) -> Result<String> {
        self.call_history.lock().push("publish".to_string());
        self.check_error_injection()?;

        let mut next_id = self.next_id.lock();
        let id = format!("msg-mock-{next_id}");
        *next_id += 1;

        self.published
            .lock()
            .push((topic.to_string(), subject.to_string(), body, priority));
        Ok(id)
    }
}

/// In-memory [`AgentCurrentTaskSetter`] double recording every assignment.
#[derive(Default)]
pub struct MockAgentCurrentTaskSetter {
    assignments: Mutex<Vec<(String, Option<String>)>>,
    error_injection: Mutex<Option<AcrError>>,
}

impl MockAgentCurrentTaskSetter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject_error(&self, error: AcrError) {
        *self.error_injection.lock() = Some(error);
    }

    pub fn assignments(&self) -> Vec<(String, Option<String>)> {
        self.assignments.lock().clone()
    }
}

#[async_trait]
impl AgentCurrentTaskSetter for MockAgentCurrentTaskSetter {
    async fn set_current_task(&self, agent_id: &str, task_id: Option<String>) -> Result<()> {
        if let Some(error) = self.error_injection.lock().take() {
            return Err(error);
        }
        self.assignments
            .lock()
            .push((agent_id.to_string(), task_id));
        Ok(())
    }
}

pub fn shared_mock_agent_directory() -> Arc<MockAgentDirectory> {
    Arc::new(MockAgentDirectory::new())
}

pub fn shared_mock_topic_publisher() -> Arc<MockTopicPublisher> {
    Arc::new(MockTopicPublisher::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use acr_core::agent::{AgentStatus, Role, Surface};
    use crate::builders::AgentBuilder;

    #[test]
    fn discover_filters_by_role_and_status() {
        let directory = MockAgentDirectory::new();
        directory.insert(
            AgentBuilder::new()
                .with_id("a-1")
                .with_role(Role::Implementer)
                .with_status(AgentStatus::Active)
                .build(),
        );
        directory.insert(
            AgentBuilder::new()
                .with_id("a-2")
                .with_role(Role::Planner)
                .with_status(AgentStatus::Active)
                .build(),
        );

        let filter = AgentFilter {
            role: Some(Role::Implementer),
            ..Default::default()
        };
        let found = directory.discover(&filter);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "a-1");
        directory.assert_called("discover");
    }

    #[test]
    fn injected_error_surfaces_once_then_clears() {
        let publisher = MockTopicPublisher::new();
        publisher.inject_error(AcrError::HandlerError("boom".to_string()));

        let first = publisher.publish("topic", "subject", Value::Null, Priority::Normal);
        assert!(first.is_err());

        let second = publisher.publish("topic", "subject", Value::Null, Priority::Normal);
        assert!(second.is_ok());
    }

    #[test]
    fn live_agents_excludes_terminal_statuses() {
        let directory = MockAgentDirectory::new();
        directory.insert(
            AgentBuilder::new()
                .with_id("a-1")
                .with_status(AgentStatus::Active)
                .with_surface(Surface::Cli)
                .build(),
        );
        directory.insert(
            AgentBuilder::new()
                .with_id("a-2")
                .with_status(AgentStatus::Crashed)
                .build(),
        );

        let live = directory.live_agents();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].id, "a-1");
    }

    #[tokio::test]
    async fn current_task_setter_records_each_assignment() {
        let setter = MockAgentCurrentTaskSetter::new();
        setter
            .set_current_task("agent-1", Some("task-1".to_string()))
            .await
            .unwrap();
        setter.set_current_task("agent-1", None).await.unwrap();

        assert_eq!(
            setter.assignments(),
            vec![
                ("agent-1".to_string(), Some("task-1".to_string())),
                ("agent-1".to_string(), None),
            ]
        );
    }
}
