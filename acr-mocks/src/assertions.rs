//! Custom assertion helpers and a recording [`EventSink`] for testing.

use std::sync::Arc;

use parking_lot::Mutex;

use acr_core::agent::{Agent, AgentStatus, Role};
use acr_core::events::{AcrEvent, EventSink};
use acr_core::task::{Task, TaskStatus};

/// Assert tasks are equal ignoring timestamps.
pub fn assert_task_equals(actual: &Task, expected: &Task) {
    assert_eq!(actual.id, expected.id, "task ids don't match");
    assert_eq!(actual.title, expected.title, "task titles don't match");
    assert_eq!(actual.description, expected.description, "task descriptions don't match");
    assert_eq!(actual.status, expected.status, "task statuses don't match");
    assert_eq!(actual.claimed_by, expected.claimed_by, "task owners don't match");
}

/// Assert tasks are equal including exact timestamps.
pub fn assert_task_equals_exact(actual: &Task, expected: &Task) {
    assert_eq!(actual, expected, "tasks are not exactly equal");
}

/// Assert a task matches partial criteria.
pub fn assert_task_matches(task: &Task, matcher: &TaskMatcher) {
    if let Some(ref expected_id) = matcher.id {
        assert_eq!(task.id, *expected_id, "task id doesn't match expected");
    }
    if let Some(ref expected_title) = matcher.title {
        assert_eq!(task.title, *expected_title, "task title doesn't match expected");
    }
    if let Some(ref expected_owner) = matcher.claimed_by {
        assert_eq!(task.claimed_by, Some(expected_owner.clone()), "task owner doesn't match expected");
    }
    if let Some(expected_status) = matcher.status {
        assert_eq!(task.status, expected_status, "task status doesn't match expected");
    }
}

/// Assert a task list contains a task with the given id.
pub fn assert_contains_task_with_id(tasks: &[Task], id: &str) {
    assert!(
        tasks.iter().any(|t| t.id == id),
        "expected to find task with id '{}', but it wasn't found. available ids: {:?}",
        id,
        tasks.iter().map(|t| &t.id).collect::<Vec<_>>()
    );
}

/// Assert tasks are sorted by creation date, oldest first.
pub fn assert_tasks_sorted_by_created_at(tasks: &[Task]) {
    for window in tasks.windows(2) {
        assert!(
            window[0].created_at <= window[1].created_at,
            "tasks are not sorted by creation date. task '{}' ({}) comes before '{}' ({})",
            window[0].id,
            window[0].created_at,
            window[1].id,
            window[1].created_at
        );
    }
}

/// Flexible task matcher for partial assertions.
#[derive(Debug, Default)]
pub struct TaskMatcher {
    pub id: Option<String>,
    pub title: Option<String>,
    pub claimed_by: Option<String>,
    pub status: Option<TaskStatus>,
}

impl TaskMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_claimed_by(mut self, agent_id: impl Into<String>) -> Self {
        self.claimed_by = Some(agent_id.into());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// Assert an agent matches partial criteria.
pub fn assert_agent_matches(agent: &Agent, matcher: &AgentMatcher) {
    if let Some(ref expected_id) = matcher.id {
        assert_eq!(agent.id, *expected_id, "agent id doesn't match expected");
    }
    if let Some(expected_role) = matcher.role {
        assert_eq!(agent.role, expected_role, "agent role doesn't match expected");
    }
    if let Some(expected_status) = matcher.status {
        assert_eq!(agent.status, expected_status, "agent status doesn't match expected");
    }
}

/// Flexible agent matcher for partial assertions.
#[derive(Debug, Default)]
pub struct AgentMatcher {
    pub id: Option<String>,
    pub role: Option<Role>,
    pub status: Option<AgentStatus>,
}

impl AgentMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// An [`EventSink`] that records every event for inspection, grounded in the
/// recording sink used by `acr-core`'s own unit tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingEventSink {
    events: Arc<Mutex<Vec<AcrEvent>>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AcrEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: AcrEvent) {
        self.events.lock().push(event);
    }
}

/// Assert that at least one recorded event satisfies `predicate`.
pub fn assert_emitted(sink: &RecordingEventSink, predicate: impl Fn(&AcrEvent) -> bool) {
    let events = sink.events();
    assert!(
        events.iter().any(&predicate),
        "expected sink to have recorded a matching event, got: {events:?}"
    );
}

/// Assert that no recorded event satisfies `predicate`.
pub fn assert_not_emitted(sink: &RecordingEventSink, predicate: impl Fn(&AcrEvent) -> bool) {
    let events = sink.events();
    assert!(
        !events.iter().any(&predicate),
        "expected sink to have no matching event, got: {events:?}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_accumulates_events_in_order() {
        let sink = RecordingEventSink::new();
        sink.emit(AcrEvent::AgentRegistered {
            agent_id: "a-1".to_string(),
        });
        sink.emit(AcrEvent::TaskCreated {
            task_id: "t-1".to_string(),
        });

        assert_eq!(sink.len(), 2);
        assert_emitted(&sink, |e| matches!(e, AcrEvent::TaskCreated { task_id } if task_id == "t-1"));
    }

    #[test]
    fn clear_empties_the_recorded_events() {
        let sink = RecordingEventSink::new();
        sink.emit(AcrEvent::AgentRegistered {
            agent_id: "a-1".to_string(),
        });
        sink.clear();
        assert!(sink.is_empty());
    }
}
