//! Mock implementations and test data builders for the Agent Coordination
//! Runtime: fluent builders, fixture functions, `fake`/`proptest` generators
//! and a recording event sink.

pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use assertions::{
    assert_agent_matches, assert_contains_task_with_id, assert_emitted, assert_not_emitted,
    assert_task_equals, assert_task_equals_exact, assert_task_matches, assert_tasks_sorted_by_created_at,
    AgentMatcher, RecordingEventSink, TaskMatcher,
};
pub use builders::{AgentBuilder, NewTaskOptionsBuilder, PlanItemBuilder, TaskBuilder};
pub use fixtures::*;
pub use generators::*;
pub use mocks::{MockAgentCurrentTaskSetter, MockAgentDirectory, MockTopicPublisher};
