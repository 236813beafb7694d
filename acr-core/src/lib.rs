//! Agent Coordination Runtime — Core Library
//!
//! This crate provides the domain models, error taxonomy, and seam traits
//! shared by every subsystem of the Agent Coordination Runtime: the agent
//! registry, message bus, work distributor, progress tracker, and CRDT-backed
//! plan sync service. All other crates in this workspace depend on the types
//! defined here.
//!
//! # Architecture
//!
//! - [`agent`] — agent identity, role, capability and status model
//! - [`message`] — message bus domain model (kinds, priority, delivery status)
//! - [`task`] — task lifecycle model and claim/recommendation types
//! - [`progress`] — progress entries, milestones, per-agent stats
//! - [`vector_clock`] — per-node logical clocks for causal comparison
//! - [`crdt`] — LWW-Register and OR-Set state-based CRDT primitives
//! - [`plan`] — CRDT plan item composition, plan and operation-log types
//! - [`events`] — the runtime event taxonomy and pluggable sink trait
//! - [`traits`] — seam traits (`AgentDirectory`, `TopicPublisher`, handlers)
//! - [`error`] — error taxonomy and result handling
//! - [`ids`] — opaque id generation
//!
//! # Example
//!
//! ```rust
//! use acr_core::{
//!     agent::{Capability, Role},
//!     error::AcrError,
//! };
//!
//! let capability = Capability::new("rust", 0.9);
//! assert_eq!(capability.proficiency, 0.9);
//!
//! let role = Role::Implementer;
//! let err = AcrError::not_found("task-1");
//! assert!(err.is_not_found());
//! let _ = role;
//! ```

pub mod agent;
pub mod crdt;
pub mod error;
pub mod events;
pub mod ids;
pub mod message;
pub mod plan;
pub mod progress;
pub mod task;
pub mod traits;
pub mod vector_clock;

// Re-export commonly used types at the crate root for convenience.
pub use agent::{Agent, AgentFilter, AgentStatus, Capability, Role, Surface};
pub use crdt::{LwwRegister, OrSet, Tag};
pub use error::{AcrError, Result, Severity};
pub use events::{AcrEvent, EventSink, NoopEventSink};
pub use ids::generate_id;
pub use message::{Message, MessageHistoryFilter, MessageKind, MessageStatus, Priority};
pub use plan::{
    CrdtPlanItem, Plan, PlainPlanItem, PlanItemPriority, PlanItemStatus, PlanMeta, PlanOperation,
    PlanOperationType, PlanSnapshot,
};
pub use progress::{AgentStats, Milestone, MilestoneStatus, OverallStatus, ProgressEntry, ProgressOptions};
pub use task::{ClaimConflict, ClaimOutcome, NewTaskOptions, Recommendation, Task, TaskFilter, TaskStatus};
pub use traits::{AgentCurrentTaskSetter, AgentDirectory, MessageHandler, RequestHandler, TopicPublisher};
pub use vector_clock::{ClockOrdering, VectorClock};

/// Current version of the core crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Current crate name.
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_constants_are_populated() {
        assert!(!VERSION.is_empty());
        assert_eq!(CRATE_NAME, "acr-core");
    }

    #[test]
    fn re_exports_are_usable_from_the_crate_root() {
        let err = AcrError::not_found("agent-1");
        assert!(err.is_not_found());

        let clock = VectorClock::create("n1");
        assert_eq!(clock.get("n1"), 0);
    }
}
