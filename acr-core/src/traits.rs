use async_trait::async_trait;

use crate::agent::{Agent, AgentFilter};
use crate::error::Result;
use crate::message::{Message, MessageKind, Priority};
use serde_json::Value;

/// Read-only view onto the agent registry that other subsystems depend on
/// instead of the concrete registry crate. This is the seam that lets the
/// work distributor check eligibility and the message bus resolve live
/// recipients without a hard dependency on the registry's implementation.
pub trait AgentDirectory: Send + Sync {
    fn get(&self, agent_id: &str) -> Option<Agent>;

    fn discover(&self, filter: &AgentFilter) -> Vec<Agent>;

    /// Agents eligible as fan-out targets for a broadcast: live and not
    /// crashed (spec §5 "a broadcast is logically atomic").
    fn live_agents(&self) -> Vec<Agent>;
}

/// Narrow publishing seam used by subsystems that only need to *emit* a
/// topic message (e.g. the progress tracker publishing milestone updates)
/// without depending on the full message-bus contract.
pub trait TopicPublisher: Send + Sync {
    fn publish(
        &self,
        topic: &str,
        subject: &str,
        body: Value,
        priority: Priority,
    ) -> Result<String>;
}

/// Handler invoked for a direct/broadcast/topic delivery. Mirrors the
/// "interface abstraction" guidance in spec §9 for handler capabilities.
pub trait MessageHandler: Send + Sync {
    fn handle(&self, message: &Message) -> Result<()>;
}

/// Handler invoked for a `request` message; must produce the response body.
pub trait RequestHandler: Send + Sync {
    fn handle(&self, message: &Message) -> Result<Value>;
}

/// Marker helper shared by handler registration call sites that need to
/// assert a message actually is of the kind they subscribed to.
pub fn matches_kind(message: &Message, kind: MessageKind) -> bool {
    message.kind == kind
}

/// Write seam the work distributor uses to couple a claim/release with the
/// claimant's `currentTaskId` (spec §4.1 "current-task coupling", §5
/// "cross-object invariants must hold jointly") without depending on the
/// concrete registry crate.
#[async_trait]
pub trait AgentCurrentTaskSetter: Send + Sync {
    async fn set_current_task(&self, agent_id: &str, task_id: Option<String>) -> Result<()>;
}
