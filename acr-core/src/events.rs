use crate::agent::AgentStatus;
use crate::plan::PlanOperationType;

/// Every event emitted by the runtime's subsystems (spec §6). Sinks are
/// pluggable per [`EventSink`]; the runtime never hard-codes a destination.
#[derive(Debug, Clone, PartialEq)]
pub enum AcrEvent {
    // Registry
    AgentRegistered { agent_id: String },
    AgentUnregistered { agent_id: String },
    AgentStatusChanged {
        agent_id: String,
        old: AgentStatus,
        new: AgentStatus,
    },
    AgentCrashed { agent_id: String },
    HeartbeatMissed { agent_id: String, count: u32 },

    // Message bus
    MessageQueued { message_id: String },
    MessageDelivered { message_id: String },
    MessageExpired { message_id: String },
    DeliveryFailed { message_id: String, reason: String },
    HandlerError { message_id: String, reason: String },

    // Work distributor
    TaskCreated { task_id: String },
    TaskClaimed { task_id: String, agent_id: String },
    TaskStarted { task_id: String },
    TaskCompleted { task_id: String },
    TaskFailed { task_id: String, reason: String },
    TaskRetrying { task_id: String, retry_count: u32 },
    TaskReleased { task_id: String },
    TaskCancelled { task_id: String },
    TaskUnblocked { task_id: String },
    ClaimTimeout { task_id: String },
    ProgressTimeout { task_id: String },

    // Progress tracker
    ProgressReported { task_id: String, percentage: f64 },
    MilestoneCreated { milestone_id: String },
    MilestoneStatusChanged { milestone_id: String },
    RemoteProgressReceived { task_id: String },

    // Plan sync
    PlanCreated { plan_id: String },
    PlanUpdated { plan_id: String },
    ItemAdded { plan_id: String, item_id: String },
    ItemUpdated { plan_id: String, item_id: String },
    ItemDeleted { plan_id: String, item_id: String },
    ItemAssigned { plan_id: String, item_id: String, agent_id: String },
    StatusUpdated { plan_id: String, item_id: String },
    ConflictDetected { plan_id: String },
    OperationRecorded { plan_id: String, op_type: PlanOperationType },
    OperationApplied { plan_id: String, op_type: PlanOperationType },
    PlanRestored { plan_id: String },
}

/// Destination for runtime events. One method, dispatching on the variant,
/// keeps the contract small while still letting callers filter by family if
/// they want (spec §9 "Event emission").
pub trait EventSink: Send + Sync {
    fn emit(&self, event: AcrEvent);
}

/// Discards every event. Useful as a default when no sink is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: AcrEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct RecordingSink {
        events: Arc<Mutex<Vec<AcrEvent>>>,
    }

    impl EventSink for RecordingSink {
        fn emit(&self, event: AcrEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn sink_receives_emitted_events_in_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingSink {
            events: events.clone(),
        };

        sink.emit(AcrEvent::AgentRegistered {
            agent_id: "a-1".into(),
        });
        sink.emit(AcrEvent::TaskCreated {
            task_id: "t-1".into(),
        });

        let recorded = events.lock().unwrap();
        assert_eq!(recorded.len(), 2);
        assert_eq!(
            recorded[0],
            AcrEvent::AgentRegistered {
                agent_id: "a-1".into()
            }
        );
    }

    #[test]
    fn noop_sink_accepts_any_event_without_panicking() {
        NoopEventSink.emit(AcrEvent::PlanRestored {
            plan_id: "p-1".into(),
        });
    }
}
