use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use acr_bus::InMemoryMessageBus;
use acr_core::agent::AgentStatus;
use acr_core::events::{EventSink, NoopEventSink};
use acr_core::message::{MessageHistoryFilter, MessageStatus};
use acr_core::task::{TaskFilter, TaskStatus};
use acr_core::Result;
use acr_plan::InMemoryPlanSync;
use acr_progress::InMemoryProgressTracker;
use acr_registry::contract::HeartbeatResult;
use acr_registry::InMemoryRegistry;
use acr_work::InMemoryWorkDistributor;

/// Composition root: owns one instance of every subsystem store and wires the
/// seam traits (`AgentDirectory`, `AgentCurrentTaskSetter`, `TopicPublisher`)
/// between them in dependency order — vector clock and CRDT primitives sit
/// underneath plan sync with no further wiring; the registry is the shared
/// base both the message bus and work distributor read through; the work
/// distributor and progress tracker publish onto the message bus.
pub struct AcrRuntime {
    pub registry: Arc<InMemoryRegistry>,
    pub bus: Arc<InMemoryMessageBus>,
    pub work: Arc<InMemoryWorkDistributor>,
    pub progress: Arc<InMemoryProgressTracker>,
    pub plan: Arc<InMemoryPlanSync>,
}

impl AcrRuntime {
    /// Builds every subsystem with a shared event sink and the default
    /// in-process wiring. Use [`AcrRuntimeBuilder`] instead for a custom sink
    /// or a non-default plan-sync node id.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        info!("composing agent coordination runtime");
        let registry = Arc::new(InMemoryRegistry::new(sink.clone()));
        let bus = Arc::new(InMemoryMessageBus::new(registry.clone(), sink.clone()));
        let publisher = bus.clone() as Arc<dyn acr_core::traits::TopicPublisher>;
        let work = Arc::new(InMemoryWorkDistributor::new(
            registry.clone(),
            registry.clone(),
            Some(publisher.clone()),
            sink.clone(),
        ));
        let progress = Arc::new(InMemoryProgressTracker::new(Some(publisher), sink.clone()));
        let plan = Arc::new(InMemoryPlanSync::new("local", sink));

        Self {
            registry,
            bus,
            work,
            progress,
            plan,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(Arc::new(NoopEventSink))
    }

    /// Runs the tick-driven maintenance pass for every subsystem that owns
    /// one: registry liveness sweep, message-bus delivery pass, and the task
    /// claim/progress-timeout sweep. The owning process calls this on a
    /// fixed cadence (spec §5, `config::DEFAULT_TICK_MS`).
    pub async fn tick(&self, now: DateTime<Utc>) {
        if let Err(err) = self.registry.sweep(now).await {
            tracing::warn!(error = %err, "registry sweep failed");
        }
        self.bus.process_tick(now).await;
        self.work.sweep(now).await;
    }

    /// Composed heartbeat: delegates to the registry for the liveness
    /// bookkeeping, then fills in `pending_messages`/`pending_tasks` from the
    /// message bus and work distributor (the registry alone always reports
    /// zero for both, since it has no dependency on either crate).
    pub async fn heartbeat(
        &self,
        id: &str,
        status: Option<AgentStatus>,
        current_task_id: Option<Option<String>>,
    ) -> Result<HeartbeatResult> {
        let mut result = self.registry.heartbeat(id, status, current_task_id).await?;
        if !result.accepted {
            return Ok(result);
        }

        let history = self
            .bus
            .get_history(MessageHistoryFilter {
                recipient_id: Some(id.to_string()),
                ..Default::default()
            })
            .await?;
        result.pending_messages = history
            .iter()
            .filter(|message| message.status == MessageStatus::Queued)
            .count() as u32;

        let claimed = self
            .work
            .get_tasks(&TaskFilter {
                claimed_by: Some(id.to_string()),
                ..Default::default()
            })
            .await;
        result.pending_tasks = claimed
            .iter()
            .filter(|task| matches!(task.status, TaskStatus::Claimed | TaskStatus::InProgress))
            .count() as u32;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acr_core::agent::{Capability, Role, Surface};
    use acr_registry::contract::NewAgent;

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
    async fn heartbeat_reports_pending_tasks_from_work_distributor() {
        use acr_core::task::NewTaskOptions;
        use acr_work::WorkDistributorContract;

        let runtime = AcrRuntime::with_defaults();
        runtime.registry.register(new_agent("a-1")).await.unwrap();
        runtime
            .registry
            .update_status("a-1", AgentStatus::Idle)
            .await
            .unwrap();

        let task = runtime
            .work
            .create_task("t", "d", NewTaskOptions::default())
            .await
            .unwrap();
        runtime
            .work
            .claim_task(&task.id, "a-1", None)
            .await
            .unwrap();

        let result = runtime
            .heartbeat("a-1", None, None)
            .await
            .unwrap();
        assert!(result.accepted);
        assert_eq!(result.pending_tasks, 1);
    }

    #[tokio::test]
    async fn heartbeat_from_unknown_agent_is_rejected() {
        let runtime = AcrRuntime::with_defaults();
        let result = runtime.heartbeat("ghost", None, None).await.unwrap();
        assert!(!result.accepted);
    }

    #[tokio::test]
    async fn tick_drives_registry_and_bus_and_work_sweeps_without_panicking() {
        let runtime = AcrRuntime::with_defaults();
        runtime.tick(Utc::now()).await;
    }
}
