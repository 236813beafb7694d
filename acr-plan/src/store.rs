use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use acr_core::error::{AcrError, Result};
use acr_core::events::{AcrEvent, EventSink, NoopEventSink};
use acr_core::plan::{
    CrdtPlanItem, Plan, PlainPlanItem, PlanItemPriority, PlanItemStatus, PlanMeta, PlanOperation, PlanOperationType,
    PlanSnapshot,
};
use acr_core::vector_clock::{ClockOrdering, VectorClock};

use crate::config::{DEFAULT_NODE_ID, MAX_PENDING_OPERATIONS};
use crate::contract::{ItemPatch, NewItemOptions, PlanPatch, PlanSyncContract, PlanSyncStats};

struct PlanRecord {
    plan: Plan,
    operations: VecDeque<PlanOperation>,
    stats: PlanSyncStats,
}

/// In-process plan store. One table-wide lock guards every plan; CRDT merges
/// themselves are pure value computations so the critical section never
/// blocks on anything but map access, same rationale as the rest of the
/// runtime's in-memory subsystems.
pub struct InMemoryPlanSync {
    plans: RwLock<HashMap<String, PlanRecord>>,
    node_id: String,
    sink: Arc<dyn EventSink>,
}

#[derive(Deserialize)]
struct CreatePlanPayload {
    name: String,
    description: String,
    owner: Option<String>,
}

#[derive(Deserialize)]
struct UpdatePlanPayload {
    name: Option<String>,
    description: Option<String>,
    current_phase: Option<String>,
    total_phases: Option<u32>,
    collaborators: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct AddItemPayload {
    title: String,
    description: String,
    priority: Option<PlanItemPriority>,
    assigned_to: Option<String>,
    parent_id: Option<String>,
    estimated_minutes: Option<i64>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Deserialize, Default)]
struct UpdateItemPayload {
    title: Option<String>,
    description: Option<String>,
    priority: Option<PlanItemPriority>,
    estimated_minutes: Option<i64>,
    #[serde(default)]
    add_tags: Vec<String>,
    #[serde(default)]
    remove_tags: Vec<String>,
    #[serde(default)]
    add_notes: Vec<String>,
    #[serde(default)]
    add_dependencies: Vec<String>,
    #[serde(default)]
    remove_dependencies: Vec<String>,
}

#[derive(Deserialize)]
struct UpdateItemStatusPayload {
    status: PlanItemStatus,
    progress: Option<f64>,
}

#[derive(Deserialize)]
struct AssignItemPayload {
    agent_id: Option<String>,
}

impl InMemoryPlanSync {
    pub fn new(node_id: impl Into<String>, sink: Arc<dyn EventSink>) -> Self {
        info!("initializing in-memory plan sync service");
        Self {
            plans: RwLock::new(HashMap::new()),
            node_id: node_id.into(),
            sink,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_NODE_ID, Arc::new(NoopEventSink))
    }

    fn emit(&self, event: AcrEvent) {
        self.sink.emit(event);
    }

    fn record_operation(
        &self,
        record: &mut PlanRecord,
        op_type: PlanOperationType,
        item_id: Option<String>,
        payload: Value,
    ) -> VectorClock {
        record.plan.vector_clock.increment(&self.node_id);
        let clock = record.plan.vector_clock.clone();
        let op = PlanOperation {
            id: acr_core::generate_id("planop"),
            plan_id: record.plan.id.clone(),
            op_type,
            item_id,
            payload,
            source_node: self.node_id.clone(),
            timestamp: Utc::now(),
            vector_clock: clock.clone(),
        };
        record.operations.push_back(op);
        while record.operations.len() > MAX_PENDING_OPERATIONS {
            record.operations.pop_front();
        }
        self.emit(AcrEvent::OperationRecorded {
            plan_id: record.plan.id.clone(),
            op_type,
        });
        record.plan.version += 1;
        record.plan.updated_at = Utc::now();
        clock
    }

    fn snapshot_of(plan: &Plan) -> PlanSnapshot {
        let mut items: Vec<PlainPlanItem> = plan.items.values().map(CrdtPlanItem::to_plain_item).collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        PlanSnapshot {
            plan: PlanMeta {
                id: plan.id.clone(),
                name: plan.name.clone(),
                description: plan.description.clone(),
                owner: plan.owner.clone(),
                collaborators: plan.collaborators.clone(),
                current_phase: plan.current_phase.clone(),
                total_phases: plan.total_phases,
                overall_progress: plan.overall_progress,
                created_at: plan.created_at,
                updated_at: plan.updated_at,
                vector_clock: plan.vector_clock.clone(),
                version: plan.version,
            },
            items,
        }
    }

    /// Inserts a new item under `id`. The caller supplies `id` rather than
    /// this function generating one, so that replaying a remote `AddItem`
    /// operation can key the item under the id the origin node already
    /// assigned (`op.item_id`) instead of minting a fresh random one.
    fn apply_create_item(plan: &mut Plan, id: String, node_id: &str, now_millis: i64, payload: &AddItemPayload) -> String {
        let mut item = CrdtPlanItem::new(id.clone(), node_id, Utc::now());
        item.title.set(payload.title.clone(), node_id, now_millis);
        item.description.set(payload.description.clone(), node_id, now_millis);
        if let Some(priority) = payload.priority {
            item.priority.set(priority, node_id, now_millis);
        }
        if payload.assigned_to.is_some() {
            item.assigned_to.set(payload.assigned_to.clone(), node_id, now_millis);
        }
        if payload.parent_id.is_some() {
            item.parent_id.set(payload.parent_id.clone(), node_id, now_millis);
        }
        if payload.estimated_minutes.is_some() {
            item.estimated_minutes.set(payload.estimated_minutes, node_id, now_millis);
        }
        for dep in &payload.dependencies {
            item.dependencies.add(dep.clone(), node_id, now_millis);
        }
        for tag in &payload.tags {
            item.tags.add(tag.clone(), node_id, now_millis);
        }

        if let Some(parent_id) = &payload.parent_id {
            if let Some(parent) = plan.items.get_mut(parent_id) {
                parent.subtask_ids.add(id.clone(), node_id, now_millis);
            }
        }
        plan.items.insert(id.clone(), item);
        id
    }

    fn apply_update_item(item: &mut CrdtPlanItem, node_id: &str, now_millis: i64, payload: &UpdateItemPayload) {
        if let Some(title) = &payload.title {
            item.title.set(title.clone(), node_id, now_millis);
        }
        if let Some(description) = &payload.description {
            item.description.set(description.clone(), node_id, now_millis);
        }
        if let Some(priority) = payload.priority {
            item.priority.set(priority, node_id, now_millis);
        }
        if payload.estimated_minutes.is_some() {
            item.estimated_minutes.set(payload.estimated_minutes, node_id, now_millis);
        }
        for tag in &payload.add_tags {
            item.tags.add(tag.clone(), node_id, now_millis);
        }
        for tag in &payload.remove_tags {
            item.tags.remove(tag, node_id, now_millis);
        }
        for note in &payload.add_notes {
            item.notes.add(note.clone(), node_id, now_millis);
        }
        for dep in &payload.add_dependencies {
            item.dependencies.add(dep.clone(), node_id, now_millis);
        }
        for dep in &payload.remove_dependencies {
            item.dependencies.remove(dep, node_id, now_millis);
        }
    }

    fn derive_progress(plan: &mut Plan) {
        plan.overall_progress = plan.derive_overall_progress();
    }
}

#[async_trait]
impl PlanSyncContract for InMemoryPlanSync {
    async fn create_plan(&self, name: &str, description: &str, owner: Option<String>) -> Result<PlanSnapshot> {
        let now = Utc::now();
        let id = acr_core::generate_id("plan");
        let plan = Plan {
            id: id.clone(),
            name: name.to_string(),
            description: description.to_string(),
            items: HashMap::new(),
            owner: owner.clone(),
            collaborators: Vec::new(),
            current_phase: None,
            total_phases: None,
            overall_progress: 0.0,
            created_at: now,
            updated_at: now,
            vector_clock: VectorClock::create(&self.node_id),
            version: 0,
        };

        let mut record = PlanRecord {
            plan,
            operations: VecDeque::new(),
            stats: PlanSyncStats::default(),
        };
        self.record_operation(
            &mut record,
            PlanOperationType::CreatePlan,
            None,
            json!({ "name": name, "description": description, "owner": owner }),
        );
        let snapshot = Self::snapshot_of(&record.plan);

        self.plans.write().insert(id.clone(), record);
        info!(plan_id = %id, "plan created");
        self.emit(AcrEvent::PlanCreated { plan_id: id });
        Ok(snapshot)
    }

    async fn update_plan(&self, plan_id: &str, patch: PlanPatch) -> Result<PlanSnapshot> {
        let mut table = self.plans.write();
        let record = table.get_mut(plan_id).ok_or_else(|| AcrError::not_found(plan_id))?;

        if let Some(name) = &patch.name {
            record.plan.name = name.clone();
        }
        if let Some(description) = &patch.description {
            record.plan.description = description.clone();
        }
        if let Some(phase) = &patch.current_phase {
            record.plan.current_phase = Some(phase.clone());
        }
        if let Some(total) = patch.total_phases {
            record.plan.total_phases = Some(total);
        }
        if let Some(collaborators) = &patch.collaborators {
            record.plan.collaborators = collaborators.clone();
        }

        self.record_operation(
            record,
            PlanOperationType::UpdatePlan,
            None,
            json!({
                "name": patch.name,
                "description": patch.description,
                "currentPhase": patch.current_phase,
                "totalPhases": patch.total_phases,
                "collaborators": patch.collaborators,
            }),
        );
        let snapshot = Self::snapshot_of(&record.plan);
        self.emit(AcrEvent::PlanUpdated { plan_id: plan_id.to_string() });
        Ok(snapshot)
    }

    async fn add_item(&self, plan_id: &str, title: &str, description: &str, options: NewItemOptions) -> Result<PlainPlanItem> {
        let mut table = self.plans.write();
        let record = table.get_mut(plan_id).ok_or_else(|| AcrError::not_found(plan_id))?;

        let now_millis = Utc::now().timestamp_millis();
        let payload = AddItemPayload {
            title: title.to_string(),
            description: description.to_string(),
            priority: options.priority,
            assigned_to: options.assigned_to.clone(),
            parent_id: options.parent_id.clone(),
            estimated_minutes: options.estimated_minutes,
            dependencies: options.dependencies.clone(),
            tags: options.tags.clone(),
        };
        let new_id = acr_core::generate_id("item");
        let item_id = Self::apply_create_item(&mut record.plan, new_id, &self.node_id, now_millis, &payload);
        Self::derive_progress(&mut record.plan);

        let payload_json = json!({
            "title": payload.title,
            "description": payload.description,
            "priority": payload.priority,
            "assignedTo": payload.assigned_to,
            "parentId": payload.parent_id,
            "estimatedMinutes": payload.estimated_minutes,
            "dependencies": payload.dependencies,
            "tags": payload.tags,
        });
        self.record_operation(record, PlanOperationType::AddItem, Some(item_id.clone()), payload_json);

        let plain = record.plan.items.get(&item_id).unwrap().to_plain_item();
        info!(plan_id, item_id = %item_id, "plan item added");
        self.emit(AcrEvent::ItemAdded {
            plan_id: plan_id.to_string(),
            item_id,
        });
        Ok(plain)
    }

    async fn update_item(&self, plan_id: &str, item_id: &str, patch: ItemPatch) -> Result<PlainPlanItem> {
        let mut table = self.plans.write();
        let record = table.get_mut(plan_id).ok_or_else(|| AcrError::not_found(plan_id))?;

        let now_millis = Utc::now().timestamp_millis();
        let payload = UpdateItemPayload {
            title: patch.title.clone(),
            description: patch.description.clone(),
            priority: patch.priority,
            estimated_minutes: patch.estimated_minutes,
            add_tags: patch.add_tags.clone(),
            remove_tags: patch.remove_tags.clone(),
            add_notes: patch.add_notes.clone(),
            add_dependencies: patch.add_dependencies.clone(),
            remove_dependencies: patch.remove_dependencies.clone(),
        };
        {
            let item = record
                .plan
                .items
                .get_mut(item_id)
                .ok_or_else(|| AcrError::not_found(item_id))?;
            Self::apply_update_item(item, &self.node_id, now_millis, &payload);
        }

        let payload_json = json!({
            "title": payload.title,
            "description": payload.description,
            "priority": payload.priority,
            "estimatedMinutes": payload.estimated_minutes,
            "addTags": payload.add_tags,
            "removeTags": payload.remove_tags,
            "addNotes": payload.add_notes,
            "addDependencies": payload.add_dependencies,
            "removeDependencies": payload.remove_dependencies,
        });
        self.record_operation(record, PlanOperationType::UpdateItem, Some(item_id.to_string()), payload_json);

        let plain = record.plan.items.get(item_id).unwrap().to_plain_item();
        self.emit(AcrEvent::ItemUpdated {
            plan_id: plan_id.to_string(),
            item_id: item_id.to_string(),
        });
        Ok(plain)
    }

    async fn update_item_status(
        &self,
        plan_id: &str,
        item_id: &str,
        status: PlanItemStatus,
        progress: Option<f64>,
    ) -> Result<PlainPlanItem> {
        let mut table = self.plans.write();
        let record = table.get_mut(plan_id).ok_or_else(|| AcrError::not_found(plan_id))?;

        let now_millis = Utc::now().timestamp_millis();
        let resolved_progress = match (status, progress) {
            (PlanItemStatus::Completed, None) => Some(100.0),
            (_, other) => other,
        };
        {
            let item = record
                .plan
                .items
                .get_mut(item_id)
                .ok_or_else(|| AcrError::not_found(item_id))?;
            item.status.set(status, &self.node_id, now_millis);
            if let Some(progress) = resolved_progress {
                item.progress.set(progress.clamp(0.0, 100.0), &self.node_id, now_millis);
            }
        }
        Self::derive_progress(&mut record.plan);

        self.record_operation(
            record,
            PlanOperationType::UpdateItemStatus,
            Some(item_id.to_string()),
            json!({ "status": status, "progress": resolved_progress }),
        );

        let plain = record.plan.items.get(item_id).unwrap().to_plain_item();
        debug!(plan_id, item_id, ?status, "plan item status updated");
        self.emit(AcrEvent::StatusUpdated {
            plan_id: plan_id.to_string(),
            item_id: item_id.to_string(),
        });
        Ok(plain)
    }

    async fn assign_item(&self, plan_id: &str, item_id: &str, agent_id: Option<String>) -> Result<PlainPlanItem> {
        let mut table = self.plans.write();
        let record = table.get_mut(plan_id).ok_or_else(|| AcrError::not_found(plan_id))?;

        let now_millis = Utc::now().timestamp_millis();
        {
            let item = record
                .plan
                .items
                .get_mut(item_id)
                .ok_or_else(|| AcrError::not_found(item_id))?;
            item.assigned_to.set(agent_id.clone(), &self.node_id, now_millis);
        }

        self.record_operation(
            record,
            PlanOperationType::AssignItem,
            Some(item_id.to_string()),
            json!({ "agentId": agent_id }),
        );

        let plain = record.plan.items.get(item_id).unwrap().to_plain_item();
        self.emit(AcrEvent::ItemAssigned {
            plan_id: plan_id.to_string(),
            item_id: item_id.to_string(),
            agent_id: agent_id.unwrap_or_default(),
        });
        Ok(plain)
    }

    async fn delete_item(&self, plan_id: &str, item_id: &str) -> Result<bool> {
        let mut table = self.plans.write();
        let record = table.get_mut(plan_id).ok_or_else(|| AcrError::not_found(plan_id))?;

        let Some(item) = record.plan.items.remove(item_id) else {
            return Ok(false);
        };

        let now_millis = Utc::now().timestamp_millis();
        if let Some(parent_id) = item.parent_id.get() {
            if let Some(parent) = record.plan.items.get_mut(parent_id) {
                parent.subtask_ids.remove(&item_id.to_string(), &self.node_id, now_millis);
            }
        }
        Self::derive_progress(&mut record.plan);

        self.record_operation(
            record,
            PlanOperationType::DeleteItem,
            Some(item_id.to_string()),
            Value::Null,
        );

        info!(plan_id, item_id, "plan item deleted");
        self.emit(AcrEvent::ItemDeleted {
            plan_id: plan_id.to_string(),
            item_id: item_id.to_string(),
        });
        Ok(true)
    }

    async fn get_plan_snapshot(&self, plan_id: &str) -> Result<PlanSnapshot> {
        self.plans
            .read()
            .get(plan_id)
            .map(|r| Self::snapshot_of(&r.plan))
            .ok_or_else(|| AcrError::not_found(plan_id))
    }

    async fn get_plan_replica(&self, plan_id: &str) -> Result<Plan> {
        self.plans
            .read()
            .get(plan_id)
            .map(|r| r.plan.clone())
            .ok_or_else(|| AcrError::not_found(plan_id))
    }

    async fn apply_plan_snapshot(&self, plan_id: &str, remote: Plan) -> Result<PlanSnapshot> {
        let mut table = self.plans.write();
        let record = table.get_mut(plan_id).ok_or_else(|| AcrError::not_found(plan_id))?;

        match record.plan.vector_clock.compare(&remote.vector_clock) {
            ClockOrdering::Before => {
                record.plan = remote;
                Self::derive_progress(&mut record.plan);
                info!(plan_id, "plan replaced by strictly newer remote snapshot");
                self.emit(AcrEvent::PlanRestored { plan_id: plan_id.to_string() });
            }
            ClockOrdering::Equal | ClockOrdering::After => {
                // Local already dominates or matches; nothing to adopt.
            }
            ClockOrdering::Concurrent => {
                for (remote_id, remote_item) in &remote.items {
                    match record.plan.items.get(remote_id) {
                        Some(local_item) => {
                            let merged = local_item.merge(remote_item);
                            record.plan.items.insert(remote_id.clone(), merged);
                        }
                        None => {
                            record.plan.items.insert(remote_id.clone(), remote_item.clone());
                        }
                    }
                }
                record.plan.vector_clock = record.plan.vector_clock.merge(&remote.vector_clock);
                record.plan.version = record.plan.version.max(remote.version) + 1;
                Self::derive_progress(&mut record.plan);
                record.stats.conflicts_resolved += 1;
                debug!(plan_id, "concurrent plan snapshots merged");
                self.emit(AcrEvent::ConflictDetected { plan_id: plan_id.to_string() });
            }
        }

        Ok(Self::snapshot_of(&record.plan))
    }

    async fn apply_operation(&self, op: PlanOperation) -> Result<()> {
        let mut table = self.plans.write();

        if !table.contains_key(&op.plan_id) {
            if op.op_type != PlanOperationType::CreatePlan {
                return Err(AcrError::not_found(&op.plan_id));
            }
            let payload: CreatePlanPayload =
                serde_json::from_value(op.payload.clone()).map_err(|e| AcrError::invalid(e.to_string()))?;
            let now = Utc::now();
            let plan = Plan {
                id: op.plan_id.clone(),
                name: payload.name,
                description: payload.description,
                items: HashMap::new(),
                owner: payload.owner,
                collaborators: Vec::new(),
                current_phase: None,
                total_phases: None,
                overall_progress: 0.0,
                created_at: now,
                updated_at: now,
                vector_clock: VectorClock::create(&op.source_node),
                version: 0,
            };
            table.insert(
                op.plan_id.clone(),
                PlanRecord {
                    plan,
                    operations: VecDeque::new(),
                    stats: PlanSyncStats::default(),
                },
            );
            self.emit(AcrEvent::PlanCreated { plan_id: op.plan_id.clone() });
        }

        let record = table.get_mut(&op.plan_id).ok_or_else(|| AcrError::not_found(&op.plan_id))?;

        if record.plan.vector_clock.are_concurrent(&op.vector_clock) {
            record.stats.conflicts_detected += 1;
            self.emit(AcrEvent::ConflictDetected {
                plan_id: op.plan_id.clone(),
            });
        }
        record.plan.vector_clock = record.plan.vector_clock.merge(&op.vector_clock);

        let now_millis = op.timestamp.timestamp_millis();
        match op.op_type {
            PlanOperationType::CreatePlan => {
                // A plan is created locally before any remote op can target
                // it; nothing further to apply.
            }
            PlanOperationType::UpdatePlan => {
                let payload: UpdatePlanPayload = serde_json::from_value(op.payload.clone())
                    .map_err(|e| AcrError::invalid(e.to_string()))?;
                if let Some(name) = payload.name {
                    record.plan.name = name;
                }
                if let Some(description) = payload.description {
                    record.plan.description = description;
                }
                if let Some(phase) = payload.current_phase {
                    record.plan.current_phase = Some(phase);
                }
                if let Some(total) = payload.total_phases {
                    record.plan.total_phases = Some(total);
                }
                if let Some(collaborators) = payload.collaborators {
                    record.plan.collaborators = collaborators;
                }
            }
            PlanOperationType::AddItem => {
                let payload: AddItemPayload = serde_json::from_value(op.payload.clone())
                    .map_err(|e| AcrError::invalid(e.to_string()))?;
                let id = op.item_id.clone().unwrap_or_else(|| acr_core::generate_id("item"));
                Self::apply_create_item(&mut record.plan, id, &op.source_node, now_millis, &payload);
            }
            PlanOperationType::UpdateItem => {
                let payload: UpdateItemPayload = serde_json::from_value(op.payload.clone())
                    .map_err(|e| AcrError::invalid(e.to_string()))?;
                if let Some(item_id) = &op.item_id {
                    if let Some(item) = record.plan.items.get_mut(item_id) {
                        Self::apply_update_item(item, &op.source_node, now_millis, &payload);
                    }
                }
            }
            PlanOperationType::UpdateItemStatus => {
                let payload: UpdateItemStatusPayload = serde_json::from_value(op.payload.clone())
                    .map_err(|e| AcrError::invalid(e.to_string()))?;
                if let Some(item_id) = &op.item_id {
                    if let Some(item) = record.plan.items.get_mut(item_id) {
                        item.status.set(payload.status, &op.source_node, now_millis);
                        if let Some(progress) = payload.progress {
                            item.progress.set(progress.clamp(0.0, 100.0), &op.source_node, now_millis);
                        }
                    }
                }
            }
            PlanOperationType::AssignItem => {
                let payload: AssignItemPayload = serde_json::from_value(op.payload.clone())
                    .map_err(|e| AcrError::invalid(e.to_string()))?;
                if let Some(item_id) = &op.item_id {
                    if let Some(item) = record.plan.items.get_mut(item_id) {
                        item.assigned_to.set(payload.agent_id, &op.source_node, now_millis);
                    }
                }
            }
            PlanOperationType::DeleteItem => {
                if let Some(item_id) = &op.item_id {
                    if let Some(item) = record.plan.items.remove(item_id) {
                        if let Some(parent_id) = item.parent_id.get() {
                            if let Some(parent) = record.plan.items.get_mut(parent_id) {
                                parent.subtask_ids.remove(item_id, &op.source_node, now_millis);
                            }
                        }
                    }
                }
            }
        }

        Self::derive_progress(&mut record.plan);
        record.plan.version += 1;
        record.plan.updated_at = Utc::now();
        self.emit(AcrEvent::OperationApplied {
            plan_id: op.plan_id.clone(),
            op_type: op.op_type,
        });
        Ok(())
    }

    async fn get_pending_operations(&self, plan_id: &str) -> Vec<PlanOperation> {
        self.plans
            .read()
            .get(plan_id)
            .map(|r| r.operations.iter().cloned().collect())
            .unwrap_or_default()
    }

    async fn get_stats(&self, plan_id: &str) -> PlanSyncStats {
        self.plans.read().get(plan_id).map(|r| r.stats).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_item_and_update_status_auto_completes_progress() {
        let sync = InMemoryPlanSync::with_defaults();
        let snapshot = sync.create_plan("p", "d", None).await.unwrap();
        let item = sync
            .add_item(&snapshot.plan.id, "item", "d", NewItemOptions::default())
            .await
            .unwrap();

        let updated = sync
            .update_item_status(&snapshot.plan.id, &item.id, PlanItemStatus::Completed, None)
            .await
            .unwrap();
        assert_eq!(updated.progress, 100.0);
        assert_eq!(updated.status, PlanItemStatus::Completed);
    }

    #[tokio::test]
    async fn delete_item_removes_from_parent_subtasks() {
        let sync = InMemoryPlanSync::with_defaults();
        let snapshot = sync.create_plan("p", "d", None).await.unwrap();
        let parent = sync
            .add_item(&snapshot.plan.id, "parent", "d", NewItemOptions::default())
            .await
            .unwrap();
        let mut options = NewItemOptions::default();
        options.parent_id = Some(parent.id.clone());
        let child = sync.add_item(&snapshot.plan.id, "child", "d", options).await.unwrap();

        let parent_after_add = sync
            .get_plan_replica(&snapshot.plan.id)
            .await
            .unwrap()
            .items
            .get(&parent.id)
            .unwrap()
            .to_plain_item();
        assert!(parent_after_add.subtask_ids.contains(&child.id));

        assert!(sync.delete_item(&snapshot.plan.id, &child.id).await.unwrap());
        let parent_after_delete = sync
            .get_plan_replica(&snapshot.plan.id)
            .await
            .unwrap()
            .items
            .get(&parent.id)
            .unwrap()
            .to_plain_item();
        assert!(!parent_after_delete.subtask_ids.contains(&child.id));
    }

    #[tokio::test]
    async fn concurrent_snapshot_merge_resolves_and_counts_conflict() {
        let sync = InMemoryPlanSync::with_defaults();
        let snapshot = sync.create_plan("p", "d", None).await.unwrap();
        let item = sync
            .add_item(&snapshot.plan.id, "item", "d", NewItemOptions::default())
            .await
            .unwrap();

        let mut remote = sync.get_plan_replica(&snapshot.plan.id).await.unwrap();
        // Diverge: local keeps advancing its own clock entry while remote
        // advances a different one, so the two replicas become concurrent
        // rather than strictly ordered.
        sync.update_plan(&snapshot.plan.id, PlanPatch::default()).await.unwrap();
        remote.vector_clock.increment("remote-node");
        remote
            .items
            .get_mut(&item.id)
            .unwrap()
            .title
            .set("from remote".to_string(), "remote-node", Utc::now().timestamp_millis() + 1000);

        let merged = sync.apply_plan_snapshot(&snapshot.plan.id, remote).await.unwrap();
        let merged_item = merged.items.iter().find(|i| i.id == item.id).unwrap();
        assert_eq!(merged_item.title, "from remote");
        assert_eq!(sync.get_stats(&snapshot.plan.id).await.conflicts_resolved, 1);
    }

    #[tokio::test]
    async fn apply_operation_replays_remote_mutations_onto_a_fresh_node() {
        let local = InMemoryPlanSync::with_defaults();
        let remote = InMemoryPlanSync::new("remote-node", Arc::new(NoopEventSink));

        let snapshot = local.create_plan("p", "d", None).await.unwrap();
        let item = local
            .add_item(&snapshot.plan.id, "item", "d", NewItemOptions::default())
            .await
            .unwrap();
        local
            .update_item_status(&snapshot.plan.id, &item.id, PlanItemStatus::Completed, None)
            .await
            .unwrap();

        for op in local.get_pending_operations(&snapshot.plan.id).await {
            remote.apply_operation(op).await.unwrap();
        }

        let replayed = remote.get_plan_snapshot(&snapshot.plan.id).await.unwrap();
        assert_eq!(replayed.items.len(), 1);
        assert_eq!(replayed.items[0].status, PlanItemStatus::Completed);
        assert_eq!(replayed.items[0].progress, 100.0);
    }
}
