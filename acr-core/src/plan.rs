use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crdt::{LwwRegister, OrSet};
use crate::vector_clock::VectorClock;

/// Plan item lifecycle status (spec §3, distinct from [`crate::task::TaskStatus`]
/// since a plan item is a planning artifact, not a claimable unit of work).
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PlanItemStatus {
    Pending,
    InProgress,
    Completed,
    Blocked,
    Cancelled,
}

impl Default for PlanItemStatus {
    fn default() -> Self {
        Self::Pending
    }
}

#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PlanItemPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Default for PlanItemPriority {
    fn default() -> Self {
        Self::Medium
    }
}

/// Plan-operation type tag carried by [`PlanOperation`] and dispatched by the
/// operation log (spec §4.5.5).
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PlanOperationType {
    CreatePlan,
    UpdatePlan,
    AddItem,
    UpdateItem,
    UpdateItemStatus,
    AssignItem,
    DeleteItem,
}

/// One recorded mutation, carrying the vector-clock snapshot taken right
/// after the local increment (spec §4.5.5). The operation log is the
/// ground truth exchanged between nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanOperation {
    pub id: String,
    pub plan_id: String,
    pub op_type: PlanOperationType,
    pub item_id: Option<String>,
    pub payload: Value,
    pub source_node: String,
    pub timestamp: DateTime<Utc>,
    pub vector_clock: VectorClock,
}

/// The plain (non-CRDT) projection of a [`CrdtPlanItem`], as returned by
/// `toPlainItem` and serialized in plan snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlainPlanItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: PlanItemStatus,
    pub priority: PlanItemPriority,
    pub assigned_to: Option<String>,
    pub progress: f64,
    pub parent_id: Option<String>,
    pub estimated_minutes: Option<i64>,
    pub actual_minutes: Option<i64>,
    pub dependencies: Vec<String>,
    pub tags: Vec<String>,
    pub notes: Vec<String>,
    pub subtask_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// CRDT-backed plan item: scalar fields as LWW-Registers, collection fields
/// as OR-Sets (spec §3, §4.5.4). This is the authoritative replica state;
/// [`PlainPlanItem`] is only ever a read projection of it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrdtPlanItem {
    pub id: String,
    pub title: LwwRegister<String>,
    pub description: LwwRegister<String>,
    pub status: LwwRegister<PlanItemStatus>,
    pub priority: LwwRegister<PlanItemPriority>,
    pub assigned_to: LwwRegister<Option<String>>,
    pub progress: LwwRegister<f64>,
    pub parent_id: LwwRegister<Option<String>>,
    pub estimated_minutes: LwwRegister<Option<i64>>,
    pub actual_minutes: LwwRegister<Option<i64>>,
    pub dependencies: OrSet<String>,
    pub tags: OrSet<String>,
    pub notes: OrSet<String>,
    pub subtask_ids: OrSet<String>,
    pub created_at: DateTime<Utc>,
}

impl CrdtPlanItem {
    /// Every register starts unset at `ts=0` under `node_id`, so the first
    /// real write from any node always wins.
    pub fn new(id: impl Into<String>, node_id: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: LwwRegister::new(String::new(), node_id),
            description: LwwRegister::new(String::new(), node_id),
            status: LwwRegister::new(PlanItemStatus::default(), node_id),
            priority: LwwRegister::new(PlanItemPriority::default(), node_id),
            assigned_to: LwwRegister::new(None, node_id),
            progress: LwwRegister::new(0.0, node_id),
            parent_id: LwwRegister::new(None, node_id),
            estimated_minutes: LwwRegister::new(None, node_id),
            actual_minutes: LwwRegister::new(None, node_id),
            dependencies: OrSet::new(),
            tags: OrSet::new(),
            notes: OrSet::new(),
            subtask_ids: OrSet::new(),
            created_at,
        }
    }

    /// Merges each sub-CRDT pairwise; `createdAt` takes the earlier of the
    /// two, per spec §4.5.4.
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            id: self.id.clone(),
            title: self.title.merge(&other.title),
            description: self.description.merge(&other.description),
            status: self.status.merge(&other.status),
            priority: self.priority.merge(&other.priority),
            assigned_to: self.assigned_to.merge(&other.assigned_to),
            progress: self.progress.merge(&other.progress),
            parent_id: self.parent_id.merge(&other.parent_id),
            estimated_minutes: self.estimated_minutes.merge(&other.estimated_minutes),
            actual_minutes: self.actual_minutes.merge(&other.actual_minutes),
            dependencies: self.dependencies.merge(&other.dependencies),
            tags: self.tags.merge(&other.tags),
            notes: self.notes.merge(&other.notes),
            subtask_ids: self.subtask_ids.merge(&other.subtask_ids),
            created_at: self.created_at.min(other.created_at),
        }
    }

    pub fn to_plain_item(&self) -> PlainPlanItem {
        let mut dependencies: Vec<String> = self.dependencies.values().into_iter().collect();
        let mut tags: Vec<String> = self.tags.values().into_iter().collect();
        let mut notes: Vec<String> = self.notes.values().into_iter().collect();
        let mut subtask_ids: Vec<String> = self.subtask_ids.values().into_iter().collect();
        dependencies.sort();
        tags.sort();
        notes.sort();
        subtask_ids.sort();

        PlainPlanItem {
            id: self.id.clone(),
            title: self.title.get().clone(),
            description: self.description.get().clone(),
            status: *self.status.get(),
            priority: *self.priority.get(),
            assigned_to: self.assigned_to.get().clone(),
            progress: *self.progress.get(),
            parent_id: self.parent_id.get().clone(),
            estimated_minutes: *self.estimated_minutes.get(),
            actual_minutes: *self.actual_minutes.get(),
            dependencies,
            tags,
            notes,
            subtask_ids,
            created_at: self.created_at,
        }
    }
}

/// A planning document: a map of CRDT items plus plain metadata, synchronized
/// across nodes via vector-clock-tagged operations (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub description: String,
    pub items: HashMap<String, CrdtPlanItem>,
    pub owner: Option<String>,
    pub collaborators: Vec<String>,
    pub current_phase: Option<String>,
    pub total_phases: Option<u32>,
    pub overall_progress: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub vector_clock: VectorClock,
    pub version: u64,
}

impl Plan {
    /// Mean of item progresses, rounded; 0 for an empty plan (spec §8).
    pub fn derive_overall_progress(&self) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .items
            .values()
            .map(|item| *item.progress.get())
            .sum();
        (total / self.items.len() as f64).round()
    }
}

/// Wire-shape metadata block of a plan snapshot (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanMeta {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner: Option<String>,
    pub collaborators: Vec<String>,
    pub current_phase: Option<String>,
    pub total_phases: Option<u32>,
    pub overall_progress: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub vector_clock: VectorClock,
    pub version: u64,
}

/// `{plan, items}` snapshot exchanged between nodes (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanSnapshot {
    pub plan: PlanMeta,
    pub items: Vec<PlainPlanItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrent_title_edit_resolves_by_node_id_tiebreak() {
        let created = Utc::now();
        let base = CrdtPlanItem::new("item-1", "N0", created);

        let mut n1 = base.clone();
        n1.title.set("B".to_string(), "N1", 10);

        let mut n2 = base.clone();
        n2.title.set("C".to_string(), "N2", 10);

        let merged_forward = n1.merge(&n2);
        let merged_backward = n2.merge(&n1);
        assert_eq!(merged_forward.title.get(), "C");
        assert_eq!(merged_backward.title.get(), "C");
    }

    #[test]
    fn to_plain_item_defaults_match_spec() {
        let item = CrdtPlanItem::new("item-1", "N0", Utc::now());
        let plain = item.to_plain_item();
        assert_eq!(plain.title, "");
        assert_eq!(plain.status, PlanItemStatus::Pending);
        assert_eq!(plain.priority, PlanItemPriority::Medium);
        assert_eq!(plain.progress, 0.0);
    }

    #[test]
    fn overall_progress_is_mean_of_item_progress() {
        let created = Utc::now();
        let mut item_a = CrdtPlanItem::new("a", "N1", created);
        item_a.progress.set(50.0, "N1", 1);
        let mut item_b = CrdtPlanItem::new("b", "N1", created);
        item_b.progress.set(100.0, "N1", 1);

        let mut items = HashMap::new();
        items.insert(item_a.id.clone(), item_a);
        items.insert(item_b.id.clone(), item_b);

        let plan = Plan {
            id: "p-1".into(),
            name: "plan".into(),
            description: String::new(),
            items,
            owner: None,
            collaborators: vec![],
            current_phase: None,
            total_phases: None,
            overall_progress: 0.0,
            created_at,
            updated_at: created,
            vector_clock: VectorClock::create("N1"),
            version: 1,
        };

        assert_eq!(plan.derive_overall_progress(), 75.0);
    }
}
