use async_trait::async_trait;

use acr_core::{PlainPlanItem, Plan, PlanItemPriority, PlanItemStatus, PlanOperation, PlanSnapshot, Result};

/// Options accepted by `addItem` beyond the required title/description.
#[derive(Debug, Clone, Default)]
pub struct NewItemOptions {
    pub priority: Option<PlanItemPriority>,
    pub assigned_to: Option<String>,
    pub parent_id: Option<String>,
    pub estimated_minutes: Option<i64>,
    pub dependencies: Vec<String>,
    pub tags: Vec<String>,
}

/// Sparse patch applied by `updateItem`. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<PlanItemPriority>,
    pub estimated_minutes: Option<i64>,
    pub add_tags: Vec<String>,
    pub remove_tags: Vec<String>,
    pub add_notes: Vec<String>,
    pub add_dependencies: Vec<String>,
    pub remove_dependencies: Vec<String>,
}

/// Sparse patch applied by `updatePlan`.
#[derive(Debug, Clone, Default)]
pub struct PlanPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub current_phase: Option<String>,
    pub total_phases: Option<u32>,
    pub collaborators: Option<Vec<String>>,
}

/// Running conflict counters exposed per plan (spec §4.5.5 "conflicts
/// detected"/"conflicts resolved").
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlanSyncStats {
    pub conflicts_detected: u64,
    pub conflicts_resolved: u64,
}

/// CRDT plan synchronization contract (spec §4.5.5). Every mutating call
/// increments the plan's vector clock at the local node, records an
/// operation in the pending-operations log, and re-derives
/// `overallProgress`.
#[async_trait]
pub trait PlanSyncContract: Send + Sync {
    async fn create_plan(&self, name: &str, description: &str, owner: Option<String>) -> Result<PlanSnapshot>;

    async fn update_plan(&self, plan_id: &str, patch: PlanPatch) -> Result<PlanSnapshot>;

    async fn add_item(&self, plan_id: &str, title: &str, description: &str, options: NewItemOptions) -> Result<PlainPlanItem>;

    async fn update_item(&self, plan_id: &str, item_id: &str, patch: ItemPatch) -> Result<PlainPlanItem>;

    /// Completing an item (status = `completed`) auto-sets progress to 100
    /// unless an explicit `progress` is supplied.
    async fn update_item_status(
        &self,
        plan_id: &str,
        item_id: &str,
        status: PlanItemStatus,
        progress: Option<f64>,
    ) -> Result<PlainPlanItem>;

    async fn assign_item(&self, plan_id: &str, item_id: &str, agent_id: Option<String>) -> Result<PlainPlanItem>;

    async fn delete_item(&self, plan_id: &str, item_id: &str) -> Result<bool>;

    /// Wire-format projection for external readers.
    async fn get_plan_snapshot(&self, plan_id: &str) -> Result<PlanSnapshot>;

    /// Full CRDT-state replica exchanged between nodes, as opposed to the
    /// plain-projected [`PlanSnapshot`] returned by `get_plan_snapshot`.
    async fn get_plan_replica(&self, plan_id: &str) -> Result<Plan>;

    async fn apply_plan_snapshot(&self, plan_id: &str, remote: Plan) -> Result<PlanSnapshot>;

    async fn apply_operation(&self, op: PlanOperation) -> Result<()>;

    async fn get_pending_operations(&self, plan_id: &str) -> Vec<PlanOperation>;

    async fn get_stats(&self, plan_id: &str) -> PlanSyncStats;
}
