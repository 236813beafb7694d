//! CRDT-backed plan synchronization for the Agent Coordination Runtime.
//!
//! Builds directly on [`acr_core::crdt`] and [`acr_core::vector_clock`];
//! carries no dependency on any other subsystem crate.

pub mod config;
pub mod contract;
pub mod store;

pub use contract::{ItemPatch, NewItemOptions, PlanPatch, PlanSyncContract, PlanSyncStats};
pub use store::InMemoryPlanSync;
