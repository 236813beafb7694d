//! Agent registry with heartbeat liveness monitoring.
//!
//! Owns the authoritative set of [`acr_core::agent::Agent`] records: it is
//! the only crate that mutates them. Other subsystems depend on the
//! [`acr_core::traits::AgentDirectory`] seam rather than on this crate
//! directly, so they can be tested against a fake directory without pulling
//! in the registry's liveness machinery.

pub mod config;
pub mod contract;
pub mod store;

pub use contract::{HeartbeatResult, NewAgent, RegistryContract};
pub use store::InMemoryRegistry;
