//! Composition root for the Agent Coordination Runtime.
//!
//! Wires the registry, message bus, work distributor, progress tracker and
//! plan sync service together through the seam traits declared in
//! [`acr_core::traits`], in the dependency order spec §2 describes:
//! registry underlies the bus and the work distributor; the work
//! distributor and progress tracker publish onto the bus; plan sync has no
//! dependency on any other subsystem.

pub mod config;
pub mod global;
pub mod runtime;

pub use runtime::AcrRuntime;
