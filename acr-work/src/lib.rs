//! Task claim/lifecycle distributor for the Agent Coordination Runtime.
//!
//! Depends only on [`acr_core::traits::AgentDirectory`],
//! [`acr_core::traits::AgentCurrentTaskSetter`] and
//! [`acr_core::traits::TopicPublisher`] — never on the concrete registry or
//! message bus crates — so the distributor can be composed with any
//! implementation of those seams.

pub mod config;
pub mod contract;
pub mod store;

pub use contract::WorkDistributorContract;
pub use store::InMemoryWorkDistributor;
