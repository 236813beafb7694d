//! Progress and milestone tracking for the Agent Coordination Runtime.
//!
//! Depends only on [`acr_core::traits::TopicPublisher`] for its optional
//! bus publication — never on the concrete message bus crate.

pub mod config;
pub mod contract;
pub mod store;

pub use contract::ProgressTrackerContract;
pub use store::InMemoryProgressTracker;
