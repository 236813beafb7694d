//! Priority message bus with request/response suspension and topic
//! fan-out.
//!
//! Depends on [`acr_core::traits::AgentDirectory`] rather than on
//! `acr-registry` directly, so broadcast fan-out can be driven by any
//! directory implementation — including a fake one in tests.

pub mod config;
pub mod contract;
pub mod store;

pub use contract::{MessageBusContract, MessageBusStats, SendOptions, TopicFilter};
pub use store::InMemoryMessageBus;
