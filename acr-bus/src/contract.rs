use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use acr_core::error::Result;
use acr_core::message::{MessageHistoryFilter, MessageKind, Priority};
use acr_core::traits::{MessageHandler, RequestHandler};

/// Optional parameters accepted by the send/publish family of operations.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub priority: Option<Priority>,
    pub metadata: HashMap<String, Value>,
    pub expires_at: Option<DateTime<Utc>>,
    pub requires_ack: bool,
}

/// A topic subscription filter: returns `true` if the message should be
/// delivered to the subscriber.
pub type TopicFilter = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Point-in-time counters returned by `getStats` (spec §4.2).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MessageBusStats {
    pub messages_queued: u64,
    pub messages_delivered: u64,
    pub messages_expired: u64,
    pub delivery_failures: u64,
    pub handler_errors: u64,
    pub broadcasts_sent: u64,
}

/// Priority-queue message delivery with request/response and pub/sub
/// fan-out (spec §4.2).
#[async_trait]
pub trait MessageBusContract: Send + Sync {
    async fn send_to_agent(
        &self,
        sender_id: &str,
        recipient_id: &str,
        kind: MessageKind,
        subject: &str,
        body: Value,
        options: SendOptions,
    ) -> Result<String>;

    /// Fans out to every live, non-sender agent. Succeeds with zero
    /// per-recipient queue entries when there are no eligible recipients
    /// (spec §4.2, §8).
    async fn broadcast_to_all(
        &self,
        sender_id: &str,
        subject: &str,
        body: Value,
        options: SendOptions,
    ) -> Result<String>;

    async fn publish_to_topic(
        &self,
        sender_id: &str,
        topic: &str,
        subject: &str,
        body: Value,
        options: SendOptions,
    ) -> Result<String>;

    /// Suspends the caller until a matching response is acknowledged or the
    /// timeout elapses (spec §5, the one blocking API in this runtime).
    async fn send_request(
        &self,
        sender_id: &str,
        recipient_id: &str,
        subject: &str,
        body: Value,
        timeout_secs: Option<i64>,
    ) -> Result<Value>;

    async fn send_response(
        &self,
        sender_id: &str,
        request_id: &str,
        body: Value,
    ) -> Result<String>;

    fn subscribe(&self, agent_id: &str, topic: &str, filter: Option<TopicFilter>) -> String;

    fn unsubscribe(&self, subscription_id: &str) -> bool;

    fn register_handler(&self, agent_id: &str, handler: Arc<dyn MessageHandler>);

    fn register_request_handler(&self, agent_id: &str, handler: Arc<dyn RequestHandler>);

    /// Pull-style retrieval for recipients with no registered push handler.
    async fn get_messages(&self, recipient_id: &str) -> Result<Vec<acr_core::message::Message>>;

    async fn acknowledge(&self, message_id: &str) -> Result<bool>;

    async fn mark_as_read(&self, message_id: &str) -> Result<bool>;

    async fn get_history(&self, filter: MessageHistoryFilter) -> Result<Vec<acr_core::message::Message>>;

    fn get_stats(&self) -> MessageBusStats;

    /// Runs one delivery pass: expires overdue messages, invokes handlers
    /// for recipients that have one registered, and resolves completed
    /// request/response pairs. Driven by a runtime-owned timer at the
    /// configured tick cadence (spec §5).
    async fn process_tick(&self, now: DateTime<Utc>);
}
