use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message delivery semantics.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MessageKind {
    Direct,
    Broadcast,
    Topic,
    Request,
    Response,
    Progress,
    System,
    Error,
}

/// Message priority. Ordinal order matches the delivery-queue ordering rule
/// in spec §4.2: `critical < high < normal < low`, i.e. `Critical` sorts
/// first.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum Priority {
    Critical,
    High,
    Normal,
    Low,
}

/// Lifecycle status of a single message (or fan-out clone).
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MessageStatus {
    Queued,
    Sent,
    Delivered,
    Read,
    Failed,
    Expired,
}

/// A single message travelling through the bus. Bodies are opaque; the
/// runtime never inspects them (spec §9, "Dynamic/opaque payloads").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub kind: MessageKind,
    pub priority: Priority,
    pub sender_id: String,
    pub recipient_id: Option<String>,
    pub topic: Option<String>,
    pub request_id: Option<String>,
    pub subject: String,
    pub body: Value,
    pub metadata: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub status: MessageStatus,
    pub delivery_attempts: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub delivery_error: Option<String>,
    pub requires_ack: bool,
    pub acknowledged: bool,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn is_expired(&self, at: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| exp <= at).unwrap_or(false)
    }
}

/// Parameters accepted by [`crate::traits::MessageBusContract::get_history`];
/// predicates combine with AND semantics, as with every other filter in this
/// runtime.
#[derive(Debug, Clone, Default)]
pub struct MessageHistoryFilter {
    pub sender_id: Option<String>,
    pub recipient_id: Option<String>,
    pub kind: Option<MessageKind>,
    pub topic: Option<String>,
    pub since: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ordering_is_critical_first() {
        let mut priorities = vec![Priority::Low, Priority::Critical, Priority::Normal, Priority::High];
        priorities.sort();
        assert_eq!(
            priorities,
            vec![Priority::Critical, Priority::High, Priority::Normal, Priority::Low]
        );
    }

    #[test]
    fn expiry_check() {
        let now = Utc::now();
        let mut msg = Message {
            id: "m-1".into(),
            kind: MessageKind::Direct,
            priority: Priority::Normal,
            sender_id: "a".into(),
            recipient_id: Some("b".into()),
            topic: None,
            request_id: None,
            subject: "s".into(),
            body: Value::Null,
            metadata: HashMap::new(),
            created_at: now,
            expires_at: Some(now - chrono::Duration::seconds(1)),
            status: MessageStatus::Queued,
            delivery_attempts: 0,
            last_attempt_at: None,
            delivery_error: None,
            requires_ack: false,
            acknowledged: false,
            acknowledged_at: None,
        };
        assert!(msg.is_expired(now));
        msg.expires_at = Some(now + chrono::Duration::seconds(60));
        assert!(!msg.is_expired(now));
    }
}
