use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::info;

use acr_core::error::{AcrError, Result};
use acr_core::events::{AcrEvent, EventSink, NoopEventSink};
use acr_core::generate_id;
use acr_core::message::{Message, MessageHistoryFilter, MessageKind, MessageStatus, Priority};
use acr_core::traits::{AgentDirectory, MessageHandler, RequestHandler};

use crate::config::{DEFAULT_MESSAGE_EXPIRY_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, MAX_MESSAGE_LOG};
use crate::contract::{MessageBusContract, MessageBusStats, SendOptions, TopicFilter};

struct RecipientState {
    queue: VecDeque<Message>,
    handlers: Vec<Arc<dyn MessageHandler>>,
    request_handler: Option<Arc<dyn RequestHandler>>,
}

impl Default for RecipientState {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            handlers: Vec::new(),
            request_handler: None,
        }
    }
}

struct Subscription {
    id: String,
    subscriber_id: String,
    topic: String,
    filter: Option<TopicFilter>,
}

/// In-process priority message bus. Depends only on [`AgentDirectory`] for
/// broadcast fan-out, so it never needs the registry crate directly.
pub struct InMemoryMessageBus {
    recipients: RwLock<HashMap<String, RecipientState>>,
    subscriptions: RwLock<HashMap<String, Vec<Subscription>>>,
    log: RwLock<VecDeque<Message>>,
    pending_requests: RwLock<HashMap<String, (oneshot::Sender<Result<Value>>, DateTime<Utc>)>>,
    pending_ack: RwLock<HashMap<String, Message>>,
    stats: RwLock<MessageBusStats>,
    directory: Arc<dyn AgentDirectory>,
    sink: Arc<dyn EventSink>,
}

impl InMemoryMessageBus {
    pub fn new(directory: Arc<dyn AgentDirectory>, sink: Arc<dyn EventSink>) -> Self {
        info!("initializing in-memory message bus");
        Self {
            recipients: RwLock::new(HashMap::new()),
            subscriptions: RwLock::new(HashMap::new()),
            log: RwLock::new(VecDeque::new()),
            pending_requests: RwLock::new(HashMap::new()),
            pending_ack: RwLock::new(HashMap::new()),
            stats: RwLock::new(MessageBusStats::default()),
            directory,
            sink,
        }
    }

    pub fn with_directory(directory: Arc<dyn AgentDirectory>) -> Self {
        Self::new(directory, Arc::new(NoopEventSink))
    }

    fn emit(&self, event: AcrEvent) {
        self.sink.emit(event);
    }

    fn build_message(
        sender_id: &str,
        recipient_id: Option<String>,
        topic: Option<String>,
        request_id: Option<String>,
        kind: MessageKind,
        subject: &str,
        body: Value,
        options: &SendOptions,
    ) -> Message {
        let now = Utc::now();
        Message {
            id: generate_id("msg"),
            kind,
            priority: options.priority.unwrap_or(Priority::Normal),
            sender_id: sender_id.to_string(),
            recipient_id,
            topic,
            request_id,
            subject: subject.to_string(),
            body,
            metadata: options.metadata.clone(),
            created_at: now,
            expires_at: Some(
                options
                    .expires_at
                    .unwrap_or(now + Duration::seconds(DEFAULT_MESSAGE_EXPIRY_SECS)),
            ),
            status: MessageStatus::Queued,
            delivery_attempts: 0,
            last_attempt_at: None,
            delivery_error: None,
            requires_ack: options.requires_ack,
            acknowledged: false,
            acknowledged_at: None,
        }
    }

    /// Stable insertion: the message lands just before the first queued
    /// entry with strictly lower precedence (spec §4.2).
    fn enqueue(&self, message: Message) {
        let recipient_id = match &message.recipient_id {
            Some(id) => id.clone(),
            None => return,
        };
        let mut recipients = self.recipients.write();
        let state = recipients.entry(recipient_id).or_default();
        let position = state
            .queue
            .iter()
            .position(|queued| queued.priority > message.priority)
            .unwrap_or(state.queue.len());
        state.queue.insert(position, message.clone());
        drop(recipients);

        self.push_log(message.clone());
        self.stats.write().messages_queued += 1;
        self.emit(AcrEvent::MessageQueued {
            message_id: message.id,
        });
    }

    fn push_log(&self, message: Message) {
        let mut log = self.log.write();
        log.push_front(message);
        if log.len() > MAX_MESSAGE_LOG {
            log.pop_back();
        }
    }

    fn update_log_status(&self, message_id: &str, status: MessageStatus) {
        let mut log = self.log.write();
        if let Some(entry) = log.iter_mut().find(|m| m.id == message_id) {
            entry.status = status;
        }
    }

    fn resolve_pending_request(&self, request_id: &str, result: Result<Value>) {
        if let Some((tx, _)) = self.pending_requests.write().remove(request_id) {
            let _ = tx.send(result);
        }
    }
}

#[async_trait]
impl MessageBusContract for InMemoryMessageBus {
    async fn send_to_agent(
        &self,
        sender_id: &str,
        recipient_id: &str,
        kind: MessageKind,
        subject: &str,
        body: Value,
        options: SendOptions,
    ) -> Result<String> {
        let message = Self::build_message(
            sender_id,
            Some(recipient_id.to_string()),
            None,
            None,
            kind,
            subject,
            body,
            &options,
        );
        let id = message.id.clone();
        self.enqueue(message);
        Ok(id)
    }

    async fn broadcast_to_all(
        &self,
        sender_id: &str,
        subject: &str,
        body: Value,
        options: SendOptions,
    ) -> Result<String> {
        let logical = Self::build_message(
            sender_id,
            None,
            None,
            None,
            MessageKind::Broadcast,
            subject,
            body.clone(),
            &options,
        );
        let logical_id = logical.id.clone();
        self.push_log(logical.clone());
        self.stats.write().broadcasts_sent += 1;
        self.emit(AcrEvent::MessageQueued {
            message_id: logical_id.clone(),
        });

        let recipients: Vec<String> = self
            .directory
            .live_agents()
            .into_iter()
            .map(|agent| agent.id)
            .filter(|id| id != sender_id)
            .collect();

        for recipient_id in recipients {
            let mut clone = Self::build_message(
                sender_id,
                Some(recipient_id),
                None,
                None,
                MessageKind::Broadcast,
                subject,
                body.clone(),
                &options,
            );
            clone.metadata.insert(
                "broadcastOf".to_string(),
                Value::String(logical_id.clone()),
            );
            self.enqueue(clone);
        }

        Ok(logical_id)
    }

    async fn publish_to_topic(
        &self,
        sender_id: &str,
        topic: &str,
        subject: &str,
        body: Value,
        options: SendOptions,
    ) -> Result<String> {
        self.publish_to_topic_sync(sender_id, topic, subject, body, options)
    }

    async fn send_request(
        &self,
        sender_id: &str,
        recipient_id: &str,
        subject: &str,
        body: Value,
        timeout_secs: Option<i64>,
    ) -> Result<Value> {
        self.send_request_impl(sender_id, recipient_id, subject, body, timeout_secs)
            .await
    }

    async fn send_response(&self, sender_id: &str, request_id: &str, body: Value) -> Result<String> {
        self.send_response_impl(sender_id, request_id, body).await
    }

    fn subscribe(&self, agent_id: &str, topic: &str, filter: Option<TopicFilter>) -> String {
        self.subscribe_impl(agent_id, topic, filter)
    }

    fn unsubscribe(&self, subscription_id: &str) -> bool {
        self.unsubscribe_impl(subscription_id)
    }

    fn register_handler(&self, agent_id: &str, handler: Arc<dyn MessageHandler>) {
        self.register_handler_impl(agent_id, handler)
    }

    fn register_request_handler(&self, agent_id: &str, handler: Arc<dyn RequestHandler>) {
        self.register_request_handler_impl(agent_id, handler)
    }

    async fn get_messages(&self, recipient_id: &str) -> Result<Vec<Message>> {
        self.get_messages_impl(recipient_id).await
    }

    async fn acknowledge(&self, message_id: &str) -> Result<bool> {
        self.acknowledge_impl(message_id).await
    }

    async fn mark_as_read(&self, message_id: &str) -> Result<bool> {
        self.mark_as_read_impl(message_id).await
    }

    async fn get_history(&self, filter: MessageHistoryFilter) -> Result<Vec<Message>> {
        self.get_history_impl(filter).await
    }

    fn get_stats(&self) -> MessageBusStats {
        self.get_stats_impl()
    }

    async fn process_tick(&self, now: DateTime<Utc>) {
        self.process_tick_impl(now).await
    }
}

impl InMemoryMessageBus {
    /// Synchronous core of `publish_to_topic`, reused by the
    /// [`acr_core::traits::TopicPublisher`] seam below — publishing never
    /// actually awaits anything in this in-process implementation.
    fn publish_to_topic_sync(
        &self,
        sender_id: &str,
        topic: &str,
        subject: &str,
        body: Value,
        options: SendOptions,
    ) -> Result<String> {
        let logical = Self::build_message(
            sender_id,
            None,
            Some(topic.to_string()),
            None,
            MessageKind::Topic,
            subject,
            body.clone(),
            &options,
        );
        let logical_id = logical.id.clone();
        self.push_log(logical.clone());
        self.emit(AcrEvent::MessageQueued {
            message_id: logical_id.clone(),
        });

        let subscribers: Vec<String> = {
            let subs = self.subscriptions.read();
            subs.get(topic)
                .map(|list| {
                    list.iter()
                        .filter(|sub| sub.subscriber_id != sender_id)
                        .filter(|sub| sub.filter.as_ref().map(|f| f(&body)).unwrap_or(true))
                        .map(|sub| sub.subscriber_id.clone())
                        .collect()
                })
                .unwrap_or_default()
        };

        for subscriber_id in subscribers {
            let clone = Self::build_message(
                sender_id,
                Some(subscriber_id),
                Some(topic.to_string()),
                None,
                MessageKind::Topic,
                subject,
                body.clone(),
                &options,
            );
            self.enqueue(clone);
        }

        Ok(logical_id)
    }

    async fn send_request_impl(
        &self,
        sender_id: &str,
        recipient_id: &str,
        subject: &str,
        body: Value,
        timeout_secs: Option<i64>,
    ) -> Result<Value> {
        let timeout = timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS).max(1);
        let options = SendOptions {
            priority: Some(Priority::Normal),
            expires_at: Some(Utc::now() + Duration::seconds(timeout)),
            requires_ack: true,
            ..Default::default()
        };
        let message = Self::build_message(
            sender_id,
            Some(recipient_id.to_string()),
            None,
            None,
            MessageKind::Request,
            subject,
            body,
            &options,
        );
        let id = message.id.clone();

        let (tx, rx) = oneshot::channel();
        self.pending_requests
            .write()
            .insert(id.clone(), (tx, Utc::now() + Duration::seconds(timeout)));
        self.enqueue(message);

        match tokio::time::timeout(StdDuration::from_secs(timeout as u64), rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(AcrError::Internal(
                "request channel closed without a response".to_string(),
            )),
            Err(_) => {
                self.pending_requests.write().remove(&id);
                Err(AcrError::Expired(format!("request {id} timed out")))
            }
        }
    }

    async fn send_response_impl(&self, sender_id: &str, request_id: &str, body: Value) -> Result<String> {
        let options = SendOptions {
            requires_ack: false,
            ..Default::default()
        };
        let recipient_id = {
            let log = self.log.read();
            log.iter()
                .find(|m| m.id == request_id)
                .map(|m| m.sender_id.clone())
        };
        let Some(recipient_id) = recipient_id else {
            return Err(AcrError::not_found(request_id.to_string()));
        };

        let message = Self::build_message(
            sender_id,
            Some(recipient_id),
            None,
            Some(request_id.to_string()),
            MessageKind::Response,
            "response",
            body.clone(),
            &options,
        );
        let id = message.id.clone();
        self.push_log(message);
        self.resolve_pending_request(request_id, Ok(body));
        Ok(id)
    }

    fn subscribe_impl(&self, agent_id: &str, topic: &str, filter: Option<TopicFilter>) -> String {
        let id = generate_id("sub");
        self.subscriptions
            .write()
            .entry(topic.to_string())
            .or_default()
            .push(Subscription {
                id: id.clone(),
                subscriber_id: agent_id.to_string(),
                topic: topic.to_string(),
                filter,
            });
        id
    }

    fn unsubscribe_impl(&self, subscription_id: &str) -> bool {
        let mut subs = self.subscriptions.write();
        for list in subs.values_mut() {
            if let Some(pos) = list.iter().position(|s| s.id == subscription_id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    fn register_handler_impl(&self, agent_id: &str, handler: Arc<dyn MessageHandler>) {
        self.recipients
            .write()
            .entry(agent_id.to_string())
            .or_default()
            .handlers
            .push(handler);
    }

    fn register_request_handler_impl(&self, agent_id: &str, handler: Arc<dyn RequestHandler>) {
        self.recipients
            .write()
            .entry(agent_id.to_string())
            .or_default()
            .request_handler = Some(handler);
    }

    async fn get_messages_impl(&self, recipient_id: &str) -> Result<Vec<Message>> {
        let mut recipients = self.recipients.write();
        let Some(state) = recipients.get_mut(recipient_id) else {
            return Ok(Vec::new());
        };

        let now = Utc::now();
        let mut drained = Vec::new();
        while let Some(mut message) = state.queue.pop_front() {
            if message.is_expired(now) {
                message.status = MessageStatus::Expired;
                self.update_log_status(&message.id, MessageStatus::Expired);
                self.stats.write().messages_expired += 1;
                self.emit(AcrEvent::MessageExpired {
                    message_id: message.id,
                });
                continue;
            }

            message.status = MessageStatus::Sent;
            message.delivery_attempts += 1;
            message.last_attempt_at = Some(now);

            if message.requires_ack {
                self.pending_ack.write().insert(message.id.clone(), message.clone());
            } else {
                message.status = MessageStatus::Delivered;
                message.acknowledged = true;
                message.acknowledged_at = Some(now);
                self.update_log_status(&message.id, MessageStatus::Delivered);
                self.stats.write().messages_delivered += 1;
                self.emit(AcrEvent::MessageDelivered {
                    message_id: message.id.clone(),
                });
            }
            drained.push(message);
        }
        Ok(drained)
    }

    async fn acknowledge_impl(&self, message_id: &str) -> Result<bool> {
        let Some(mut message) = self.pending_ack.write().remove(message_id) else {
            return Ok(false);
        };
        let now = Utc::now();
        message.status = MessageStatus::Delivered;
        message.acknowledged = true;
        message.acknowledged_at = Some(now);
        self.update_log_status(message_id, MessageStatus::Delivered);
        self.stats.write().messages_delivered += 1;
        self.emit(AcrEvent::MessageDelivered {
            message_id: message_id.to_string(),
        });

        if message.kind == MessageKind::Response {
            if let Some(request_id) = &message.request_id {
                self.resolve_pending_request(request_id, Ok(message.body.clone()));
            }
        }
        Ok(true)
    }

    async fn mark_as_read_impl(&self, message_id: &str) -> Result<bool> {
        self.update_log_status(message_id, MessageStatus::Read);
        Ok(true)
    }

    async fn get_history_impl(&self, filter: MessageHistoryFilter) -> Result<Vec<Message>> {
        let log = self.log.read();
        Ok(log
            .iter()
            .filter(|m| {
                filter
                    .sender_id
                    .as_ref()
                    .map(|s| &m.sender_id == s)
                    .unwrap_or(true)
            })
            .filter(|m| {
                filter
                    .recipient_id
                    .as_ref()
                    .map(|r| m.recipient_id.as_deref() == Some(r.as_str()))
                    .unwrap_or(true)
            })
            .filter(|m| filter.kind.map(|k| m.kind == k).unwrap_or(true))
            .filter(|m| {
                filter
                    .topic
                    .as_ref()
                    .map(|t| m.topic.as_deref() == Some(t.as_str()))
                    .unwrap_or(true)
            })
            .filter(|m| filter.since.map(|since| m.created_at >= since).unwrap_or(true))
            .cloned()
            .collect())
    }

    fn get_stats_impl(&self) -> MessageBusStats {
        *self.stats.read()
    }

    async fn process_tick_impl(&self, now: DateTime<Utc>) {
        let recipient_ids: Vec<String> = self.recipients.read().keys().cloned().collect();

        for recipient_id in recipient_ids {
            loop {
                let next = {
                    let mut recipients = self.recipients.write();
                    let Some(state) = recipients.get_mut(&recipient_id) else {
                        break;
                    };
                    let Some(front) = state.queue.front() else {
                        break;
                    };

                    if front.is_expired(now) {
                        state.queue.pop_front()
                    } else if !state.handlers.is_empty()
                        || (front.kind == MessageKind::Request && state.request_handler.is_some())
                    {
                        state.queue.pop_front()
                    } else {
                        break;
                    }
                };

                let Some(mut message) = next else { break };

                if message.is_expired(now) {
                    message.status = MessageStatus::Expired;
                    self.update_log_status(&message.id, MessageStatus::Expired);
                    self.stats.write().messages_expired += 1;
                    self.emit(AcrEvent::MessageExpired {
                        message_id: message.id,
                    });
                    continue;
                }

                message.status = MessageStatus::Sent;
                message.delivery_attempts += 1;
                message.last_attempt_at = Some(now);

                if message.kind == MessageKind::Request {
                    let handler = {
                        let recipients = self.recipients.read();
                        recipients
                            .get(&recipient_id)
                            .and_then(|s| s.request_handler.clone())
                    };
                    match handler {
                        Some(handler) => match handler.handle(&message) {
                            Ok(value) => {
                                self.update_log_status(&message.id, MessageStatus::Delivered);
                                self.stats.write().messages_delivered += 1;
                                self.emit(AcrEvent::MessageDelivered {
                                    message_id: message.id.clone(),
                                });
                                self.resolve_pending_request(&message.id, Ok(value));
                            }
                            Err(err) => {
                                self.stats.write().handler_errors += 1;
                                self.update_log_status(&message.id, MessageStatus::Failed);
                                self.emit(AcrEvent::HandlerError {
                                    message_id: message.id.clone(),
                                    reason: err.to_string(),
                                });
                                self.resolve_pending_request(
                                    &message.id,
                                    Err(AcrError::HandlerError(err.to_string())),
                                );
                            }
                        },
                        None => continue,
                    }
                    continue;
                }

                let handlers = {
                    let recipients = self.recipients.read();
                    recipients
                        .get(&recipient_id)
                        .map(|s| s.handlers.clone())
                        .unwrap_or_default()
                };

                let mut failed = false;
                for handler in &handlers {
                    if let Err(err) = handler.handle(&message) {
                        failed = true;
                        self.stats.write().handler_errors += 1;
                        self.stats.write().delivery_failures += 1;
                        self.update_log_status(&message.id, MessageStatus::Failed);
                        self.emit(AcrEvent::HandlerError {
                            message_id: message.id.clone(),
                            reason: err.to_string(),
                        });
                        self.emit(AcrEvent::DeliveryFailed {
                            message_id: message.id.clone(),
                            reason: err.to_string(),
                        });
                        break;
                    }
                }

                if failed {
                    message.status = MessageStatus::Failed;
                    let mut recipients = self.recipients.write();
                    if let Some(state) = recipients.get_mut(&recipient_id) {
                        state.queue.push_front(message);
                    }
                    break;
                }

                if message.requires_ack {
                    self.pending_ack.write().insert(message.id.clone(), message);
                } else {
                    self.update_log_status(&message.id, MessageStatus::Delivered);
                    self.stats.write().messages_delivered += 1;
                    self.emit(AcrEvent::MessageDelivered {
                        message_id: message.id,
                    });
                }
            }
        }

        let expired_requests: Vec<String> = {
            let pending = self.pending_requests.read();
            pending
                .iter()
                .filter(|(_, (_, expires_at))| *expires_at <= now)
                .map(|(id, _)| id.clone())
                .collect()
        };
        for request_id in expired_requests {
            self.resolve_pending_request(
                &request_id,
                Err(AcrError::Expired(format!("request {request_id} timed out"))),
            );
        }

        let expired_pending_ack: Vec<String> = {
            let pending_ack = self.pending_ack.read();
            pending_ack
                .values()
                .filter(|m| m.is_expired(now))
                .map(|m| m.id.clone())
                .collect()
        };
        for message_id in expired_pending_ack {
            self.pending_ack.write().remove(&message_id);
            self.update_log_status(&message_id, MessageStatus::Expired);
            self.stats.write().messages_expired += 1;
            self.emit(AcrEvent::MessageExpired { message_id });
        }
    }
}

/// Narrow publishing seam for subsystems (the progress tracker) that only
/// need to emit onto a topic, not the full bus contract.
impl acr_core::traits::TopicPublisher for InMemoryMessageBus {
    fn publish(
        &self,
        topic: &str,
        subject: &str,
        body: Value,
        priority: Priority,
    ) -> Result<String> {
        let options = SendOptions {
            priority: Some(priority),
            ..Default::default()
        };
        self.publish_to_topic_sync("runtime", topic, subject, body, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acr_core::agent::{Agent, AgentFilter, AgentStatus, Role, Surface};
    use std::collections::HashSet;

    struct FakeDirectory {
        agents: Vec<Agent>,
    }

    impl AgentDirectory for FakeDirectory {
        fn get(&self, agent_id: &str) -> Option<Agent> {
            self.agents.iter().find(|a| a.id == agent_id).cloned()
        }

        fn discover(&self, _filter: &AgentFilter) -> Vec<Agent> {
            self.agents.clone()
        }

        fn live_agents(&self) -> Vec<Agent> {
            self.agents
                .iter()
                .filter(|a| a.status.is_live())
                .cloned()
                .collect()
        }
    }

    fn fake_agent(id: &str) -> Agent {
        Agent {
            id: id.to_string(),
            role: Role::Implementer,
            capabilities: vec![],
            status: AgentStatus::Active,
            parent: None,
            children: HashSet::new(),
            surface: Surface::Cli,
            session: "s-1".to_string(),
            registered_at: Utc::now(),
            last_heartbeat: Utc::now(),
            last_activity: Utc::now(),
            current_task_id: None,
            metadata: Default::default(),
        }
    }

    fn bus_with_agents(agents: Vec<Agent>) -> InMemoryMessageBus {
        InMemoryMessageBus::with_directory(Arc::new(FakeDirectory { agents }))
    }

    #[tokio::test]
    async fn get_messages_returns_priority_order() {
        let bus = bus_with_agents(vec![]);
        let low = SendOptions {
            priority: Some(Priority::Low),
            ..Default::default()
        };
        let critical = SendOptions {
            priority: Some(Priority::Critical),
            ..Default::default()
        };
        let normal = SendOptions {
            priority: Some(Priority::Normal),
            ..Default::default()
        };

        bus.send_to_agent("s", "r", MessageKind::Direct, "m-low", Value::Null, low)
            .await
            .unwrap();
        bus.send_to_agent("s", "r", MessageKind::Direct, "m-crit", Value::Null, critical)
            .await
            .unwrap();
        bus.send_to_agent("s", "r", MessageKind::Direct, "m-norm", Value::Null, normal)
            .await
            .unwrap();

        let messages = bus.get_messages("r").await.unwrap();
        let subjects: Vec<&str> = messages.iter().map(|m| m.subject.as_str()).collect();
        assert_eq!(subjects, vec!["m-crit", "m-norm", "m-low"]);
    }

    #[tokio::test]
    async fn broadcast_with_zero_recipients_logs_once() {
        let bus = bus_with_agents(vec![]);
        bus.broadcast_to_all("s", "subject", Value::Null, SendOptions::default())
            .await
            .unwrap();
        assert_eq!(bus.get_stats().broadcasts_sent, 1);
        let history = bus
            .get_history(MessageHistoryFilter::default())
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn broadcast_excludes_sender_and_fans_out_to_live_agents() {
        let bus = bus_with_agents(vec![fake_agent("a"), fake_agent("b")]);
        bus.broadcast_to_all("a", "subject", Value::Null, SendOptions::default())
            .await
            .unwrap();

        let delivered = bus.get_messages("b").await.unwrap();
        assert_eq!(delivered.len(), 1);
        let none_for_sender = bus.get_messages("a").await.unwrap();
        assert!(none_for_sender.is_empty());
    }
}
