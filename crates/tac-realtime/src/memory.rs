//! In-process [`RealtimeTransport`] with failure injection.
//!
//! Several channels sharing one broker behave like clients on the same
//! realtime server: a publish reaches every other subscriber of the topic,
//! never the publisher itself.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tac_core::BroadcastEnvelope;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{RealtimeError, RealtimeResult};
use crate::event::DisconnectReason;
use crate::transport::{InboundSignal, RealtimeTransport, Subscription, TopicPublisher};

const INBOUND_CAPACITY: usize = 256;

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<InboundSignal>,
}

#[derive(Default)]
struct BrokerState {
    topics: HashMap<String, Vec<Subscriber>>,
    published: HashMap<String, Vec<Value>>,
    fail_next: u32,
    attempts: usize,
    next_id: u64,
}

#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` subscribe calls fail.
    pub fn fail_next_subscriptions(&self, n: u32) {
        self.state.lock().expect("lock poisoned").fail_next = n;
    }

    /// Total subscribe calls seen, failed ones included.
    pub fn subscribe_attempts(&self) -> usize {
        self.state.lock().expect("lock poisoned").attempts
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.state
            .lock()
            .expect("lock poisoned")
            .topics
            .get(topic)
            .map_or(0, Vec::len)
    }

    /// Ends every subscription on `topic` with `reason`, as a server-side
    /// close would.
    pub fn drop_subscribers(&self, topic: &str, reason: DisconnectReason) {
        let dropped = self
            .state
            .lock()
            .expect("lock poisoned")
            .topics
            .remove(topic)
            .unwrap_or_default();
        debug!(topic, count = dropped.len(), "Dropping subscribers");
        for subscriber in dropped {
            let _ = subscriber.tx.try_send(InboundSignal::Closed(reason.clone()));
        }
    }

    /// Delivers a raw message to every subscriber of `topic`.
    pub fn inject(&self, topic: &str, message: Value) {
        let state = self.state.lock().expect("lock poisoned");
        for subscriber in state.topics.get(topic).into_iter().flatten() {
            let _ = subscriber
                .tx
                .try_send(InboundSignal::Broadcast(message.clone()));
        }
    }

    /// Every envelope published on `topic`, oldest first.
    pub fn published(&self, topic: &str) -> Vec<Value> {
        self.state
            .lock()
            .expect("lock poisoned")
            .published
            .get(topic)
            .cloned()
            .unwrap_or_default()
    }

    fn remove(&self, topic: &str, id: u64) {
        let mut state = self.state.lock().expect("lock poisoned");
        if let Some(subscribers) = state.topics.get_mut(topic) {
            subscribers.retain(|s| s.id != id);
        }
    }
}

#[async_trait]
impl RealtimeTransport for MemoryBroker {
    async fn subscribe(&self, topic: &str) -> RealtimeResult<Subscription> {
        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        let id = {
            let mut state = self.state.lock().expect("lock poisoned");
            state.attempts += 1;
            if state.fail_next > 0 {
                state.fail_next -= 1;
                return Err(RealtimeError::Rejected("injected failure".to_string()));
            }
            state.next_id += 1;
            let id = state.next_id;
            state
                .topics
                .entry(topic.to_string())
                .or_default()
                .push(Subscriber { id, tx });
            id
        };

        Ok(Subscription {
            publisher: Arc::new(MemoryPublisher {
                broker: self.clone(),
                topic: topic.to_string(),
                id,
            }),
            inbound: rx,
        })
    }
}

struct MemoryPublisher {
    broker: MemoryBroker,
    topic: String,
    id: u64,
}

#[async_trait]
impl TopicPublisher for MemoryPublisher {
    async fn publish(&self, envelope: &BroadcastEnvelope) -> RealtimeResult<()> {
        let message = envelope.to_value()?;
        let mut state = self.broker.state.lock().expect("lock poisoned");

        let subscribers = state.topics.get(&self.topic);
        if !subscribers.is_some_and(|subs| subs.iter().any(|s| s.id == self.id)) {
            return Err(RealtimeError::Send("not subscribed".to_string()));
        }
        for subscriber in subscribers.into_iter().flatten() {
            if subscriber.id != self.id {
                let _ = subscriber
                    .tx
                    .try_send(InboundSignal::Broadcast(message.clone()));
            }
        }

        state
            .published
            .entry(self.topic.clone())
            .or_default()
            .push(message);
        Ok(())
    }

    fn close(&self) {
        self.broker.remove(&self.topic, self.id);
    }
}
