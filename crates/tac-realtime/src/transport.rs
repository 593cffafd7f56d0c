//! Realtime transport seam.
//!
//! A transport turns a topic name into a confirmed subscription: a publisher
//! for outbound broadcasts plus a stream of inbound signals. The channel
//! owns reconnect policy; transports make exactly one attempt per call.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tac_core::BroadcastEnvelope;
use tokio::sync::mpsc;

use crate::error::RealtimeResult;
use crate::event::DisconnectReason;

/// What a live subscription delivers.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundSignal {
    /// A broadcast envelope (`{"event": ..., "payload": ...}`) from another client.
    Broadcast(Value),
    /// The subscription ended. Nothing follows.
    Closed(DisconnectReason),
}

/// Outbound half of a subscription.
#[async_trait]
pub trait TopicPublisher: Send + Sync {
    /// Sends a broadcast to the other subscribers of the topic.
    async fn publish(&self, envelope: &BroadcastEnvelope) -> RealtimeResult<()>;

    /// Releases the subscription. Idempotent.
    fn close(&self);
}

/// A confirmed subscription.
pub struct Subscription {
    pub publisher: Arc<dyn TopicPublisher>,
    pub inbound: mpsc::Receiver<InboundSignal>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    /// Subscribes to `topic`, resolving once the server confirms.
    async fn subscribe(&self, topic: &str) -> RealtimeResult<Subscription>;
}
