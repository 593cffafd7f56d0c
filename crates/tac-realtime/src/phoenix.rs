//! Phoenix channel frames as spoken by Supabase Realtime (protocol 1.0.0).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tac_core::BroadcastEnvelope;

pub(crate) const EVENT_JOIN: &str = "phx_join";
pub(crate) const EVENT_LEAVE: &str = "phx_leave";
pub(crate) const EVENT_REPLY: &str = "phx_reply";
pub(crate) const EVENT_ERROR: &str = "phx_error";
pub(crate) const EVENT_CLOSE: &str = "phx_close";
pub(crate) const EVENT_BROADCAST: &str = "broadcast";
pub(crate) const EVENT_HEARTBEAT: &str = "heartbeat";
pub(crate) const HEARTBEAT_TOPIC: &str = "phoenix";

/// One frame on the socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

impl PhoenixMessage {
    /// Join request for a broadcast-only channel that does not hear its own
    /// messages.
    pub fn join(topic: &str, access_token: &str, reference: &str) -> Self {
        Self {
            topic: topic.to_string(),
            event: EVENT_JOIN.to_string(),
            payload: json!({
                "config": {
                    "broadcast": { "self": false, "ack": false },
                    "presence": { "key": "" }
                },
                "access_token": access_token
            }),
            reference: Some(reference.to_string()),
        }
    }

    pub fn leave(topic: &str, reference: &str) -> Self {
        Self {
            topic: topic.to_string(),
            event: EVENT_LEAVE.to_string(),
            payload: json!({}),
            reference: Some(reference.to_string()),
        }
    }

    pub fn heartbeat(reference: &str) -> Self {
        Self {
            topic: HEARTBEAT_TOPIC.to_string(),
            event: EVENT_HEARTBEAT.to_string(),
            payload: json!({}),
            reference: Some(reference.to_string()),
        }
    }

    /// Wraps an envelope as a broadcast frame.
    pub fn broadcast(topic: &str, envelope: &BroadcastEnvelope, reference: &str) -> Self {
        Self {
            topic: topic.to_string(),
            event: EVENT_BROADCAST.to_string(),
            payload: json!({
                "type": "broadcast",
                "event": envelope.event,
                "payload": envelope.payload,
            }),
            reference: Some(reference.to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// For a `phx_reply`, whether the server answered `ok`.
    pub fn reply_ok(&self) -> bool {
        self.payload.get("status").and_then(Value::as_str) == Some("ok")
    }

    /// Best-effort error text of a rejected reply.
    pub fn reply_reason(&self) -> String {
        self.payload
            .get("response")
            .map(|r| {
                r.get("reason")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| r.to_string())
            })
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Realtime channel topic for an application topic name.
pub(crate) fn channel_topic(topic: &str) -> String {
    format!("realtime:{topic}")
}
