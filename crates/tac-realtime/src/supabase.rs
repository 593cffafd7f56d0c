//! Supabase Realtime transport over a Phoenix websocket.
//!
//! Each subscription opens its own socket, joins `realtime:<topic>` with
//! self-broadcast disabled and waits for the join reply. After that a writer
//! task owns the sink, a heartbeat task keeps the socket alive and a reader
//! task forwards broadcast frames until the socket or channel closes.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, Stream, StreamExt};
use tac_core::BroadcastEnvelope;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{RealtimeError, RealtimeResult};
use crate::event::DisconnectReason;
use crate::phoenix::{
    channel_topic, PhoenixMessage, EVENT_BROADCAST, EVENT_CLOSE, EVENT_ERROR, EVENT_REPLY,
};
use crate::transport::{InboundSignal, RealtimeTransport, Subscription, TopicPublisher};

const OUTBOUND_CAPACITY: usize = 100;
const INBOUND_CAPACITY: usize = 256;

/// Realtime transport for a Supabase project.
#[derive(Clone)]
pub struct SupabaseRealtimeTransport {
    endpoint: Url,
    api_key: String,
    join_timeout: Duration,
    heartbeat_interval: Duration,
}

impl SupabaseRealtimeTransport {
    /// Create a transport for the project at `project_url`
    /// (e.g. `https://xyz.supabase.co`).
    pub fn new(project_url: &Url, api_key: impl Into<String>) -> RealtimeResult<Self> {
        let api_key = api_key.into();
        Ok(Self {
            endpoint: websocket_endpoint(project_url, &api_key)?,
            api_key,
            join_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(30),
        })
    }

    pub fn with_timeouts(mut self, join_timeout: Duration, heartbeat_interval: Duration) -> Self {
        self.join_timeout = join_timeout;
        self.heartbeat_interval = heartbeat_interval;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn open(&self, topic: &str) -> RealtimeResult<Subscription> {
        info!(topic, "Connecting to Supabase Realtime");

        let (ws_stream, _) = connect_async(self.endpoint.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();

        let refs = Arc::new(AtomicU64::new(1));
        let join_ref = next_ref(&refs);
        let join = PhoenixMessage::join(topic, &self.api_key, &join_ref);
        write.send(Message::Text(join.to_json()?.into())).await?;
        debug!(topic, "Sent phx_join");

        await_join_reply(&mut read, topic, &join_ref).await?;
        info!(topic, "Joined realtime channel");

        // Writer owns the sink from here on.
        let (out_tx, mut out_rx) = mpsc::channel::<Message>(OUTBOUND_CAPACITY);
        let writer = tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if write.send(msg).await.is_err() || closing {
                    break;
                }
            }
        });

        let heartbeat_tx = out_tx.clone();
        let heartbeat_refs = refs.clone();
        let period = self.heartbeat_interval;
        let heartbeat = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let frame = PhoenixMessage::heartbeat(&next_ref(&heartbeat_refs));
                match frame.to_json() {
                    Ok(json) => {
                        if heartbeat_tx.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to encode heartbeat"),
                }
            }
        });

        let (in_tx, in_rx) = mpsc::channel(INBOUND_CAPACITY);
        let pong_tx = out_tx.clone();
        let reader_topic = topic.to_string();
        let reader = tokio::spawn(async move {
            let reason = read_loop(&mut read, &reader_topic, &in_tx, &pong_tx).await;
            debug!(topic = %reader_topic, reason = %reason, "Realtime reader stopped");
            let _ = in_tx.send(InboundSignal::Closed(reason)).await;
        });

        Ok(Subscription {
            publisher: Arc::new(SupabasePublisher {
                topic: topic.to_string(),
                outbound: out_tx,
                refs,
                closed: AtomicBool::new(false),
                writer,
                heartbeat,
                reader,
            }),
            inbound: in_rx,
        })
    }
}

#[async_trait]
impl RealtimeTransport for SupabaseRealtimeTransport {
    async fn subscribe(&self, topic: &str) -> RealtimeResult<Subscription> {
        let topic = channel_topic(topic);
        match tokio::time::timeout(self.join_timeout, self.open(&topic)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(topic = %topic, "Timed out joining realtime channel");
                Err(RealtimeError::Timeout)
            }
        }
    }
}

impl std::fmt::Debug for SupabaseRealtimeTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut endpoint = self.endpoint.clone();
        endpoint.set_query(None);
        f.debug_struct("SupabaseRealtimeTransport")
            .field("endpoint", &endpoint.as_str())
            .field("join_timeout", &self.join_timeout)
            .finish_non_exhaustive()
    }
}

/// `https://xyz.supabase.co` → `wss://xyz.supabase.co/realtime/v1/websocket?apikey=..&vsn=1.0.0`
fn websocket_endpoint(project_url: &Url, api_key: &str) -> RealtimeResult<Url> {
    let scheme = match project_url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => return Err(RealtimeError::Endpoint(format!("unsupported scheme {other}"))),
    };

    let mut endpoint = project_url.clone();
    endpoint
        .set_scheme(scheme)
        .map_err(|_| RealtimeError::Endpoint(project_url.to_string()))?;
    endpoint.set_path("/realtime/v1/websocket");
    endpoint
        .query_pairs_mut()
        .clear()
        .append_pair("apikey", api_key)
        .append_pair("vsn", "1.0.0");
    Ok(endpoint)
}

fn next_ref(refs: &AtomicU64) -> String {
    refs.fetch_add(1, Ordering::SeqCst).to_string()
}

type WsResult = Result<Message, tokio_tungstenite::tungstenite::Error>;

/// Reads frames until the reply to `join_ref` arrives.
async fn await_join_reply<S>(read: &mut S, topic: &str, join_ref: &str) -> RealtimeResult<()>
where
    S: Stream<Item = WsResult> + Unpin,
{
    while let Some(frame) = read.next().await {
        let text = match frame? {
            Message::Text(text) => text,
            Message::Close(_) => {
                return Err(RealtimeError::Closed("socket closed during join".to_string()))
            }
            _ => continue,
        };
        let msg = match PhoenixMessage::from_json(&text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, "Failed to parse realtime frame");
                continue;
            }
        };
        if msg.topic != topic {
            continue;
        }
        match msg.event.as_str() {
            EVENT_REPLY if msg.reference.as_deref() == Some(join_ref) => {
                return if msg.reply_ok() {
                    Ok(())
                } else {
                    Err(RealtimeError::Rejected(msg.reply_reason()))
                };
            }
            EVENT_ERROR => return Err(RealtimeError::Rejected("phx_error".to_string())),
            EVENT_CLOSE => return Err(RealtimeError::Closed("phx_close".to_string())),
            _ => {}
        }
    }
    Err(RealtimeError::Closed("socket closed during join".to_string()))
}

/// Forwards broadcast payloads for `topic` and answers pings. Returns why
/// the subscription ended.
async fn read_loop<S>(
    read: &mut S,
    topic: &str,
    inbound: &mpsc::Sender<InboundSignal>,
    outbound: &mpsc::Sender<Message>,
) -> DisconnectReason
where
    S: Stream<Item = WsResult> + Unpin,
{
    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let msg = match PhoenixMessage::from_json(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!(error = %e, "Failed to parse realtime frame");
                        continue;
                    }
                };
                if msg.topic != topic {
                    continue;
                }
                match msg.event.as_str() {
                    EVENT_BROADCAST => {
                        if inbound
                            .send(InboundSignal::Broadcast(msg.payload))
                            .await
                            .is_err()
                        {
                            return DisconnectReason::Closed;
                        }
                    }
                    EVENT_ERROR => return DisconnectReason::ChannelError(String::new()),
                    EVENT_CLOSE => return DisconnectReason::Closed,
                    other => debug!(event = other, "Ignoring realtime frame"),
                }
            }
            Ok(Message::Ping(data)) => {
                let _ = outbound.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) => {
                info!(topic, "Realtime socket closed");
                return DisconnectReason::Closed;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Realtime socket error");
                return DisconnectReason::ChannelError(e.to_string());
            }
        }
    }
    DisconnectReason::Closed
}

struct SupabasePublisher {
    topic: String,
    outbound: mpsc::Sender<Message>,
    refs: Arc<AtomicU64>,
    closed: AtomicBool,
    writer: JoinHandle<()>,
    heartbeat: JoinHandle<()>,
    reader: JoinHandle<()>,
}

#[async_trait]
impl TopicPublisher for SupabasePublisher {
    async fn publish(&self, envelope: &BroadcastEnvelope) -> RealtimeResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RealtimeError::Send("subscription closed".to_string()));
        }
        let frame = PhoenixMessage::broadcast(&self.topic, envelope, &next_ref(&self.refs));
        self.outbound
            .send(Message::Text(frame.to_json()?.into()))
            .await
            .map_err(|e| RealtimeError::Send(e.to_string()))
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(topic = %self.topic, "Leaving realtime channel");
        self.heartbeat.abort();
        self.reader.abort();
        // The writer drains the leave and close frames, then exits.
        if let Ok(json) = PhoenixMessage::leave(&self.topic, &next_ref(&self.refs)).to_json() {
            let _ = self.outbound.try_send(Message::Text(json.into()));
        }
        if self.outbound.try_send(Message::Close(None)).is_err() {
            self.writer.abort();
        }
    }
}

impl Drop for SupabasePublisher {
    fn drop(&mut self) {
        self.heartbeat.abort();
        self.reader.abort();
    }
}
