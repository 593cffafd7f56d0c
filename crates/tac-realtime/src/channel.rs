//! Replication channel state machine.
//!
//! ```text
//!            connect(id)                subscribed
//!   Idle ─────────────────▶ Connecting ───────────▶ Live
//!    ▲                        ▲    │                  │
//!    │ disconnect()           │    │ failed           │ closed / error
//!    │ (from any state)       │    ▼                  ▼
//!    │                     sleep(attempt × base) ◀── Reconnecting
//!    │                                                │ attempts == max
//!    │                                                ▼
//!    └───────────────────────────────────────────── LocalOnly
//! ```
//!
//! One driver task runs the subscribe / pump / retry loop per connection
//! generation, and one outbound worker per generation persists and
//! publishes local updates in the order they were sent. `disconnect` bumps
//! the generation so results of work that was already in flight are
//! ignored.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tac_core::{decode_game_update, BroadcastEnvelope, Field, GameId};
use tac_snapshot_store::SnapshotStore;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bus::EventBus;
use crate::event::{ChannelEvent, ChannelPhase, ConnectionState, DisconnectReason};
use crate::transport::{InboundSignal, RealtimeTransport, Subscription, TopicPublisher};

/// Reconnect policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Consecutive failures after which the channel goes local-only.
    pub max_reconnect_attempts: u32,
    /// The n-th retry waits n times this.
    pub reconnect_base_delay: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 5,
            reconnect_base_delay: Duration::from_secs(1),
        }
    }
}

impl ChannelConfig {
    /// Delay before retry number `attempt` (1-based).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.reconnect_base_delay * attempt
    }
}

/// What happened to an update passed to [`ReplicationChannel::send_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendDisposition {
    /// Queued for persistence and broadcast.
    Broadcast,
    /// Queued for persistence and echoed to local listeners (local-only mode).
    LocalEcho,
    /// Queued for persistence only; a game is bound but no subscription is
    /// live (connecting, or waiting to retry).
    Persisted,
    /// Not sent: no game is bound, or the update was suppressed.
    Dropped,
}

struct Outbound {
    fields: Vec<Field>,
    publish: bool,
}

struct ChannelState {
    phase: ChannelPhase,
    game_id: Option<GameId>,
    attempts: u32,
    generation: u64,
    driver: Option<JoinHandle<()>>,
    publisher: Option<Arc<dyn TopicPublisher>>,
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            phase: ChannelPhase::Idle,
            game_id: None,
            attempts: 0,
            generation: 0,
            driver: None,
            publisher: None,
            outbound: None,
        }
    }
}

struct Inner {
    config: ChannelConfig,
    transport: Option<Arc<dyn RealtimeTransport>>,
    store: SnapshotStore,
    events: EventBus,
    state: Mutex<ChannelState>,
}

/// Handle to one client's replication channel. Clones share the channel.
#[derive(Clone)]
pub struct ReplicationChannel {
    inner: Arc<Inner>,
}

impl ReplicationChannel {
    /// Creates an idle channel. Without a transport every connect goes
    /// straight to local-only mode.
    pub fn new(
        config: ChannelConfig,
        transport: Option<Arc<dyn RealtimeTransport>>,
        store: SnapshotStore,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                store,
                events: EventBus::new(),
                state: Mutex::new(ChannelState::default()),
            }),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn phase(&self) -> ChannelPhase {
        self.inner.lock().phase
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.phase().into()
    }

    pub fn game_id(&self) -> Option<GameId> {
        self.inner.lock().game_id.clone()
    }

    /// Consecutive failed connects since the last successful subscription.
    pub fn attempts(&self) -> u32 {
        self.inner.lock().attempts
    }

    pub fn has_transport(&self) -> bool {
        self.inner.transport.is_some()
    }

    /// Starts connecting to `game_id`, releasing any current binding first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self, game_id: GameId) {
        let Some(transport) = self.inner.transport.clone() else {
            info!(game_id = %game_id, "No realtime transport, using local-only mode");
            self.connect_local_only(game_id);
            return;
        };

        self.disconnect();
        info!(game_id = %game_id, "Connecting to game channel");

        let mut state = self.inner.lock();
        let generation = self.inner.begin(&mut state, game_id.clone(), ChannelPhase::Connecting);
        let inner = self.inner.clone();
        state.driver = Some(tokio::spawn(run_driver(
            inner, transport, generation, game_id,
        )));
    }

    /// Binds to `game_id` without a realtime subscription. Updates are
    /// persisted and echoed locally.
    pub fn connect_local_only(&self, game_id: GameId) {
        self.disconnect();
        info!(game_id = %game_id, "Using local-only mode (no live sync)");

        {
            let mut state = self.inner.lock();
            self.inner.begin(&mut state, game_id.clone(), ChannelPhase::LocalOnly);
        }
        self.inner.events.emit(&ChannelEvent::Connected {
            game_id,
            local_only: true,
        });
    }

    /// Returns to idle: cancels pending retries, releases the subscription
    /// and resets the attempt counter. Does nothing when already idle.
    pub fn disconnect(&self) {
        let (driver, publisher) = {
            let mut state = self.inner.lock();
            if state.phase == ChannelPhase::Idle && state.game_id.is_none() {
                return;
            }
            debug!(game_id = ?state.game_id, phase = ?state.phase, "Disconnecting channel");
            state.generation += 1;
            state.phase = ChannelPhase::Idle;
            state.game_id = None;
            state.attempts = 0;
            state.outbound = None;
            (state.driver.take(), state.publisher.take())
        };

        if let Some(driver) = driver {
            driver.abort();
        }
        if let Some(publisher) = publisher {
            publisher.close();
        }
    }

    /// Persists `fields` and shares them according to the current phase.
    pub fn send_update(&self, fields: Vec<Field>) -> SendDisposition {
        let (disposition, game_id) = {
            let state = self.inner.lock();
            let (Some(game_id), Some(outbound)) = (&state.game_id, &state.outbound) else {
                debug!("No game bound, dropping update");
                return SendDisposition::Dropped;
            };
            let (disposition, publish) = match state.phase {
                ChannelPhase::Live => (SendDisposition::Broadcast, true),
                ChannelPhase::LocalOnly => (SendDisposition::LocalEcho, false),
                ChannelPhase::Connecting | ChannelPhase::Reconnecting => {
                    debug!(game_id = %game_id, phase = ?state.phase, "Not live, persisting only");
                    (SendDisposition::Persisted, false)
                }
                ChannelPhase::Idle => {
                    debug!(game_id = %game_id, "Channel idle, dropping update");
                    return SendDisposition::Dropped;
                }
            };
            let queued = outbound.send(Outbound {
                fields: fields.clone(),
                publish,
            });
            if queued.is_err() {
                warn!(game_id = %game_id, "Outbound worker stopped, dropping update");
                return SendDisposition::Dropped;
            }
            (disposition, game_id.clone())
        };

        if disposition == SendDisposition::LocalEcho {
            self.inner
                .events
                .emit(&ChannelEvent::GameUpdate { game_id, fields });
        }
        disposition
    }
}

impl std::fmt::Debug for ReplicationChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("ReplicationChannel")
            .field("phase", &state.phase)
            .field("game_id", &state.game_id)
            .field("attempts", &state.attempts)
            .finish_non_exhaustive()
    }
}

enum RetryDecision {
    Retry { attempt: u32, delay: Duration },
    Fallback,
    Stale,
}

impl Inner {
    fn lock(&self) -> std::sync::MutexGuard<'_, ChannelState> {
        self.state.lock().expect("lock poisoned")
    }

    /// Binds a fresh generation to `game_id` and starts its outbound worker.
    fn begin(self: &Arc<Self>, state: &mut ChannelState, game_id: GameId, phase: ChannelPhase) -> u64 {
        state.generation += 1;
        state.phase = phase;
        state.game_id = Some(game_id.clone());
        state.attempts = 0;

        let (tx, rx) = mpsc::unbounded_channel();
        state.outbound = Some(tx);
        tokio::spawn(run_outbound(self.clone(), state.generation, game_id, rx));
        state.generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    /// Records a confirmed subscription. Returns false if the generation is stale.
    fn go_live(&self, generation: u64, publisher: Arc<dyn TopicPublisher>) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        state.phase = ChannelPhase::Live;
        state.attempts = 0;
        state.publisher = Some(publisher);
        true
    }

    /// Counts a failure and decides what comes next.
    fn record_failure(&self, generation: u64) -> RetryDecision {
        let mut state = self.lock();
        if state.generation != generation {
            return RetryDecision::Stale;
        }
        state.publisher = None;
        state.attempts += 1;
        if state.attempts >= self.config.max_reconnect_attempts {
            state.phase = ChannelPhase::LocalOnly;
            RetryDecision::Fallback
        } else {
            state.phase = ChannelPhase::Reconnecting;
            RetryDecision::Retry {
                attempt: state.attempts,
                delay: self.config.retry_delay(state.attempts),
            }
        }
    }

    fn begin_attempt(&self, generation: u64) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        state.phase = ChannelPhase::Connecting;
        true
    }

    fn emit_if_current(&self, generation: u64, event: ChannelEvent) {
        if self.is_current(generation) {
            self.events.emit(&event);
        }
    }
}

/// Subscribe, pump inbound messages, retry with linear backoff, fall back.
async fn run_driver(
    inner: Arc<Inner>,
    transport: Arc<dyn RealtimeTransport>,
    generation: u64,
    game_id: GameId,
) {
    let topic = game_id.topic();
    loop {
        if !inner.begin_attempt(generation) {
            return;
        }

        match transport.subscribe(&topic).await {
            Ok(subscription) => {
                let publisher = subscription.publisher.clone();
                if !inner.go_live(generation, publisher.clone()) {
                    publisher.close();
                    return;
                }
                info!(game_id = %game_id, "Connected to game channel");
                inner.emit_if_current(
                    generation,
                    ChannelEvent::Connected {
                        game_id: game_id.clone(),
                        local_only: false,
                    },
                );

                let reason = pump(&inner, generation, &game_id, subscription).await;
                publisher.close();
                warn!(game_id = %game_id, reason = %reason, "Game channel disconnected");
                inner.emit_if_current(
                    generation,
                    ChannelEvent::Disconnected {
                        game_id: game_id.clone(),
                        reason,
                    },
                );
            }
            Err(err) => {
                warn!(game_id = %game_id, error = %err, "Failed to subscribe to game channel");
                inner.emit_if_current(
                    generation,
                    ChannelEvent::Error {
                        game_id: game_id.clone(),
                        message: err.to_string(),
                    },
                );
                inner.emit_if_current(
                    generation,
                    ChannelEvent::Disconnected {
                        game_id: game_id.clone(),
                        reason: err.disconnect_reason(),
                    },
                );
            }
        }

        match inner.record_failure(generation) {
            RetryDecision::Stale => return,
            RetryDecision::Fallback => {
                warn!(
                    game_id = %game_id,
                    attempts = inner.config.max_reconnect_attempts,
                    "Max reconnect attempts reached, falling back to local-only mode"
                );
                inner.emit_if_current(
                    generation,
                    ChannelEvent::Fallback {
                        game_id: game_id.clone(),
                    },
                );
                inner.emit_if_current(
                    generation,
                    ChannelEvent::Connected {
                        game_id: game_id.clone(),
                        local_only: true,
                    },
                );
                return;
            }
            RetryDecision::Retry { attempt, delay } => {
                info!(
                    game_id = %game_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Scheduling reconnect"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Forwards inbound broadcasts until the subscription ends.
async fn pump(
    inner: &Inner,
    generation: u64,
    game_id: &GameId,
    mut subscription: Subscription,
) -> DisconnectReason {
    while let Some(signal) = subscription.inbound.recv().await {
        match signal {
            InboundSignal::Broadcast(message) => match decode_game_update(&message) {
                Ok(Some(fields)) => {
                    debug!(game_id = %game_id, "Received game update");
                    inner.emit_if_current(
                        generation,
                        ChannelEvent::GameUpdate {
                            game_id: game_id.clone(),
                            fields,
                        },
                    );
                }
                Ok(None) => debug!(game_id = %game_id, "Ignoring unrecognized broadcast"),
                Err(err) => {
                    warn!(game_id = %game_id, error = %err, "Dropping malformed game update");
                }
            },
            InboundSignal::Closed(reason) => return reason,
        }
    }
    DisconnectReason::Closed
}

/// Persists, then publishes, each queued update in order.
async fn run_outbound(
    inner: Arc<Inner>,
    generation: u64,
    game_id: GameId,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
) {
    while let Some(Outbound { fields, publish }) = rx.recv().await {
        if let Err(err) = inner.store.put(&game_id, &fields).await {
            warn!(game_id = %game_id, error = %err, "Failed to persist game state");
        }

        if !publish {
            continue;
        }
        let publisher = {
            let state = inner.lock();
            if state.generation != generation {
                debug!(game_id = %game_id, "Channel rebound, skipping broadcast");
                continue;
            }
            state.publisher.clone()
        };
        let Some(publisher) = publisher else {
            debug!(game_id = %game_id, "Subscription lost, skipping broadcast");
            continue;
        };

        let envelope = match BroadcastEnvelope::game_update(fields) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(game_id = %game_id, error = %err, "Failed to encode game update");
                continue;
            }
        };
        if let Err(err) = publisher.publish(&envelope).await {
            warn!(game_id = %game_id, error = %err, "Failed to broadcast game update");
        }
    }
    debug!(game_id = %game_id, "Outbound worker stopped");
}
