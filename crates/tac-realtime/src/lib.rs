//! # tac-realtime
//!
//! Keeps clients on the same game in sync. A [`ReplicationChannel`]
//! subscribes to the game's broadcast topic, persists and broadcasts local
//! board updates, turns inbound broadcasts into events, and falls back to
//! local-only mode when the realtime service stays unreachable.
//!
//! ```text
//! SessionDirector ──send_update──▶ ReplicationChannel ──publish──▶ RealtimeTransport
//!        ▲                           │        │                      ├── SupabaseRealtimeTransport
//!        └──────── EventBus ◀────────┘        │                      └── MemoryBroker
//!                                             └──put──▶ SnapshotStore
//! ```
//!
//! Topics are named `game-<id>` and carry `gameUpdate` envelopes holding the
//! full board.

mod bus;
mod channel;
mod error;
mod event;
mod memory;
mod phoenix;
mod supabase;
mod transport;

pub use bus::{listener, EventBus, Listener};
pub use channel::{ChannelConfig, ReplicationChannel, SendDisposition};
pub use error::{RealtimeError, RealtimeResult};
pub use event::{ChannelEvent, ChannelEventKind, ChannelPhase, ConnectionState, DisconnectReason};
pub use memory::MemoryBroker;
pub use phoenix::PhoenixMessage;
pub use supabase::SupabaseRealtimeTransport;
pub use transport::{InboundSignal, RealtimeTransport, Subscription, TopicPublisher};
