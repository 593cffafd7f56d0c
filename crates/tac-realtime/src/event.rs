//! Events and states exposed by the replication channel.

use std::fmt;

use tac_core::{Field, GameId};

/// Why a subscription ended or failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    ChannelError(String),
    Closed,
    TimedOut,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::ChannelError(detail) if detail.is_empty() => {
                f.write_str("CHANNEL_ERROR")
            }
            DisconnectReason::ChannelError(detail) => write!(f, "CHANNEL_ERROR: {detail}"),
            DisconnectReason::Closed => f.write_str("CLOSED"),
            DisconnectReason::TimedOut => f.write_str("TIMED_OUT"),
        }
    }
}

/// Something the channel reports to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The channel is usable. `local_only` is set in fallback mode.
    Connected { game_id: GameId, local_only: bool },
    Disconnected {
        game_id: GameId,
        reason: DisconnectReason,
    },
    Error { game_id: GameId, message: String },
    /// Reconnect attempts ran out; the channel is now local-only.
    Fallback { game_id: GameId },
    /// A full board arrived (remote broadcast or local-only echo).
    GameUpdate { game_id: GameId, fields: Vec<Field> },
}

impl ChannelEvent {
    pub fn kind(&self) -> ChannelEventKind {
        match self {
            ChannelEvent::Connected { .. } => ChannelEventKind::Connected,
            ChannelEvent::Disconnected { .. } => ChannelEventKind::Disconnected,
            ChannelEvent::Error { .. } => ChannelEventKind::Error,
            ChannelEvent::Fallback { .. } => ChannelEventKind::Fallback,
            ChannelEvent::GameUpdate { .. } => ChannelEventKind::GameUpdate,
        }
    }

    pub fn game_id(&self) -> &GameId {
        match self {
            ChannelEvent::Connected { game_id, .. }
            | ChannelEvent::Disconnected { game_id, .. }
            | ChannelEvent::Error { game_id, .. }
            | ChannelEvent::Fallback { game_id }
            | ChannelEvent::GameUpdate { game_id, .. } => game_id,
        }
    }
}

/// Closed set of event names listeners register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelEventKind {
    Connected,
    Disconnected,
    Error,
    Fallback,
    GameUpdate,
}

impl ChannelEventKind {
    pub const ALL: [ChannelEventKind; 5] = [
        ChannelEventKind::Connected,
        ChannelEventKind::Disconnected,
        ChannelEventKind::Error,
        ChannelEventKind::Fallback,
        ChannelEventKind::GameUpdate,
    ];
}

/// Internal state machine position of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPhase {
    Idle,
    Connecting,
    Live,
    Reconnecting,
    LocalOnly,
}

/// Coarse connection state for status displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Live,
    LocalOnly,
}

impl ConnectionState {
    /// Status indicator text.
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Live => "Connected",
            ConnectionState::LocalOnly => "Local Only",
        }
    }
}

impl From<ChannelPhase> for ConnectionState {
    fn from(phase: ChannelPhase) -> Self {
        match phase {
            ChannelPhase::Idle | ChannelPhase::Reconnecting => ConnectionState::Disconnected,
            ChannelPhase::Connecting => ConnectionState::Connecting,
            ChannelPhase::Live => ConnectionState::Live,
            ChannelPhase::LocalOnly => ConnectionState::LocalOnly,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
