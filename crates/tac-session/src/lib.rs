//! # tac-session
//!
//! Ties a board to a replication channel.
//!
//! ```text
//! click / undo ──▶ BoardController ──Moved──▶ UpdateBridge::send_local ──▶ ReplicationChannel
//!                        ▲                                                     │
//!                        └──── apply_remote ◀── UpdateBridge (flag raised) ◀───┘ GameUpdate
//! ```
//!
//! [`SessionDirector`] owns the active game: it creates and joins sessions,
//! seeds the board from the snapshot store and connects the channel.
//! [`UpdateBridge`] keeps inbound updates from being sent back out.

mod bridge;
mod director;
mod error;

pub use bridge::UpdateBridge;
pub use director::{
    game_id_from_link, parse_game_reference, share_link, SessionDirector, SHARE_QUERY_PARAM,
};
pub use error::{SessionError, SessionResult};
