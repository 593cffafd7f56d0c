//! # tac-core
//!
//! Board model for the Tac marble game: fields, marbles, the single-marble
//! move rule with bumping, the undo history and the wire envelope used to
//! broadcast full board states.
//!
//! ## Board layout
//!
//! ```text
//! index  0..64   circle fields (idx 0..63)
//! index 64..80   target fields, 4 per player (player 0..3, idx 0..3)
//! index 80..96   home fields,   4 per player (player 0..3, idx 0..3)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use tac_core::{apply_move, initial_fields};
//!
//! let fields = initial_fields();
//! // Move player 0's first home marble onto circle field 0.
//! let next = apply_move(&fields, 80, 0).unwrap();
//! assert!(next[0].has_marble());
//! assert!(!next[80].has_marble());
//! ```

pub mod board;
pub mod controller;
mod error;
mod game_id;
pub mod history;
pub mod protocol;
pub mod types;

pub use board::{
    apply_move, first_empty_home_slot, home_index, initial_fields, marble_count, target_index,
    validate_layout, CIRCLE_FIELDS, FIELD_COUNT, SLOTS_PER_PLAYER,
};
pub use controller::{BoardController, ClickOutcome};
pub use error::{GameIdError, LayoutError, MoveError, ProtocolError};
pub use game_id::{GameId, GAME_ID_ALPHABET, GAME_ID_LEN};
pub use history::History;
pub use protocol::{decode_game_update, BroadcastEnvelope, GameUpdatePayload, GAME_UPDATE_EVENT};
pub use types::{Field, FieldKind, Marble, PlayerId, PLAYER_COLORS, PLAYER_COUNT};
