//! Error types for board rules, layouts, identifiers and wire decoding.

use thiserror::Error;

use crate::types::PlayerId;

/// Reasons a single-marble move is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    /// A field index lies outside the board.
    #[error("field {index} is out of bounds (board has {len} fields)")]
    OutOfBounds { index: usize, len: usize },

    /// Source and destination are the same field.
    #[error("source and destination are the same field ({0})")]
    SameField(usize),

    /// The source field holds no marble.
    #[error("field {0} holds no marble")]
    EmptySource(usize),

    /// Target and home fields only accept their owner's marbles.
    #[error("field {field} belongs to player {owner}, marble belongs to player {player}")]
    WrongOwner {
        field: usize,
        owner: PlayerId,
        player: PlayerId,
    },

    /// A bumped marble had nowhere to go.
    #[error("player {player} has no empty home slot for a bumped marble")]
    NoHomeSlot { player: PlayerId },
}

/// Structural problems with a field sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("expected {expected} fields, found {found}")]
    WrongLength { expected: usize, found: usize },

    #[error("field {index} should be {expected}")]
    UnexpectedField { index: usize, expected: String },
}

/// Game id parse failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameIdError {
    #[error("game id is empty")]
    Empty,

    #[error("game id must be at most {max} chars, got {found}")]
    TooLong { max: usize, found: usize },

    #[error("invalid character '{ch}' at position {index}")]
    InvalidCharacter { ch: char, index: usize },
}

/// Failures decoding a recognized broadcast message.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The payload has no `fields` list.
    #[error("game update payload is missing the field list")]
    MissingFields,

    /// The field list did not deserialize.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The field list deserialized but is not a board.
    #[error("invalid board layout: {0}")]
    Layout(#[from] LayoutError),
}
