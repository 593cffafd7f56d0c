//! Session error types.

use tac_core::GameIdError;
use thiserror::Error;

/// Errors from session orchestration.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid game id: {0}")]
    InvalidGameId(#[from] GameIdError),

    #[error("Link does not name a game: {0}")]
    InvalidLink(String),

    #[error("No active game")]
    NoActiveGame,
}

/// Result type alias using SessionError.
pub type SessionResult<T> = Result<T, SessionError>;
