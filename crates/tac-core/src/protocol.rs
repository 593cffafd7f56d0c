//! Broadcast wire format.
//!
//! Every message on a game topic is an envelope `{"event": ..., "payload": ...}`.
//! The only recognized event is [`GAME_UPDATE_EVENT`], whose payload carries
//! the complete field sequence. Updates are never incremental.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::board::validate_layout;
use crate::error::ProtocolError;
use crate::types::Field;

/// Event name of a full-board update.
pub const GAME_UPDATE_EVENT: &str = "gameUpdate";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameUpdatePayload {
    pub fields: Vec<Field>,
}

/// A broadcast message as sent over the realtime topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastEnvelope {
    pub event: String,
    pub payload: Value,
}

impl BroadcastEnvelope {
    /// Builds a game update envelope for `fields`.
    pub fn game_update(fields: Vec<Field>) -> Result<Self, ProtocolError> {
        Ok(Self {
            event: GAME_UPDATE_EVENT.to_string(),
            payload: serde_json::to_value(GameUpdatePayload { fields })?,
        })
    }

    pub fn to_value(&self) -> Result<Value, ProtocolError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Extracts the board from an inbound envelope.
///
/// Returns `Ok(None)` for anything that is not a game update, and an error
/// for a game update whose payload is not a valid board.
pub fn decode_game_update(message: &Value) -> Result<Option<Vec<Field>>, ProtocolError> {
    if message.get("event").and_then(Value::as_str) != Some(GAME_UPDATE_EVENT) {
        return Ok(None);
    }

    let raw = message
        .get("payload")
        .and_then(|payload| payload.get("fields"))
        .filter(|fields| !fields.is_null())
        .ok_or(ProtocolError::MissingFields)?;
    let fields: Vec<Field> = serde_json::from_value(raw.clone())?;
    validate_layout(&fields)?;
    Ok(Some(fields))
}
