//! Durable store contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tac_core::{Field, GameId};

use crate::error::StoreResult;

/// One row of the `games` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: GameId,
    pub fields: Vec<Field>,
    pub updated_at: DateTime<Utc>,
}

impl GameRecord {
    /// Creates a record stamped with the current time.
    pub fn now(id: GameId, fields: Vec<Field>) -> Self {
        Self {
            id,
            fields,
            updated_at: Utc::now(),
        }
    }
}

/// Remote persistence keyed by game id.
///
/// `upsert` replaces the whole record; there is no partial update.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn fetch(&self, id: &GameId) -> StoreResult<Option<GameRecord>>;

    async fn upsert(&self, record: &GameRecord) -> StoreResult<()>;
}
