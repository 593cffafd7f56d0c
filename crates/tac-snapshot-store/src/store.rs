//! Combined durable + cached snapshot store.

use std::sync::Arc;

use tac_core::{validate_layout, Field, GameId};
use tracing::{debug, warn};

use crate::cache::LocalCache;
use crate::durable::{DurableStore, GameRecord};
use crate::error::StoreResult;

/// Reads and writes game snapshots through the durable store and the
/// local cache.
#[derive(Clone)]
pub struct SnapshotStore {
    durable: Option<Arc<dyn DurableStore>>,
    cache: Arc<LocalCache>,
}

impl SnapshotStore {
    pub fn new(durable: Arc<dyn DurableStore>, cache: Arc<LocalCache>) -> Self {
        Self {
            durable: Some(durable),
            cache,
        }
    }

    /// A store without a durable backend. Writes only reach the cache.
    pub fn with_local_only(cache: Arc<LocalCache>) -> Self {
        Self {
            durable: None,
            cache,
        }
    }

    pub fn has_durable(&self) -> bool {
        self.durable.is_some()
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    /// Returns the last known board for `id`: the durable record if there is
    /// a usable one, else the cached copy. A durable hit refreshes the cache.
    pub async fn get(&self, id: &GameId) -> Option<Vec<Field>> {
        if let Some(durable) = &self.durable {
            match durable.fetch(id).await {
                Ok(Some(record)) => match validate_layout(&record.fields) {
                    Ok(()) => {
                        if let Err(err) = self.cache.save(id, &record.fields) {
                            warn!(game_id = %id, error = %err, "Failed to refresh local cache");
                        }
                        return Some(record.fields);
                    }
                    Err(err) => {
                        warn!(game_id = %id, error = %err, "Ignoring durable record with invalid layout");
                    }
                },
                Ok(None) => debug!(game_id = %id, "No durable record"),
                Err(err) => {
                    warn!(game_id = %id, error = %err, "Durable read failed, using local cache");
                }
            }
        }

        let cached = self.cache.load(id);
        if cached.is_some() {
            debug!(game_id = %id, "Loaded game from local cache");
        }
        cached
    }

    /// Saves `fields` under `id`.
    ///
    /// The cache write is best-effort and happens first. The returned error,
    /// if any, is from the durable write; the cached copy stays in place.
    pub async fn put(&self, id: &GameId, fields: &[Field]) -> StoreResult<()> {
        if let Err(err) = self.cache.save(id, fields) {
            warn!(game_id = %id, error = %err, "Failed to write local cache");
        }

        let Some(durable) = &self.durable else {
            return Ok(());
        };

        let record = GameRecord::now(id.clone(), fields.to_vec());
        durable.upsert(&record).await.inspect_err(|err| {
            warn!(game_id = %id, error = %err, "Durable write failed");
        })
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("durable", &self.durable.is_some())
            .finish_non_exhaustive()
    }
}
