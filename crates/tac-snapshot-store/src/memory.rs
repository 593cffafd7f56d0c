//! In-memory [`DurableStore`] with failure injection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tac_core::GameId;

use crate::durable::{DurableStore, GameRecord};
use crate::error::{StoreError, StoreResult};

/// Durable store kept in a map. Used by tests and offline demos.
#[derive(Debug, Default)]
pub struct MemoryDurableStore {
    records: Mutex<HashMap<GameId, GameRecord>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    upserts: AtomicUsize,
}

impl MemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `fetch` fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `upsert` fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns the stored record, bypassing failure injection.
    pub fn record(&self, id: &GameId) -> Option<GameRecord> {
        self.records.lock().expect("lock poisoned").get(id).cloned()
    }

    /// Stores a record directly, bypassing failure injection.
    pub fn insert(&self, record: GameRecord) {
        self.records
            .lock()
            .expect("lock poisoned")
            .insert(record.id.clone(), record);
    }

    /// Number of successful upserts.
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DurableStore for MemoryDurableStore {
    async fn fetch(&self, id: &GameId) -> StoreResult<Option<GameRecord>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read failure injected".to_string()));
        }
        Ok(self.record(id))
    }

    async fn upsert(&self, record: &GameRecord) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write failure injected".to_string()));
        }
        self.insert(record.clone());
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
