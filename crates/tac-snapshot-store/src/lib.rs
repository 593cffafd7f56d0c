//! Snapshot persistence for Tac games.
//!
//! A game's board is stored in two places:
//!
//! ```text
//! SnapshotStore
//!   ├── DurableStore  (remote source of truth, e.g. Supabase `games` table)
//!   └── LocalCache    (SQLite key/value table, read-through fallback)
//! ```
//!
//! Reads try the durable store first and fall back to the cache. Reads
//! never fail: errors are logged and treated as "no snapshot". Writes go to
//! the cache first and then to the durable store; only the durable leg can
//! report an error, and it never rolls back the cache.

mod cache;
mod durable;
mod error;
mod memory;
mod store;
mod supabase;

pub use cache::LocalCache;
pub use durable::{DurableStore, GameRecord};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryDurableStore;
pub use store::SnapshotStore;
pub use supabase::SupabaseStore;
