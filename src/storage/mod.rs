//! Key-value storage backends for the durable game slots.
//!
//! The history list and the game-state record are each one serialized JSON
//! blob under a fixed key. Backends enforce a byte quota across all slots so
//! callers can apply their overflow policy.

mod memory;
mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StorageResult;

/// Slot holding the analysis history list.
pub const HISTORY_KEY: &str = "investigator_analysis_history";
/// Slot holding the game-state record.
pub const GAME_STATE_KEY: &str = "investigator_game_state";

/// Storage backend with get/set/remove over string slots.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a slot.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;
    /// Write a slot.
    ///
    /// # Errors
    /// `StorageError::QuotaExceeded` if the write would push the total size
    /// of all slots past [`KeyValueStore::quota_bytes`].
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    /// Delete a slot. Missing slots are not an error.
    async fn remove(&self, key: &str) -> StorageResult<()>;
    /// Byte budget across all slots.
    fn quota_bytes(&self) -> usize;
}

/// Shared storage handle
pub type SharedStorage = Arc<dyn KeyValueStore>;
