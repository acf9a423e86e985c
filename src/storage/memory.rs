use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::KeyValueStore;
use crate::error::{StorageError, StorageResult};

/// In-memory storage, used by tests and as a scratch backend.
pub struct MemoryStorage {
    slots: RwLock<HashMap<String, String>>,
    quota_bytes: usize,
}

impl MemoryStorage {
    /// Create an empty store with the given quota.
    pub fn new(quota_bytes: usize) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            quota_bytes,
        }
    }

    /// Total bytes held across all slots.
    pub async fn used_bytes(&self) -> usize {
        self.slots.read().await.values().map(String::len).sum()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(usize::MAX)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.slots.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut slots = self.slots.write().await;

        let others: usize = slots
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(_, v)| v.len())
            .sum();
        let needed = others + value.len();
        if needed > self.quota_bytes {
            return Err(StorageError::QuotaExceeded {
                needed,
                quota: self.quota_bytes,
            });
        }

        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.slots.write().await.remove(key);
        Ok(())
    }

    fn quota_bytes(&self) -> usize {
        self.quota_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryStorage::default();
        assert!(store.get("a").await.unwrap().is_none());

        store.set("a", "one").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("one"));

        store.remove("a").await.unwrap();
        assert!(store.get("a").await.unwrap().is_none());
        store.remove("a").await.unwrap();
    }

    #[tokio::test]
    async fn test_quota_counts_other_slots() {
        let store = MemoryStorage::new(10);
        store.set("a", "123456").await.unwrap();

        let err = store.set("b", "12345").await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::QuotaExceeded {
                needed: 11,
                quota: 10
            }
        ));

        // Overwriting a slot does not count its old value
        store.set("a", "1234567890").await.unwrap();
        assert_eq!(store.used_bytes().await, 10);
    }
}
