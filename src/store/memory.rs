use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{KvStore, StoreError};

/// In-memory store, made public for integration tests.
///
/// Same contract as the file store, plus a write counter so tests can
/// assert how many times a handler wrote back.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, Value>>,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store with `entries` already present, as if a previous run
    /// had written them. Preloading does not count as a write.
    pub fn with_entries(entries: impl IntoIterator<Item = (&'static str, Value)>) -> Self {
        let map = entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();
        Self {
            map: Mutex::new(map),
            writes: AtomicU64::new(0),
        }
    }

    /// Number of `set` calls observed so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.map.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.map.lock().await.insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_counts_writes_but_not_preloads() {
        let store = MemoryStore::with_entries([("tip", json!("seed"))]);
        assert_eq!(store.write_count(), 0);

        store.set("tip", json!("next")).await.unwrap();

        assert_eq!(store.write_count(), 1);
        assert_eq!(store.get("tip").await.unwrap(), Some(json!("next")));
    }
}
