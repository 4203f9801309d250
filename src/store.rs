//! Key-value store capability.
//!
//! One flat namespace of JSON values that survives restarts. Handlers
//! receive the store as an injected capability so tests can substitute
//! [`MemoryStore`] and assert on the exact read/write sequence.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors raised by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read store file: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to write store file: {0}")]
    Write(#[source] std::io::Error),

    #[error("store file holds invalid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("failed to encode store contents: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Async get/set of JSON values by key.
///
/// Calls may interleave arbitrarily with other event handlers; nothing here
/// provides read-modify-write atomicity. Callers that read, modify, and
/// write back (the suggestion recorder does) are last-write-wins.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Returns the stored value for `key`, or `None` if the key is unset.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}
