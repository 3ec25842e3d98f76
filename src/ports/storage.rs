//! Storage Port - Key-Value Slot Persistence
//!
//! The history is read and written as one serialized blob under a
//! fixed key. Implementations give last-writer-wins semantics per key;
//! there is no field- or entry-level locking.

use async_trait::async_trait;

/// Whether `key` is a usable slot key: non-empty, `[A-Za-z0-9_-]` only.
pub fn is_valid_key(key: &str) -> bool {
  !key.is_empty()
    && key
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Trait for key-value storage providers.
///
/// Values are opaque strings (the history store writes JSON).
#[async_trait]
pub trait KeyValueStorage: Send + Sync + 'static {
  /// Read the value stored under `key`, `None` if the slot is empty.
  async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

  /// Replace the value stored under `key`.
  async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;

  /// Remove the slot. Removing an empty slot is not an error.
  async fn remove(&self, key: &str) -> anyhow::Result<()>;

  /// Check if the storage is usable (permissions, disk).
  async fn is_healthy(&self) -> bool;
}
