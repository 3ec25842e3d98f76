//! Persistence Adapters - Key-Value Slot Storage
//!
//! Implements the `KeyValueStorage` port with atomic JSON files on
//! disk, or an in-memory map for tests and ephemeral runs.

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;
