//! Read-only storage access for the reconciliation engine.
//!
//! Paths handed to and returned from an adapter are host paths: slash-separated
//! strings relative to the host root.

mod adapter;
mod local;
#[cfg(test)]
mod memory;

pub use adapter::{EntryKind, Listing, Stat, StorageAdapter, StorageError};
pub use local::LocalStorage;
#[cfg(test)]
pub use memory::MemoryStorage;
