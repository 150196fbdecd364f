//! Persistence backends: a key-value string store with compare-and-swap.
//!
//! The browser app kept each collection as a JSON string under a fixed key.
//! Backends here keep that shape but make every write conditional on the
//! entry still holding what the caller read, identified by its content
//! digest. A batch of writes is applied all-or-nothing.

mod memory;
mod schema;
mod sqlite;

pub use memory::*;
pub use schema::*;
pub use sqlite::*;

use sha2::{Digest, Sha256};

use crate::store::StoreResult;

/// A conditional write of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryWrite {
    /// Entry key
    pub key: String,
    /// Digest of the value the caller read; `None` if the entry was absent
    pub expected_digest: Option<String>,
    /// New value
    pub value: String,
}

impl EntryWrite {
    pub fn new(key: impl Into<String>, expected_digest: Option<String>, value: String) -> Self {
        Self {
            key: key.into(),
            expected_digest,
            value,
        }
    }
}

/// Host-provided key-value string storage.
pub trait StorageBackend {
    /// Read an entry. Absent entries are `None`.
    fn read(&self, key: &str) -> StoreResult<Option<String>>;

    /// Apply every write, or none of them.
    ///
    /// Fails with [`crate::store::StoreError::Conflict`] if any entry's current
    /// digest differs from its `expected_digest`.
    fn write_batch(&self, writes: &[EntryWrite]) -> StoreResult<()>;
}

/// Compute the SHA-256 hex digest of an entry's text.
pub fn content_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Digest of an optional entry, `None` when absent.
pub fn entry_digest(value: Option<&str>) -> Option<String> {
    value.map(content_digest)
}
