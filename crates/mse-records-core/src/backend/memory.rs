//! In-process backend, the stand-in for browser local storage.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{entry_digest, EntryWrite, StorageBackend};
use crate::store::{StoreError, StoreResult};

/// Key-value entries held in memory, with an optional size quota.
///
/// The quota counts key and value bytes across all entries, the way browsers
/// cap local storage per origin.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryBackend {
    /// Unbounded in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes once the total size would exceed `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Overwrite an entry unconditionally (seeding, or simulating another writer).
    pub fn set_entry(&self, key: &str, value: &str) -> StoreResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Total bytes currently stored.
    pub fn used_bytes(&self) -> StoreResult<usize> {
        Ok(total_size(&*self.lock()?))
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|e| StoreError::StorageUnavailable(format!("Lock poisoned: {}", e)))
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn write_batch(&self, writes: &[EntryWrite]) -> StoreResult<()> {
        let mut entries = self.lock()?;

        for write in writes {
            let current = entry_digest(entries.get(&write.key).map(String::as_str));
            if current != write.expected_digest {
                tracing::warn!(key = %write.key, "compare-and-swap lost, entry changed since read");
                return Err(StoreError::Conflict(write.key.clone()));
            }
        }

        if let Some(quota) = self.quota_bytes {
            let mut projected = entries.clone();
            for write in writes {
                projected.insert(write.key.clone(), write.value.clone());
            }
            let size = total_size(&projected);
            if size > quota {
                tracing::warn!(size, quota, "storage quota exceeded");
                return Err(StoreError::StorageUnavailable(format!(
                    "quota exceeded: {} bytes needed, {} allowed",
                    size, quota
                )));
            }
        }

        for write in writes {
            entries.insert(write.key.clone(), write.value.clone());
        }
        Ok(())
    }
}

fn total_size(entries: &HashMap<String, String>) -> usize {
    entries.iter().map(|(k, v)| k.len() + v.len()).sum()
}
