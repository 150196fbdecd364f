//! SQLite file backend.

use std::path::Path;
use std::time::Duration;

use rusqlite::{
    params, Connection, ErrorCode, OptionalExtension, Transaction, TransactionBehavior,
};

use super::{entry_digest, EntryWrite, StorageBackend, SCHEMA};
use crate::store::{StoreError, StoreResult};

/// How long a writer waits for another process holding the write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Key-value entries in a single SQLite table.
///
/// Each batch runs in an `IMMEDIATE` transaction, so the digest check and the
/// write happen under the database write lock even when several processes
/// share the file.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::connect(path.as_ref()).map_err(classify)
    }

    fn connect(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let backend = Self { conn };
        backend.initialize()?;
        Ok(backend)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let backend = Self { conn };
        backend.initialize()?;
        Ok(backend)
    }

    /// Initialize schema.
    fn initialize(&self) -> StoreResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn apply_batch(&self, writes: &[EntryWrite]) -> StoreResult<()> {
        // Dropping the transaction without commit rolls back.
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;

        for write in writes {
            let current: Option<String> = tx
                .query_row(
                    "SELECT value FROM kv_entries WHERE key = ?",
                    [&write.key],
                    |row| row.get(0),
                )
                .optional()?;

            if entry_digest(current.as_deref()) != write.expected_digest {
                tracing::warn!(key = %write.key, "compare-and-swap lost, entry changed since read");
                return Err(StoreError::Conflict(write.key.clone()));
            }

            tx.execute(
                r#"
                INSERT INTO kv_entries (key, value, updated_at)
                VALUES (?1, ?2, datetime('now'))
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
                "#,
                params![write.key, write.value],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

/// Report a full disk, an unopenable file, an I/O fault or a lock held past
/// the busy timeout as unavailable storage.
fn classify(err: StoreError) -> StoreError {
    match err {
        StoreError::Sqlite(e) if is_storage_fault(&e) => {
            tracing::warn!(error = %e, "sqlite storage unavailable");
            StoreError::StorageUnavailable(e.to_string())
        }
        other => other,
    }
}

fn is_storage_fault(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(
            ErrorCode::DiskFull
                | ErrorCode::CannotOpen
                | ErrorCode::SystemIoFailure
                | ErrorCode::DatabaseBusy
        )
    )
}

impl StorageBackend for SqliteBackend {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| classify(e.into()))
    }

    fn write_batch(&self, writes: &[EntryWrite]) -> StoreResult<()> {
        self.apply_batch(writes).map_err(classify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::content_digest;

    fn setup_backend() -> SqliteBackend {
        SqliteBackend::open_in_memory().unwrap()
    }

    #[test]
    fn test_open_in_memory() {
        assert!(SqliteBackend::open_in_memory().is_ok());
    }

    #[test]
    fn test_write_and_read() {
        let backend = setup_backend();
        backend
            .write_batch(&[EntryWrite::new("mseRecords", None, "[]".into())])
            .unwrap();

        assert_eq!(backend.read("mseRecords").unwrap(), Some("[]".into()));
        assert_eq!(backend.read("msePatients").unwrap(), None);
    }

    #[test]
    fn test_overwrite_with_matching_digest() {
        let backend = setup_backend();
        backend
            .write_batch(&[EntryWrite::new("mseRecords", None, "[]".into())])
            .unwrap();
        backend
            .write_batch(&[EntryWrite::new(
                "mseRecords",
                Some(content_digest("[]")),
                "[1]".into(),
            )])
            .unwrap();

        assert_eq!(backend.read("mseRecords").unwrap(), Some("[1]".into()));
    }

    #[test]
    fn test_conflict_rolls_back_whole_batch() {
        let backend = setup_backend();
        backend
            .write_batch(&[EntryWrite::new("msePatients", None, "[]".into())])
            .unwrap();

        let writes = [
            EntryWrite::new("mseRecords", None, "[1]".into()),
            EntryWrite::new("msePatients", Some(content_digest("stale")), "[2]".into()),
        ];
        let result = backend.write_batch(&writes);

        assert!(matches!(result, Err(StoreError::Conflict(key)) if key == "msePatients"));
        assert_eq!(backend.read("mseRecords").unwrap(), None);
        assert_eq!(backend.read("msePatients").unwrap(), Some("[]".into()));
    }

    #[test]
    fn test_unopenable_file_is_storage_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("records.db");

        let result = SqliteBackend::open(&path);
        assert!(matches!(result, Err(StoreError::StorageUnavailable(_))));
    }

    #[test]
    fn test_disk_full_is_storage_unavailable() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
            None,
        );
        assert!(matches!(
            classify(err.into()),
            StoreError::StorageUnavailable(_)
        ));
    }

    #[test]
    fn test_other_errors_pass_through() {
        let conflict = classify(StoreError::Conflict("mseRecords".into()));
        assert!(matches!(conflict, StoreError::Conflict(_)));

        let constraint = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            None,
        );
        assert!(matches!(classify(constraint.into()), StoreError::Sqlite(_)));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");

        {
            let backend = SqliteBackend::open(&path).unwrap();
            backend
                .write_batch(&[EntryWrite::new("mseRecords", None, "[]".into())])
                .unwrap();
        }

        let backend = SqliteBackend::open(&path).unwrap();
        assert_eq!(backend.read("mseRecords").unwrap(), Some("[]".into()));
    }
}
