//! SQLite-backed status log

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use super::{StatusStore, StoreError};
use crate::status::{Status, StatusRecord};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS status_log (
        status TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_status_log_created_at ON status_log(created_at);
";

/// Relational status log, one row per transition
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and ensure the schema exists
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::init(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl StatusStore for SqliteStore {
    fn append(&self, record: &StatusRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO status_log (status, created_at) VALUES (?1, ?2)",
            params![record.status.as_str(), record.timestamp_string()],
        )?;

        tracing::debug!(status = %record.status, "Inserted status row");
        Ok(())
    }

    fn latest(&self) -> Result<Option<StatusRecord>, StoreError> {
        let conn = self.conn.lock();
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT status, created_at FROM status_log
                 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((status, created_at)) = row else {
            return Ok(None);
        };

        let status: Status = status
            .parse()
            .map_err(|e| StoreError::Corrupted(format!("{}", e)))?;
        let observed_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| StoreError::Corrupted(format!("created_at {:?}: {}", created_at, e)))?
            .with_timezone(&Utc);

        Ok(Some(StatusRecord::new(status, observed_at)))
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn record_at(status: Status, secs: i64) -> StatusRecord {
        StatusRecord::new(status, Utc.timestamp_opt(secs, 0).unwrap())
    }

    #[test]
    fn test_empty_table_has_no_record() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.latest().unwrap().is_none());
    }

    #[test]
    fn test_append_then_latest() {
        let store = SqliteStore::open_in_memory().unwrap();
        let record = record_at(Status::Off, 1_700_000_000);

        store.append(&record).unwrap();
        assert_eq!(store.latest().unwrap(), Some(record));
    }

    #[test]
    fn test_latest_is_max_created_at() {
        let store = SqliteStore::open_in_memory().unwrap();

        store.append(&record_at(Status::On, 1_700_000_000)).unwrap();
        store.append(&record_at(Status::Off, 1_700_000_600)).unwrap();
        // Inserted later but observed earlier
        store.append(&record_at(Status::On, 1_600_000_000)).unwrap();

        let latest = store.latest().unwrap().unwrap();
        assert_eq!(latest, record_at(Status::Off, 1_700_000_600));
    }

    #[test]
    fn test_same_second_prefers_last_insert() {
        let store = SqliteStore::open_in_memory().unwrap();

        store.append(&record_at(Status::Off, 1_700_000_000)).unwrap();
        store.append(&record_at(Status::On, 1_700_000_000)).unwrap();

        assert_eq!(store.latest().unwrap().unwrap().status, Status::On);
    }

    #[test]
    fn test_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("status.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.append(&record_at(Status::Off, 1_700_000_000)).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.latest().unwrap().unwrap().status, Status::Off);
    }

    #[test]
    fn test_corrupt_row_is_an_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .conn
            .lock()
            .execute(
                "INSERT INTO status_log (status, created_at) VALUES ('Maybe', '2023-11-14T22:13:20Z')",
                [],
            )
            .unwrap();

        assert!(matches!(store.latest(), Err(StoreError::Corrupted(_))));
    }
}
