//! Durable status log
//!
//! Two interchangeable backends implement [`StatusStore`]:
//!
//! - [`RecordLogStore`]: append-only text file of fixed-width records, recovered
//!   by reading only the final record
//! - [`SqliteStore`]: a single `status_log` table
//!
//! A deployment picks one at startup. Neither backend caches, so a successful
//! `append` is always visible to the next `latest`. Only one process may write a
//! given log; there is no locking between instances.

pub mod record_log;
pub mod sqlite;

pub use record_log::{RecordLogStore, RECORD_WIDTH};
pub use sqlite::SqliteStore;

use std::path::PathBuf;
use std::str::FromStr;

use crate::status::StatusRecord;

/// Trait for status log backends
pub trait StatusStore: Send + Sync {
    /// Durably append one record
    fn append(&self, record: &StatusRecord) -> Result<(), StoreError>;

    /// Most recently appended record, or `None` if there is no usable record
    fn latest(&self) -> Result<Option<StatusRecord>, StoreError>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}

/// Which backend to open at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Flat record log at the given path
    File(PathBuf),
    /// SQLite database at the given path
    Sqlite(PathBuf),
}

impl StoreBackend {
    /// Open the configured backend
    pub fn open(&self) -> Result<Box<dyn StatusStore>, StoreError> {
        match self {
            StoreBackend::File(path) => Ok(Box::new(RecordLogStore::new(path))),
            StoreBackend::Sqlite(path) => Ok(Box::new(SqliteStore::open(path)?)),
        }
    }
}

/// Backend kind as named in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    File,
    Sqlite,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" | "flat" | "log" => Ok(StoreKind::File),
            "sqlite" | "sql" | "db" => Ok(StoreKind::Sqlite),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupted record: {0}")]
    Corrupted(String),

    #[error("Cannot encode record: {0}")]
    Encode(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Status;
    use tempfile::TempDir;

    #[test]
    fn test_store_kind_parse() {
        assert_eq!("file".parse::<StoreKind>().unwrap(), StoreKind::File);
        assert_eq!("SQLite".parse::<StoreKind>().unwrap(), StoreKind::Sqlite);
        assert!("postgres".parse::<StoreKind>().is_err());
    }

    #[test]
    fn test_backends_share_contract() {
        let temp_dir = TempDir::new().unwrap();
        let backends = vec![
            StoreBackend::File(temp_dir.path().join("status.log")),
            StoreBackend::Sqlite(temp_dir.path().join("status.db")),
        ];

        for backend in backends {
            let store = backend.open().unwrap();
            assert!(store.latest().unwrap().is_none(), "{}", store.name());

            store.append(&StatusRecord::now(Status::Off)).unwrap();
            store.append(&StatusRecord::now(Status::On)).unwrap();

            let latest = store.latest().unwrap().unwrap();
            assert_eq!(latest.status, Status::On, "{}", store.name());
        }
    }
}
