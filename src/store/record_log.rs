//! Flat append-only record log
//!
//! Each record is one line, `"<status>::<timestamp>\n"`, where the status token is
//! padded to three bytes (`"On "`, `"Off"`) and the timestamp is UTC RFC 3339 at
//! second precision (`2024-05-01T12:00:00Z`). Every record is therefore exactly
//! [`RECORD_WIDTH`] bytes, which lets [`RecordLogStore::latest`] seek straight to
//! the last record instead of scanning a file that grows for the life of the
//! service.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::{StatusStore, StoreError};
use crate::status::{Status, StatusRecord};

const STATUS_WIDTH: usize = 3;
const SEPARATOR: &[u8] = b"::";
const TIMESTAMP_WIDTH: usize = 20;

/// Byte width of every record, newline included
pub const RECORD_WIDTH: usize = STATUS_WIDTH + SEPARATOR.len() + TIMESTAMP_WIDTH + 1;

/// File-backed status log
#[derive(Debug, Clone)]
pub struct RecordLogStore {
    path: PathBuf,
}

impl RecordLogStore {
    /// Create a store over `path`; the file is created on first append
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_for_append(&self) -> io::Result<File> {
        let mut options = OpenOptions::new();
        options.append(true).create(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        options.open(&self.path)
    }

    /// Read the final record's bytes, or `None` if the file holds less than one record
    fn read_tail(&self) -> Result<Option<[u8; RECORD_WIDTH]>, StoreError> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let len = file.metadata()?.len();
        if len < RECORD_WIDTH as u64 {
            if len > 0 {
                tracing::warn!(
                    path = %self.path.display(),
                    bytes = len,
                    "Status log shorter than one record"
                );
            }
            return Ok(None);
        }

        file.seek(SeekFrom::Start(len - RECORD_WIDTH as u64))?;
        let mut buf = [0u8; RECORD_WIDTH];
        file.read_exact(&mut buf)?;
        Ok(Some(buf))
    }
}

impl StatusStore for RecordLogStore {
    fn append(&self, record: &StatusRecord) -> Result<(), StoreError> {
        let line = encode_record(record)?;

        let mut file = self.open_for_append()?;
        file.write_all(&line)?;
        file.flush()?;
        file.sync_data()?;

        tracing::debug!(
            path = %self.path.display(),
            status = %record.status,
            "Appended status record"
        );
        Ok(())
    }

    fn latest(&self) -> Result<Option<StatusRecord>, StoreError> {
        let Some(tail) = self.read_tail()? else {
            return Ok(None);
        };

        match decode_record(&tail) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Ignoring unreadable tail of status log"
                );
                Ok(None)
            }
        }
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Encode a record as one fixed-width line
pub fn encode_record(record: &StatusRecord) -> Result<Vec<u8>, StoreError> {
    let line = format!(
        "{:<width$}::{}\n",
        record.status.as_str(),
        record.timestamp_string(),
        width = STATUS_WIDTH
    );

    if line.len() != RECORD_WIDTH {
        return Err(StoreError::Encode(format!(
            "record {:?} is {} bytes, expected {}",
            line.trim_end(),
            line.len(),
            RECORD_WIDTH
        )));
    }
    Ok(line.into_bytes())
}

/// Decode one fixed-width line
pub fn decode_record(bytes: &[u8]) -> Result<StatusRecord, StoreError> {
    if bytes.len() != RECORD_WIDTH {
        return Err(StoreError::Corrupted(format!(
            "expected {} bytes, got {}",
            RECORD_WIDTH,
            bytes.len()
        )));
    }
    if bytes[RECORD_WIDTH - 1] != b'\n' {
        return Err(StoreError::Corrupted("missing record terminator".to_string()));
    }

    let (token, rest) = bytes.split_at(STATUS_WIDTH);
    let (separator, rest) = rest.split_at(SEPARATOR.len());
    let timestamp = &rest[..TIMESTAMP_WIDTH];

    if separator != SEPARATOR {
        return Err(StoreError::Corrupted("missing '::' separator".to_string()));
    }

    let token = std::str::from_utf8(token)
        .map_err(|e| StoreError::Corrupted(format!("status token: {}", e)))?;
    let status: Status = token
        .parse()
        .map_err(|e| StoreError::Corrupted(format!("{}", e)))?;

    let timestamp = std::str::from_utf8(timestamp)
        .map_err(|e| StoreError::Corrupted(format!("timestamp: {}", e)))?;
    let observed_at = DateTime::parse_from_rfc3339(timestamp)
        .map_err(|e| StoreError::Corrupted(format!("timestamp {:?}: {}", timestamp, e)))?
        .with_timezone(&Utc);

    Ok(StatusRecord::new(status, observed_at))
}
