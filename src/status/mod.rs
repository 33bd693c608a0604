//! Status values and the persisted status record

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Burn ban status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Ban is active (also the fallback when status is unknown)
    On,
    /// Ban is lifted
    Off,
}

impl Status {
    /// Human-readable form used in messages and on disk
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::On => "On",
            Status::Off => "Off",
        }
    }

    /// Status to assume when nothing better is known
    pub fn fallback() -> Self {
        Status::On
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::fallback()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token.eq_ignore_ascii_case("on") {
            Ok(Status::On)
        } else if token.eq_ignore_ascii_case("off") {
            Ok(Status::Off)
        } else {
            Err(ParseStatusError(token.to_string()))
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognized status token: {0:?}")]
pub struct ParseStatusError(pub String);

/// One durably stored observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: Status,
    pub observed_at: DateTime<Utc>,
}

impl StatusRecord {
    pub fn new(status: Status, observed_at: DateTime<Utc>) -> Self {
        Self {
            status,
            observed_at,
        }
    }

    /// Record stamped with the current time, truncated to whole seconds
    pub fn now(status: Status) -> Self {
        let now = Utc::now();
        let observed_at = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
        Self::new(status, observed_at)
    }

    /// Timestamp in the fixed-width form both stores persist (`2024-05-01T12:00:00Z`)
    pub fn timestamp_string(&self) -> String {
        self.observed_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(Status::On.to_string(), "On");
        assert_eq!(Status::Off.to_string(), "Off");
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("On".parse::<Status>().unwrap(), Status::On);
        assert_eq!(" OFF ".parse::<Status>().unwrap(), Status::Off);
        assert_eq!("on ".parse::<Status>().unwrap(), Status::On);
        assert!("maybe".parse::<Status>().is_err());
        assert!("".parse::<Status>().is_err());
    }

    #[test]
    fn test_default_is_on() {
        assert_eq!(Status::default(), Status::On);
    }

    #[test]
    fn test_timestamp_string_is_fixed_width() {
        let record = StatusRecord::now(Status::Off);
        let ts = record.timestamp_string();
        assert_eq!(ts.len(), 20);
        assert!(ts.ends_with('Z'));
    }
}
