//! Startup configuration
//!
//! Environment variables:
//! - BANWATCH_URL (or BBURL): status page URL (required)
//! - TO_ADDRESSES: comma-separated recipient numbers (required)
//! - TWILIO_PHONE_NUMBER: sender number (required unless dry run)
//! - TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN: credentials (required unless dry run)
//! - TWILIO_MESSAGING_SERVICE_SID: optional messaging service
//! - TWILIO_API_BASE: API base URL (default: https://api.twilio.com)
//! - POLLING_INTERVAL: e.g. 90s, 10m, 1h30m (default: 10m)
//! - BANWATCH_STORE: file or sqlite (default: file)
//! - BANWATCH_LOG_PATH: flat log path (default: bbstatus.log)
//! - BANWATCH_DB_PATH: sqlite path (default: bbstatus.db)
//! - BANWATCH_PACING_MS: pause before each message (default: 1000)
//! - BANWATCH_DELIVERY: fail-fast or best-effort (default: fail-fast)
//! - BANWATCH_HTTP_TIMEOUT_SECS: fetch and send timeout (default: 30)
//! - BANWATCH_SELECTOR, BANWATCH_KEYWORD, BANWATCH_OFF_KEYWORD: page layout
//! - BANWATCH_DRY_RUN: log messages instead of sending them (default: false)

use std::path::PathBuf;
use std::time::Duration;

use crate::notify::gateway::TWILIO_API_BASE;
use crate::notify::{DeliveryPolicy, TwilioCredentials};
use crate::source::parser::{DEFAULT_KEYWORD, DEFAULT_OFF_KEYWORD, DEFAULT_SELECTOR};
use crate::source::StatusPage;
use crate::store::{StoreBackend, StoreKind};

pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_LOG_PATH: &str = "bbstatus.log";
pub const DEFAULT_DB_PATH: &str = "bbstatus.db";
pub const DEFAULT_PACING_MS: u64 = 1000;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// How outbound messages are delivered
#[derive(Debug, Clone)]
pub enum GatewayConfig {
    Twilio {
        credentials: TwilioCredentials,
        base_url: String,
    },
    /// Log messages instead of sending them
    DryRun,
}

/// Page layout used to find the status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageConfig {
    pub selector: String,
    pub keyword: String,
    pub off_keyword: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            selector: DEFAULT_SELECTOR.to_string(),
            keyword: DEFAULT_KEYWORD.to_string(),
            off_keyword: DEFAULT_OFF_KEYWORD.to_string(),
        }
    }
}

impl PageConfig {
    /// Compile the selector into a page parser
    pub fn build(&self) -> Result<StatusPage, ConfigError> {
        StatusPage::new(&self.selector, &self.keyword, &self.off_keyword).map_err(|reason| {
            ConfigError::Invalid {
                key: "BANWATCH_SELECTOR",
                reason,
            }
        })
    }
}

/// Validated watcher configuration
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub url: String,
    pub recipients: Vec<String>,
    pub sender: String,
    pub polling_interval: Duration,
    pub store: StoreBackend,
    pub gateway: GatewayConfig,
    pub pacing: Duration,
    pub delivery: DeliveryPolicy,
    pub http_timeout: Duration,
    pub page: PageConfig,
}

impl WatchConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let url = get("BANWATCH_URL")
            .or_else(|| get("BBURL"))
            .ok_or(ConfigError::Missing("BANWATCH_URL"))?;

        let recipients: Vec<String> = get("TO_ADDRESSES")
            .map(|addrs| {
                addrs
                    .split(',')
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        if recipients.is_empty() {
            return Err(ConfigError::Missing("TO_ADDRESSES"));
        }

        let dry_run = get("BANWATCH_DRY_RUN")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let (sender, gateway) = if dry_run {
            let sender = get("TWILIO_PHONE_NUMBER").unwrap_or_else(|| "dry-run".to_string());
            (sender, GatewayConfig::DryRun)
        } else {
            let sender = require("TWILIO_PHONE_NUMBER")?;
            let credentials = TwilioCredentials {
                account_sid: require("TWILIO_ACCOUNT_SID")?,
                auth_token: require("TWILIO_AUTH_TOKEN")?,
                messaging_service_sid: get("TWILIO_MESSAGING_SERVICE_SID"),
            };
            let base_url = get("TWILIO_API_BASE").unwrap_or_else(|| TWILIO_API_BASE.to_string());
            (
                sender,
                GatewayConfig::Twilio {
                    credentials,
                    base_url,
                },
            )
        };

        let polling_interval = match get("POLLING_INTERVAL") {
            None => DEFAULT_POLLING_INTERVAL,
            Some(raw) => match parse_duration(&raw) {
                Some(d) if !d.is_zero() => d,
                _ => {
                    tracing::warn!(
                        value = %raw,
                        "Invalid POLLING_INTERVAL, using {:?}",
                        DEFAULT_POLLING_INTERVAL
                    );
                    DEFAULT_POLLING_INTERVAL
                }
            },
        };

        let store_kind = match get("BANWATCH_STORE") {
            None => StoreKind::File,
            Some(raw) => raw.parse::<StoreKind>().map_err(|reason| ConfigError::Invalid {
                key: "BANWATCH_STORE",
                reason,
            })?,
        };
        let store = match store_kind {
            StoreKind::File => StoreBackend::File(PathBuf::from(
                get("BANWATCH_LOG_PATH").unwrap_or_else(|| DEFAULT_LOG_PATH.to_string()),
            )),
            StoreKind::Sqlite => StoreBackend::Sqlite(PathBuf::from(
                get("BANWATCH_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            )),
        };

        let pacing = Duration::from_millis(parse_number(
            get("BANWATCH_PACING_MS"),
            "BANWATCH_PACING_MS",
            DEFAULT_PACING_MS,
        )?);
        let http_timeout = Duration::from_secs(parse_number(
            get("BANWATCH_HTTP_TIMEOUT_SECS"),
            "BANWATCH_HTTP_TIMEOUT_SECS",
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?);
        if http_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "BANWATCH_HTTP_TIMEOUT_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }

        let delivery = match get("BANWATCH_DELIVERY") {
            None => DeliveryPolicy::default(),
            Some(raw) => raw.parse::<DeliveryPolicy>().map_err(|reason| ConfigError::Invalid {
                key: "BANWATCH_DELIVERY",
                reason,
            })?,
        };

        let defaults = PageConfig::default();
        let page = PageConfig {
            selector: get("BANWATCH_SELECTOR").unwrap_or(defaults.selector),
            keyword: get("BANWATCH_KEYWORD").unwrap_or(defaults.keyword),
            off_keyword: get("BANWATCH_OFF_KEYWORD").unwrap_or(defaults.off_keyword),
        };

        Ok(Self {
            url,
            recipients,
            sender,
            polling_interval,
            store,
            gateway,
            pacing,
            delivery,
            http_timeout,
            page,
        })
    }
}

fn parse_number(raw: Option<String>, key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
            key,
            reason: format!("{:?} is not a whole number", raw),
        }),
    }
}

/// Parse durations like `250ms`, `90s`, `10m`, `1h30m` or `1.5h`
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let mut total_ms = 0f64;
    let mut rest = s;

    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_end == 0 {
            return None;
        }
        let value: f64 = rest[..num_end].parse().ok()?;
        rest = &rest[num_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let ms_per_unit = match &rest[..unit_end] {
            "ms" => 1.0,
            "s" => 1_000.0,
            "m" => 60_000.0,
            "h" => 3_600_000.0,
            _ => return None,
        };
        rest = &rest[unit_end..];

        total_ms += value * ms_per_unit;
    }

    Some(Duration::from_millis(total_ms.round() as u64))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
