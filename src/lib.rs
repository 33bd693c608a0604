//! Banwatch: Burn Ban Status Watcher
//!
//! Polls a status page for a binary burn ban flag, keeps a durable log of
//! status transitions, and texts a list of recipients once per transition.
//!
//! # Pipeline
//!
//! Each cycle of the [`watch::StatusWatcher`]:
//!
//! 1. fetches the current status from a [`source::StatusSource`] (On if that fails)
//! 2. reads the last recorded status from a [`store::StatusStore`] (On if none)
//! 3. compares the two with [`watch::ChangeDetector`]
//! 4. on a transition, appends a record and alerts every recipient through the
//!    [`notify::Notifier`]
//!
//! Only one instance may run against a given status log.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use banwatch::notify::{LogGateway, Notifier};
//! use banwatch::source::HttpStatusSource;
//! use banwatch::store::RecordLogStore;
//! use banwatch::watch::StatusWatcher;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let source = HttpStatusSource::new("https://example.org/burnban", Duration::from_secs(30))?;
//! let store = RecordLogStore::new("bbstatus.log");
//! let notifier = Notifier::new(Arc::new(LogGateway), "+15550000");
//!
//! let watcher = StatusWatcher::new(
//!     Arc::new(source),
//!     Arc::new(store),
//!     notifier,
//!     vec!["+15551234".to_string()],
//!     Duration::from_secs(600),
//! );
//! let report = watcher.run_cycle().await;
//! println!("Cycle: {:?}", report);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod notify;
pub mod source;
pub mod status;
pub mod store;
pub mod watch;

// Re-export commonly used types
pub use config::{ConfigError, WatchConfig};
pub use status::{Status, StatusRecord};
pub use store::{StatusStore, StoreError};
pub use watch::{Change, ChangeDetector, StatusWatcher};
