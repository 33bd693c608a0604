//! Fixed-interval status watcher

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::detector::{Change, ChangeDetector};
use crate::notify::Notifier;
use crate::source::StatusSource;
use crate::status::{Status, StatusRecord};
use crate::store::StatusStore;

/// Polls the source, records transitions and alerts recipients
///
/// Cycles run one at a time: a slow cycle delays the next tick but never
/// overlaps it. Nothing is carried between cycles except what the store holds.
pub struct StatusWatcher {
    source: Arc<dyn StatusSource>,
    store: Arc<dyn StatusStore>,
    notifier: Notifier,
    recipients: Vec<String>,
    interval: Duration,
}

impl StatusWatcher {
    pub fn new(
        source: Arc<dyn StatusSource>,
        store: Arc<dyn StatusStore>,
        notifier: Notifier,
        recipients: Vec<String>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            store,
            notifier,
            recipients,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run forever, one cycle per interval, starting one interval from now
    pub async fn run(&self) {
        tracing::info!(
            interval = ?self.interval,
            store = self.store.name(),
            recipients = self.recipients.len(),
            "Status watcher started"
        );

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let report = self.run_cycle().await;

            tracing::debug!(
                observed = %report.observed,
                previous = %report.previous,
                changed = report.change.is_changed(),
                "Cycle complete"
            );
        }
    }

    /// Run one full fetch / compare / record / notify pass
    pub async fn run_cycle(&self) -> CycleReport {
        let observed = self.observe().await;
        let previous = self.previous();
        let change = ChangeDetector::compare(observed, previous);

        let mut report = CycleReport {
            observed,
            previous,
            change,
            recorded: false,
            notified: false,
        };

        let Change::Changed(status) = change else {
            return report;
        };

        tracing::info!(from = %previous, to = %status, "Status changed");

        let record = StatusRecord::now(status);
        match self.store.append(&record) {
            Ok(()) => report.recorded = true,
            Err(e) => {
                tracing::error!(
                    store = self.store.name(),
                    error = %e,
                    "Failed to record status; stored status may lag until the next write"
                );
            }
        }

        match self.notifier.notify(status, &self.recipients).await {
            Ok(delivery) => {
                report.notified = true;
                tracing::info!(
                    recipients = delivery.sent.len(),
                    "Status change notification sent"
                );
            }
            Err(e) => {
                tracing::error!(
                    delivered = e.sent().len(),
                    error = %e,
                    "Error sending notifications"
                );
            }
        }

        report
    }

    /// Current status, or the fallback if the source fails
    async fn observe(&self) -> Status {
        match self.source.fetch().await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(error = %e, "Error fetching status, defaulting to {}", Status::fallback());
                Status::fallback()
            }
        }
    }

    /// Last recorded status, or the fallback if none is usable
    fn previous(&self) -> Status {
        match self.store.latest() {
            Ok(Some(record)) => record.status,
            Ok(None) => {
                tracing::info!(
                    store = self.store.name(),
                    "No prior status record, assuming {}",
                    Status::fallback()
                );
                Status::fallback()
            }
            Err(e) => {
                tracing::warn!(
                    store = self.store.name(),
                    error = %e,
                    "Error reading prior status, assuming {}",
                    Status::fallback()
                );
                Status::fallback()
            }
        }
    }
}

/// What happened during one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub observed: Status,
    pub previous: Status,
    pub change: Change,
    /// A transition record was appended
    pub recorded: bool,
    /// Every recipient was alerted
    pub notified: bool,
}
