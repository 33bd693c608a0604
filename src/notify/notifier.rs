//! Fan-out of status alerts to recipients

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use super::gateway::{GatewayError, MessageGateway};
use crate::status::Status;

/// Default pause before each message
pub const DEFAULT_PACING: Duration = Duration::from_secs(1);

/// What to do when a send fails partway through the recipient list
///
/// Neither policy retries a failed recipient. A recipient that fails is not
/// alerted again until the next transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryPolicy {
    /// Stop at the first failure; later recipients are skipped this cycle
    #[default]
    FailFast,
    /// Try every recipient and report all failures together
    BestEffort,
}

impl FromStr for DeliveryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Ok(DeliveryPolicy::FailFast),
            "best-effort" | "besteffort" | "best_effort" => Ok(DeliveryPolicy::BestEffort),
            other => Err(format!("unknown delivery policy: {}", other)),
        }
    }
}

/// Alert body for a status
pub fn message_body(status: Status) -> String {
    format!("Burn Ban is {}", status)
}

/// Sends status alerts through a gateway, one recipient at a time
pub struct Notifier {
    gateway: Arc<dyn MessageGateway>,
    from: String,
    pacing: Duration,
    policy: DeliveryPolicy,
}

impl Notifier {
    pub fn new(gateway: Arc<dyn MessageGateway>, from: impl Into<String>) -> Self {
        Self {
            gateway,
            from: from.into(),
            pacing: DEFAULT_PACING,
            policy: DeliveryPolicy::default(),
        }
    }

    /// Set the pause taken before each message
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_policy(mut self, policy: DeliveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> DeliveryPolicy {
        self.policy
    }

    /// Alert every recipient, in order, that the status is now `status`
    pub async fn notify(
        &self,
        status: Status,
        recipients: &[String],
    ) -> Result<NotifyReport, NotifyError> {
        let body = message_body(status);
        let mut sent = Vec::with_capacity(recipients.len());
        let mut failures = Vec::new();

        for recipient in recipients {
            tokio::time::sleep(self.pacing).await;

            match self.gateway.send(&self.from, recipient, &body).await {
                Ok(()) => {
                    tracing::info!(
                        gateway = self.gateway.name(),
                        recipient = %recipient,
                        "{:?} sent",
                        body
                    );
                    sent.push(recipient.clone());
                }
                Err(e) => {
                    tracing::error!(
                        gateway = self.gateway.name(),
                        recipient = %recipient,
                        error = %e,
                        "{:?} failed to send",
                        body
                    );

                    match self.policy {
                        DeliveryPolicy::FailFast => {
                            return Err(NotifyError::Send {
                                recipient: recipient.clone(),
                                body,
                                sent,
                                source: e,
                            });
                        }
                        DeliveryPolicy::BestEffort => failures.push(DeliveryFailure {
                            recipient: recipient.clone(),
                            error: e,
                        }),
                    }
                }
            }
        }

        if failures.is_empty() {
            Ok(NotifyReport { body, sent })
        } else {
            Err(NotifyError::Partial {
                body,
                sent,
                failures,
            })
        }
    }
}

/// Outcome of a fully successful fan-out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyReport {
    pub body: String,
    pub sent: Vec<String>,
}

#[derive(Debug)]
pub struct DeliveryFailure {
    pub recipient: String,
    pub error: GatewayError,
}

impl fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.recipient, self.error)
    }
}

/// Notification errors
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// First failure under [`DeliveryPolicy::FailFast`]; remaining recipients were skipped
    #[error("{body:?} failed to send to {recipient}: {source}")]
    Send {
        recipient: String,
        body: String,
        sent: Vec<String>,
        source: GatewayError,
    },

    /// Failures under [`DeliveryPolicy::BestEffort`]
    #[error("{body:?} failed for {} recipient(s): {}", .failures.len(), join_failures(.failures))]
    Partial {
        body: String,
        sent: Vec<String>,
        failures: Vec<DeliveryFailure>,
    },
}

impl NotifyError {
    /// Recipients that did get the message before or despite the failure
    pub fn sent(&self) -> &[String] {
        match self {
            NotifyError::Send { sent, .. } | NotifyError::Partial { sent, .. } => sent,
        }
    }
}

fn join_failures(failures: &[DeliveryFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashSet;

    /// Records every attempt; fails for the listed recipients
    #[derive(Default)]
    struct RecordingGateway {
        attempts: Mutex<Vec<(String, String, String)>>,
        failing: HashSet<String>,
    }

    impl RecordingGateway {
        fn failing_for(recipients: &[&str]) -> Self {
            Self {
                attempts: Mutex::new(Vec::new()),
                failing: recipients.iter().map(|r| r.to_string()).collect(),
            }
        }

        fn attempted(&self) -> Vec<String> {
            self.attempts.lock().iter().map(|(_, to, _)| to.clone()).collect()
        }
    }

    #[async_trait]
    impl MessageGateway for RecordingGateway {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn send(&self, from: &str, to: &str, body: &str) -> Result<(), GatewayError> {
            self.attempts
                .lock()
                .push((from.to_string(), to.to_string(), body.to_string()));
            if self.failing.contains(to) {
                Err(GatewayError::Rejected {
                    status: 400,
                    message: format!("cannot deliver to {}", to),
                })
            } else {
                Ok(())
            }
        }
    }

    fn recipients(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn notifier(gateway: Arc<RecordingGateway>) -> Notifier {
        Notifier::new(gateway, "+15559999").with_pacing(Duration::ZERO)
    }

    #[test]
    fn test_message_body() {
        assert_eq!(message_body(Status::On), "Burn Ban is On");
        assert_eq!(message_body(Status::Off), "Burn Ban is Off");
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("fail-fast".parse::<DeliveryPolicy>().unwrap(), DeliveryPolicy::FailFast);
        assert_eq!("Best-Effort".parse::<DeliveryPolicy>().unwrap(), DeliveryPolicy::BestEffort);
        assert!("retry".parse::<DeliveryPolicy>().is_err());
    }

    #[tokio::test]
    async fn test_sends_to_all_in_order() {
        let gateway = Arc::new(RecordingGateway::default());
        let report = notifier(gateway.clone())
            .notify(Status::Off, &recipients(&["A", "B", "C"]))
            .await
            .unwrap();

        assert_eq!(report.sent, recipients(&["A", "B", "C"]));
        assert_eq!(gateway.attempted(), recipients(&["A", "B", "C"]));

        let attempts = gateway.attempts.lock();
        for (from, _, body) in attempts.iter() {
            assert_eq!(from, "+15559999");
            assert_eq!(body, "Burn Ban is Off");
        }
    }

    #[tokio::test]
    async fn test_fail_fast_skips_remaining() {
        let gateway = Arc::new(RecordingGateway::failing_for(&["B"]));
        let err = notifier(gateway.clone())
            .notify(Status::On, &recipients(&["A", "B", "C"]))
            .await
            .unwrap_err();

        assert_eq!(gateway.attempted(), recipients(&["A", "B"]));
        match err {
            NotifyError::Send {
                recipient, sent, ..
            } => {
                assert_eq!(recipient, "B");
                assert_eq!(sent, recipients(&["A"]));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_best_effort_tries_everyone() {
        let gateway = Arc::new(RecordingGateway::failing_for(&["B"]));
        let err = notifier(gateway.clone())
            .with_policy(DeliveryPolicy::BestEffort)
            .notify(Status::On, &recipients(&["A", "B", "C"]))
            .await
            .unwrap_err();

        assert_eq!(gateway.attempted(), recipients(&["A", "B", "C"]));
        assert_eq!(err.sent(), recipients(&["A", "C"]).as_slice());
        match err {
            NotifyError::Partial { failures, .. } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].recipient, "B");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_no_recipients() {
        let gateway = Arc::new(RecordingGateway::default());
        let report = notifier(gateway.clone())
            .notify(Status::On, &[])
            .await
            .unwrap();

        assert!(report.sent.is_empty());
        assert!(gateway.attempted().is_empty());
    }

    #[tokio::test]
    async fn test_pacing_between_messages() {
        let gateway = Arc::new(RecordingGateway::default());
        let notifier = Notifier::new(gateway, "+15559999").with_pacing(Duration::from_millis(20));

        let start = std::time::Instant::now();
        notifier
            .notify(Status::On, &recipients(&["A", "B", "C"]))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(60));
    }
}
