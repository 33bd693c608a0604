//! Outbound message gateways

use std::time::Duration;

use async_trait::async_trait;

/// Default Twilio REST API base URL
pub const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Something that can deliver a single text message
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// Gateway name for logs
    fn name(&self) -> &'static str;

    /// Send `body` from `from` to `to`
    async fn send(&self, from: &str, to: &str, body: &str) -> Result<(), GatewayError>;
}

/// Twilio account credentials
#[derive(Debug, Clone)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub auth_token: String,
    /// Optional messaging service to send through
    pub messaging_service_sid: Option<String>,
}

/// SMS via the Twilio Messages API
pub struct TwilioGateway {
    client: reqwest::Client,
    base_url: String,
    credentials: TwilioCredentials,
}

impl TwilioGateway {
    pub fn new(credentials: TwilioCredentials, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: TWILIO_API_BASE.to_string(),
            credentials,
        })
    }

    /// Point the gateway at a different API host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.credentials.account_sid
        )
    }
}

#[async_trait]
impl MessageGateway for TwilioGateway {
    fn name(&self) -> &'static str {
        "twilio"
    }

    async fn send(&self, from: &str, to: &str, body: &str) -> Result<(), GatewayError> {
        let mut form = vec![("From", from), ("To", to), ("Body", body)];
        if let Some(sid) = &self.credentials.messaging_service_sid {
            form.push(("MessagingServiceSid", sid.as_str()));
        }

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(
                &self.credentials.account_sid,
                Some(&self.credentials.auth_token),
            )
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let payload: serde_json::Value = response
            .json()
            .await
            .unwrap_or(serde_json::Value::Null);

        if !status.is_success() {
            let message = payload
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("no error message")
                .to_string();
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(
            to = %to,
            sid = payload.get("sid").and_then(|s| s.as_str()).unwrap_or("-"),
            "Twilio accepted message"
        );
        Ok(())
    }
}

/// Writes messages to the log instead of sending them
#[derive(Debug, Default, Clone)]
pub struct LogGateway;

#[async_trait]
impl MessageGateway for LogGateway {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, from: &str, to: &str, body: &str) -> Result<(), GatewayError> {
        tracing::info!(from = %from, to = %to, "Dry run message: {}", body);
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway rejected message (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
}
