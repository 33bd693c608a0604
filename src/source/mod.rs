//! Where the current status comes from

pub mod parser;

pub use parser::StatusPage;

use std::time::Duration;

use async_trait::async_trait;

use crate::status::Status;

/// Source of the current status
///
/// Implementations must not treat failures as fatal; the watcher logs any
/// error and falls back to [`Status::fallback`] for the cycle.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch and decode the status right now
    async fn fetch(&self) -> Result<Status, FetchError>;
}

/// Reads the status from a web page
#[derive(Debug, Clone)]
pub struct HttpStatusSource {
    client: reqwest::Client,
    url: String,
    page: StatusPage,
}

impl HttpStatusSource {
    /// Create a source for `url` whose requests give up after `timeout`
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: url.into(),
            page: StatusPage::default(),
        })
    }

    /// Use a different page layout
    pub fn with_page(mut self, page: StatusPage) -> Self {
        self.page = page;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch(&self) -> Result<Status, FetchError> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        let status = self.page.parse(&body)?;

        tracing::debug!(url = %self.url, status = %status, "Fetched status page");
        Ok(status)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Status page returned HTTP {0}")]
    Status(u16),

    #[error("No list item mentions {0:?}")]
    NoStatusItem(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OFF_PAGE: &str = r#"<html><body><div>
        <h1>Notices</h1>
        <ul class="style1"><li>Burn Ban: OFF</li></ul>
    </div></body></html>"#;

    fn source_for(server: &MockServer) -> HttpStatusSource {
        HttpStatusSource::new(format!("{}/burnban", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_parses_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/burnban"))
            .respond_with(ResponseTemplate::new(200).set_body_string(OFF_PAGE))
            .mount(&server)
            .await;

        let source = source_for(&server);
        assert_eq!(source.fetch().await.unwrap(), Status::Off);
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/burnban"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = source_for(&server);
        assert!(matches!(source.fetch().await, Err(FetchError::Status(503))));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(OFF_PAGE)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let source =
            HttpStatusSource::new(format!("{}/burnban", server.uri()), Duration::from_millis(100))
                .unwrap();
        assert!(matches!(source.fetch().await, Err(FetchError::Http(_))));
    }

    #[tokio::test]
    async fn test_fetch_unreachable() {
        let source =
            HttpStatusSource::new("http://127.0.0.1:9/burnban", Duration::from_secs(1)).unwrap();
        assert!(source.fetch().await.is_err());
    }
}
