//! Banwatch
//!
//! Run with: cargo run
//!
//! See `banwatch::config` for the environment variables. RUST_LOG sets the
//! log level (default: banwatch=info).
//!
//! Run a single instance per status log; there is no locking between
//! processes sharing one.

use std::sync::Arc;

use banwatch::config::{GatewayConfig, WatchConfig};
use banwatch::notify::{LogGateway, MessageGateway, Notifier, TwilioGateway};
use banwatch::source::HttpStatusSource;
use banwatch::store::{StatusStore, StoreBackend};
use banwatch::watch::StatusWatcher;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "banwatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WatchConfig::from_env()?;

    tracing::info!("Banwatch configuration:");
    tracing::info!("  Status page: {}", config.url);
    tracing::info!("  Polling interval: {:?}", config.polling_interval);
    match &config.store {
        StoreBackend::File(path) => tracing::info!("  Store: file ({})", path.display()),
        StoreBackend::Sqlite(path) => tracing::info!("  Store: sqlite ({})", path.display()),
    }
    tracing::info!("  Recipients: {}", config.recipients.len());
    tracing::info!("  Delivery: {:?}, pacing {:?}", config.delivery, config.pacing);
    tracing::info!("  HTTP timeout: {:?}", config.http_timeout);

    let source = HttpStatusSource::new(config.url.clone(), config.http_timeout)?
        .with_page(config.page.build()?);

    let store: Arc<dyn StatusStore> = Arc::from(config.store.open()?);

    let gateway: Arc<dyn MessageGateway> = match &config.gateway {
        GatewayConfig::Twilio {
            credentials,
            base_url,
        } => Arc::new(
            TwilioGateway::new(credentials.clone(), config.http_timeout)?
                .with_base_url(base_url.clone()),
        ),
        GatewayConfig::DryRun => {
            tracing::warn!("  Dry run: messages will be logged, not sent");
            Arc::new(LogGateway)
        }
    };

    let notifier = Notifier::new(gateway, config.sender.clone())
        .with_pacing(config.pacing)
        .with_policy(config.delivery);

    let watcher = StatusWatcher::new(
        Arc::new(source),
        store,
        notifier,
        config.recipients.clone(),
        config.polling_interval,
    );

    watcher.run().await;
    Ok(())
}
