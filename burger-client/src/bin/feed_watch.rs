//! feed-watch: follow the live order feed from a terminal
//!
//! Connects to the feed stream, logs every snapshot, and falls back to the
//! pull API while the stream is down. Stops on Ctrl-C.
//!
//! Configured through `BURGER_*` environment variables (see `ClientConfig::from_env`).

use anyhow::Context;
use burger_client::{ClientConfig, CredentialStore, FallbackTrigger, LiveFeed, StreamKind};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// How often the store is polled for changes
const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "burger_client=info,feed_watch=info".into()),
        )
        .init();

    let config = ClientConfig::from_env();
    tracing::info!(api = %config.api_url, ws = %config.ws_url, "Starting feed watch");

    let credentials =
        CredentialStore::from_config(&config).context("failed to load stored credentials")?;
    let http = config
        .build_http_client(credentials.clone())
        .context("failed to build HTTP client")?;

    let live = LiveFeed::connect_ws(config, credentials);
    live.connect(StreamKind::Feed);

    let mut trigger = FallbackTrigger::new();
    let mut exhausted_reported = false;
    let mut last_seen = Arc::new(Vec::new());
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutting down");
                break;
            }
            _ = ticker.tick() => {
                let state = live.store().feed();
                if trigger.observe_feed(&state) {
                    tracing::info!("Feed stream down, fetching snapshot");
                    live.fetch_feeds(&http).await;
                    continue;
                }

                if state.reconnect_exhausted && !exhausted_reported {
                    tracing::warn!("Feed stream gave up reconnecting, serving pulled data only");
                }
                exhausted_reported = state.reconnect_exhausted;

                let sorted = live.store().sorted_feed_orders();
                if Arc::ptr_eq(&sorted, &last_seen) {
                    continue;
                }
                tracing::info!(
                    orders = sorted.len(),
                    total = state.total,
                    total_today = state.total_today,
                    latest = sorted.first().map(|o| o.number),
                    connected = state.ws_connected,
                    "Feed snapshot"
                );
                last_seen = sorted;
            }
        }
    }

    live.disconnect(StreamKind::Feed);
    Ok(())
}
