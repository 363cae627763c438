//! Pulseboard Client - Main entry point
//!
//! Headless dashboard mirror: connects, logs every snapshot change and shuts
//! down cleanly on Ctrl-C.

use std::time::Duration;

use anyhow::Context;
use pulseboard_client::{DashboardSnapshot, SyncClient, SyncConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pulseboard_client=debug")),
        )
        .init();

    let config = SyncConfig::from_env().context("failed to read sync configuration")?;
    tracing::info!(url = %config.url, "starting dashboard sync");
    let client = SyncClient::spawn(config).context("failed to start sync client")?;
    client.start();

    let mut updates = client.subscribe();
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                report(&updates.borrow_and_update());
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                tracing::info!("shutting down");
                if tokio::time::timeout(Duration::from_secs(2), client.shutdown()).await.is_err() {
                    tracing::warn!("socket did not close in time");
                }
                break;
            }
        }
    }
    Ok(())
}

fn report(snapshot: &DashboardSnapshot) {
    tracing::info!(
        connected = snapshot.is_connected,
        ready = snapshot.is_ready,
        feeds = snapshot.feeds.len(),
        kpis = snapshot.kpis.len(),
        alerts = snapshot.alerts.len(),
        nodes = snapshot.node_congestion_data.len(),
        "dashboard updated"
    );
    if let Some(error) = &snapshot.error {
        tracing::warn!("{error}");
    }
}
