//! Dioxus binding for the sync client.
//!
//! Components read the snapshot signal; the driver task writes it. The
//! connection starts on mount and is torn down on unmount.

use dioxus::prelude::*;
use serde_json::Value;

use super::client::SyncClient;
use crate::config::SyncConfig;
use crate::error::SendError;
use crate::stores::DashboardSnapshot;

#[derive(Clone)]
pub struct DashboardSync {
    snapshot: Signal<DashboardSnapshot>,
    client: Option<SyncClient>,
}

impl DashboardSync {
    /// Reactive read; the calling component re-renders on change.
    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshot.read().clone()
    }

    pub fn start(&self) {
        if let Some(client) = &self.client {
            client.start();
        }
    }

    pub async fn send(&self, kind: &str, payload: Value) -> Result<(), SendError> {
        match &self.client {
            Some(client) => client.send(kind, payload).await,
            None => Err(SendError::DriverGone),
        }
    }
}

/// Spawn one sync client for this component and keep a signal in step with it.
pub fn use_dashboard_sync(config: SyncConfig) -> DashboardSync {
    let client = use_hook(move || match SyncClient::spawn(config) {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::error!(error = %e, "invalid sync configuration");
            None
        }
    });
    let mut snapshot = use_signal(DashboardSnapshot::default);

    let driver = client.clone();
    use_future(move || {
        let driver = driver.clone();
        async move {
            let Some(driver) = driver else {
                return;
            };
            driver.start();
            let mut updates = driver.subscribe();
            loop {
                let next = updates.borrow_and_update().clone();
                snapshot.set(next);
                if updates.changed().await.is_err() {
                    break;
                }
            }
        }
    });

    let teardown = client.clone();
    use_drop(move || {
        if let Some(client) = &teardown {
            client.stop();
        }
    });

    DashboardSync { snapshot, client }
}
