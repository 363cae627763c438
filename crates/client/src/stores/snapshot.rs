//! Read-only view handed to dashboard consumers.

use chrono::{DateTime, Utc};
use pulseboard_shared::{Alert, CongestionNode, Feed, KpiSnapshot};

use super::EntityStore;

/// Owned copy of everything a dashboard renders. Mutating it has no effect
/// on the sync client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSnapshot {
    pub feeds: Vec<Feed>,
    pub kpis: KpiSnapshot,
    pub alerts: Vec<Alert>,
    pub node_congestion_data: Vec<CongestionNode>,
    pub is_connected: bool,
    pub is_ready: bool,
    /// User-facing error text, if any.
    pub error: Option<String>,
    pub last_ping_at: Option<DateTime<Utc>>,
}

impl DashboardSnapshot {
    pub(crate) fn capture(store: &EntityStore) -> Self {
        Self {
            feeds: store.feeds().to_vec(),
            kpis: store.kpis().clone(),
            alerts: store.alerts().to_vec(),
            node_congestion_data: store.nodes().to_vec(),
            ..Self::default()
        }
    }

    pub fn feed(&self, id: &str) -> Option<&Feed> {
        self.feeds.iter().find(|f| f.id == id)
    }

    pub fn alert(&self, id: &str) -> Option<&Alert> {
        self.alerts.iter().find(|a| a.id == id)
    }

    /// Alerts nobody has acknowledged yet.
    pub fn open_alerts(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().filter(|a| !a.acknowledged)
    }
}
