//! Feeds, alerts, KPIs and congestion nodes, with the merge rule of each.

use pulseboard_shared::{
    Alert, AlertStatusChange, AlertUpdate, CongestionNode, Feed, FeedPatch, InitialData,
    KpiSnapshot,
};

/// Result of folding an alert update into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertChange {
    Inserted,
    Updated,
    Removed,
    /// Status change for an alert we never saw.
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityStore {
    /// In arrival order; ids are unique.
    feeds: Vec<Feed>,
    /// In arrival order; ids are unique.
    alerts: Vec<Alert>,
    kpis: KpiSnapshot,
    nodes: Vec<CongestionNode>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feeds(&self) -> &[Feed] {
        &self.feeds
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn kpis(&self) -> &KpiSnapshot {
        &self.kpis
    }

    pub fn nodes(&self) -> &[CongestionNode] {
        &self.nodes
    }

    pub fn feed(&self, id: &str) -> Option<&Feed> {
        self.feeds.iter().find(|f| f.id == id)
    }

    pub fn alert(&self, id: &str) -> Option<&Alert> {
        self.alerts.iter().find(|a| a.id == id)
    }

    /// Replace everything the bulk snapshot covers. Nodes are only replaced
    /// when the snapshot carries them.
    pub fn replace_initial(&mut self, data: InitialData) {
        let mut feeds: Vec<Feed> = Vec::with_capacity(data.feeds.len());
        for feed in data.feeds {
            match feeds.iter_mut().find(|f| f.id == feed.id) {
                Some(existing) => *existing = feed,
                None => feeds.push(feed),
            }
        }
        self.feeds = feeds;

        self.alerts.clear();
        for update in data.alerts {
            self.upsert_alert(update);
        }

        self.kpis = data.kpis;
        if let Some(nodes) = data.nodes {
            self.nodes = nodes;
        }
    }

    /// Insert or patch by id. Returns true when the id was new.
    pub fn upsert_feed(&mut self, patch: FeedPatch) -> bool {
        match self.feeds.iter_mut().find(|f| f.id == patch.id) {
            Some(feed) => {
                feed.apply(patch);
                false
            }
            None => {
                self.feeds.push(Feed::from_patch(patch));
                true
            }
        }
    }

    pub fn merge_kpis(&mut self, update: KpiSnapshot) {
        self.kpis.merge(update);
    }

    /// Upsert a full alert; a `dismissed` status removes it instead.
    pub fn upsert_alert(&mut self, update: AlertUpdate) -> AlertChange {
        let AlertUpdate { mut alert, status } = update;
        let position = self.alerts.iter().position(|a| a.id == alert.id);

        if status.is_some_and(|s| s.is_dismissed()) {
            return match position {
                Some(index) => {
                    self.alerts.remove(index);
                    AlertChange::Removed
                }
                None => AlertChange::Unknown,
            };
        }

        if let Some(status) = status {
            alert.acknowledged = status.is_acknowledged();
        }
        match position {
            Some(index) => {
                self.alerts[index] = alert;
                AlertChange::Updated
            }
            None => {
                self.alerts.push(alert);
                AlertChange::Inserted
            }
        }
    }

    /// Status-only transition: dismissed removes, anything else only sets
    /// the acknowledgement flag.
    pub fn apply_alert_status(&mut self, change: AlertStatusChange) -> AlertChange {
        let Some(index) = self.alerts.iter().position(|a| a.id == change.alert_id) else {
            return AlertChange::Unknown;
        };
        if change.status.is_dismissed() {
            self.alerts.remove(index);
            AlertChange::Removed
        } else {
            self.alerts[index].acknowledged = change.status.is_acknowledged();
            AlertChange::Updated
        }
    }

    pub fn replace_nodes(&mut self, nodes: Vec<CongestionNode>) {
        self.nodes = nodes;
    }
}
