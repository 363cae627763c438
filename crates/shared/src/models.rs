//! Dashboard entities pushed by the server.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Feeds ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeedStatus {
    #[default]
    Stopped,
    Starting,
    Running,
    Error,
}

/// A video/data feed tile. Identity is `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub id: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub status: FeedStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
}

/// Partial feed as carried by `feed_update`. Only present fields are applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FeedPatch {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<FeedStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
}

impl Feed {
    /// Build a feed for an id seen for the first time.
    pub fn from_patch(patch: FeedPatch) -> Self {
        Self {
            id: patch.id,
            source: patch.source.unwrap_or_default(),
            name: patch.name,
            status: patch.status.unwrap_or_default(),
            fps: patch.fps,
        }
    }

    /// Overwrite the fields carried by `patch`. The id is never changed.
    pub fn apply(&mut self, patch: FeedPatch) {
        if let Some(source) = patch.source {
            self.source = source;
        }
        if patch.name.is_some() {
            self.name = patch.name;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if patch.fps.is_some() {
            self.fps = patch.fps;
        }
    }
}

// --- Alerts ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
    #[serde(other)]
    Other,
}

/// Lifecycle status carried by alert updates. Not stored on the alert itself:
/// `Dismissed` removes it, everything else only drives `acknowledged`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Dismissed,
    #[serde(other)]
    Other,
}

impl AlertStatus {
    pub fn is_dismissed(self) -> bool {
        matches!(self, AlertStatus::Dismissed)
    }

    pub fn is_acknowledged(self) -> bool {
        matches!(self, AlertStatus::Acknowledged)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub severity: AlertSeverity,
    pub message: String,
    #[serde(default, alias = "feed_id", skip_serializing_if = "Option::is_none")]
    pub feed_id: Option<String>,
    #[serde(default)]
    pub acknowledged: bool,
}

// --- KPIs ---

/// Named metrics. Updates merge key by key; a metric missing from an update
/// keeps its previous value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct KpiSnapshot(BTreeMap<String, serde_json::Value>);

impl KpiSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shallow merge: every metric in `update` overwrites ours, the rest stay.
    pub fn merge(&mut self, update: KpiSnapshot) {
        self.0.extend(update.0);
    }

    pub fn get(&self, metric: &str) -> Option<&serde_json::Value> {
        self.0.get(metric)
    }

    pub fn insert(&mut self, metric: impl Into<String>, value: serde_json::Value) {
        self.0.insert(metric.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, serde_json::Value)> for KpiSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// --- Congestion ---

/// One node of the congestion map. The collection is always replaced as a
/// whole, so there is no patch type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CongestionNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, alias = "congestion")]
    pub level: f64,
    /// Coordinates, labels and whatever else the map layer needs.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}
