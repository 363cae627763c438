//! Pulseboard Client - real-time sync for the operations dashboard
//!
//! Keeps a local mirror of feeds, KPIs, alerts and node congestion in step
//! with the backend over a single WebSocket, and exposes it as snapshots.

pub mod config;
pub mod error;
pub mod stores;
pub mod ws;

pub use config::{ConfigError, HeartbeatConfig, ReconnectConfig, SyncConfig};
pub use error::{SendError, SyncError, TransportError};
pub use stores::{DashboardSnapshot, EntityStore};
pub use ws::{ConnectionManager, ConnectionState, SyncClient};
