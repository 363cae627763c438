//! WebSocket sync with the dashboard backend.
//!
//! This module provides:
//! - Connection lifecycle with bounded exponential-backoff reconnects
//! - Heartbeat supervision of server pings
//! - Routing of server frames into the entity store
//! - Gated outbound commands
//!
//! # Architecture
//!
//! ```text
//!  ┌────────────┐  commands   ┌──────────────────────────────┐
//!  │ SyncClient │ ──────────▶ │        driver task           │
//!  │  (handle)  │ ◀────────── │  select! { commands, events, │
//!  └────────────┘  snapshots  │            timer deadline }  │
//!                             └──────────────────────────────┘
//!                                            │
//!                                            ▼
//!                             ┌──────────────────────────────┐
//!                             │      ConnectionManager       │
//!                             │ reconnect · heartbeat · gate │
//!                             └──────────────────────────────┘
//!                                │                     │
//!                                ▼                     ▼
//!                     ┌─────────────────────┐ ┌─────────────────┐
//!                     │ Transport           │ │ router ──▶      │
//!                     │ (TungsteniteTransport)│ │   EntityStore   │
//!                     └─────────────────────┘ └─────────────────┘
//! ```
//!
//! The manager never sleeps or spawns. Everything time-dependent takes an
//! explicit `Instant`, and the driver is the only place wall-clock time
//! enters.
//!
//! # Usage
//!
//! ```rust,ignore
//! let client = SyncClient::spawn(SyncConfig::from_env()?)?;
//! client.start();
//! let mut updates = client.subscribe();
//! while updates.changed().await.is_ok() {
//!     let snapshot = updates.borrow().clone();
//!     println!("{} feeds, ready: {}", snapshot.feeds.len(), snapshot.is_ready);
//! }
//! ```

mod client;
mod connection;
mod heartbeat;
mod manager;
mod reconnect;
mod router;
mod sender;
mod timers;
mod transport;

#[cfg(feature = "ui")]
mod hooks;

#[cfg(test)]
pub(crate) mod mock;

pub use client::SyncClient;
pub use connection::TungsteniteTransport;
pub use heartbeat::{HeartbeatMonitor, Liveness};
pub use manager::{ConnectionManager, ConnectionState};
pub use reconnect::{ReconnectPolicy, RetryDecision};
pub use router::{dispatch, route_frame, RouteOutcome};
pub use timers::{Schedule, TimerKind};
pub use transport::{ReadyState, SocketEvent, SocketEventKind, SocketId, Transport};

#[cfg(feature = "ui")]
pub use hooks::{use_dashboard_sync, DashboardSync};
