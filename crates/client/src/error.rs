//! Error types for the sync client.

use std::time::Duration;

use pulseboard_shared::ProtocolError;
use thiserror::Error;

use crate::ws::{ConnectionState, SocketId};

/// Failures the sync core can run into.
///
/// Only `Server` and `ReconnectExhausted` ever reach the dashboard as error
/// text; the rest are retried silently or just logged.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    /// Text of an `error` frame, shown as-is.
    #[error("{0}")]
    Server(String),
    #[error("no ping from the server for {0:?}")]
    HeartbeatTimeout(Duration),
    #[error("Connection lost: gave up after {attempts} reconnection attempts. Reload the page to try again.")]
    ReconnectExhausted { attempts: u32 },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid WebSocket URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("{0} is closed")]
    SocketClosed(SocketId),
    #[error("{0}")]
    Io(String),
}

/// Why an outbound command was not handed to the socket.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("not connected (state: {0:?})")]
    NotConnected(ConnectionState),
    #[error("connection is open but not ready")]
    NotReady,
    #[error("socket does not report an open transport")]
    SocketNotOpen,
    #[error("failed to serialize command: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("sync driver has shut down")]
    DriverGone,
}
