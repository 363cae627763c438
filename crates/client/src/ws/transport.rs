//! The seam between the connection manager and real sockets.

use std::fmt;

use crate::error::TransportError;

/// Identity of one socket. A new id is issued for every connect, so events
/// from a superseded socket can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketId(pub u64);

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "socket#{}", self.0)
    }
}

/// Transport-level state, mirroring the browser's `readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl From<u8> for ReadyState {
    fn from(value: u8) -> Self {
        match value {
            0 => ReadyState::Connecting,
            1 => ReadyState::Open,
            2 => ReadyState::Closing,
            _ => ReadyState::Closed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEventKind {
    Open,
    Message(String),
    Error(String),
    Closed { code: u16 },
}

/// Something that happened on a socket, tagged with its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketEvent {
    pub socket: SocketId,
    pub kind: SocketEventKind,
}

impl SocketEvent {
    pub fn new(socket: SocketId, kind: SocketEventKind) -> Self {
        Self { socket, kind }
    }
}

/// Opens sockets and moves frames. Implementations report everything that
/// happens on a socket as [`SocketEvent`]s through their own channel; a
/// socket that fails asynchronously reports an error and then a close.
pub trait Transport {
    /// Start connecting. `Err` means no socket was created at all.
    fn connect(&mut self, url: &str) -> Result<SocketId, TransportError>;

    fn send_text(&mut self, socket: SocketId, text: String) -> Result<(), TransportError>;

    /// Request a close with `code`. Unknown or already closed sockets are ignored.
    fn close(&mut self, socket: SocketId, code: u16);

    fn ready_state(&self, socket: SocketId) -> ReadyState;
}
