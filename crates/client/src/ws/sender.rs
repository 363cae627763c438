//! Outbound command gating and encoding.

use pulseboard_shared::{ClientCommand, OutboundFrame};
use serde_json::Value;

use super::manager::ConnectionState;
use super::transport::ReadyState;
use crate::error::SendError;

/// A command may only leave when the manager is open, the application is
/// ready, and the socket itself agrees it is open.
pub fn check_gate(
    state: ConnectionState,
    ready: bool,
    transport: Option<ReadyState>,
) -> Result<(), SendError> {
    if state != ConnectionState::Open {
        return Err(SendError::NotConnected(state));
    }
    if !ready {
        return Err(SendError::NotReady);
    }
    match transport {
        Some(ReadyState::Open) => Ok(()),
        _ => Err(SendError::SocketNotOpen),
    }
}

/// `{"type": kind, "data": payload}`
pub fn encode(kind: &str, payload: &Value) -> Result<String, SendError> {
    Ok(OutboundFrame { kind, data: payload }.to_json()?)
}

pub fn encode_command(command: &ClientCommand) -> Result<String, SendError> {
    Ok(serde_json::to_string(command)?)
}
