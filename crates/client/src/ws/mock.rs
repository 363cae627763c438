//! Recording transport for unit tests.

use std::collections::HashMap;

use super::transport::{ReadyState, SocketId, Transport};
use crate::error::TransportError;

#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    next_id: u64,
    pub connects: Vec<String>,
    pub sent: Vec<(SocketId, String)>,
    pub closed: Vec<(SocketId, u16)>,
    pub states: HashMap<SocketId, ReadyState>,
    pub fail_connect: bool,
}

impl MockTransport {
    pub fn set_state(&mut self, socket: SocketId, state: ReadyState) {
        self.states.insert(socket, state);
    }

    pub fn sent_json(&self) -> Vec<serde_json::Value> {
        self.sent
            .iter()
            .map(|(_, text)| serde_json::from_str(text).unwrap())
            .collect()
    }
}

impl Transport for MockTransport {
    fn connect(&mut self, url: &str) -> Result<SocketId, TransportError> {
        if self.fail_connect {
            return Err(TransportError::InvalidUrl {
                url: url.to_string(),
                reason: "refused by test".to_string(),
            });
        }
        self.next_id += 1;
        let socket = SocketId(self.next_id);
        self.connects.push(url.to_string());
        self.states.insert(socket, ReadyState::Connecting);
        Ok(socket)
    }

    fn send_text(&mut self, socket: SocketId, text: String) -> Result<(), TransportError> {
        if self.ready_state(socket) != ReadyState::Open {
            return Err(TransportError::SocketClosed(socket));
        }
        self.sent.push((socket, text));
        Ok(())
    }

    fn close(&mut self, socket: SocketId, code: u16) {
        self.closed.push((socket, code));
        self.states.insert(socket, ReadyState::Closing);
    }

    fn ready_state(&self, socket: SocketId) -> ReadyState {
        self.states
            .get(&socket)
            .copied()
            .unwrap_or(ReadyState::Closed)
    }
}
