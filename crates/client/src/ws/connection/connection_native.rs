//! Native WebSocket transport using tokio-tungstenite.
//!
//! Every socket runs in its own tokio task. The task owns the stream, writes
//! whatever the manager queues for it, and reports everything that happens as
//! [`SocketEvent`]s on one shared channel, so the manager sees all sockets'
//! events in a single ordered stream.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::{SinkExt, StreamExt};
use pulseboard_shared::{CLOSE_ABNORMAL, CLOSE_NO_STATUS};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};

use crate::error::TransportError;
use crate::ws::transport::{ReadyState, SocketEvent, SocketEventKind, SocketId, Transport};

/// What the manager asks a socket task to do.
#[derive(Debug)]
enum Outbound {
    Text(String),
    Close(u16),
}

struct SocketHandle {
    outbound: UnboundedSender<Outbound>,
    state: Arc<AtomicU8>,
}

/// Spawns one tokio task per socket; must be used inside a tokio runtime.
pub struct TungsteniteTransport {
    events: UnboundedSender<SocketEvent>,
    next_id: u64,
    sockets: HashMap<SocketId, SocketHandle>,
}

impl TungsteniteTransport {
    /// Events for every socket this transport opens go to `events`.
    pub fn new(events: UnboundedSender<SocketEvent>) -> Self {
        Self {
            events,
            next_id: 0,
            sockets: HashMap::new(),
        }
    }

    fn prune_closed(&mut self) {
        self.sockets
            .retain(|_, handle| ReadyState::from(handle.state.load(Ordering::Acquire)) != ReadyState::Closed);
    }
}

impl Transport for TungsteniteTransport {
    fn connect(&mut self, url: &str) -> Result<SocketId, TransportError> {
        let parsed = url::Url::parse(url).map_err(|e| TransportError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(TransportError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme {:?}", parsed.scheme()),
            });
        }

        self.prune_closed();
        self.next_id += 1;
        let socket = SocketId(self.next_id);
        let (outbound, outbound_rx) = unbounded();
        let state = Arc::new(AtomicU8::new(ReadyState::Connecting as u8));

        tokio::spawn(run_socket(
            socket,
            parsed.to_string(),
            outbound_rx,
            state.clone(),
            self.events.clone(),
        ));
        self.sockets.insert(socket, SocketHandle { outbound, state });
        Ok(socket)
    }

    fn send_text(&mut self, socket: SocketId, text: String) -> Result<(), TransportError> {
        let handle = self
            .sockets
            .get(&socket)
            .ok_or(TransportError::SocketClosed(socket))?;
        handle
            .outbound
            .unbounded_send(Outbound::Text(text))
            .map_err(|_| TransportError::SocketClosed(socket))
    }

    fn close(&mut self, socket: SocketId, code: u16) {
        if let Some(handle) = self.sockets.get(&socket) {
            let _ = handle
                .state
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                    match ReadyState::from(state) {
                        ReadyState::Connecting | ReadyState::Open => Some(ReadyState::Closing as u8),
                        _ => None,
                    }
                });
            let _ = handle.outbound.unbounded_send(Outbound::Close(code));
        }
    }

    fn ready_state(&self, socket: SocketId) -> ReadyState {
        self.sockets
            .get(&socket)
            .map(|handle| ReadyState::from(handle.state.load(Ordering::Acquire)))
            .unwrap_or(ReadyState::Closed)
    }
}

/// Drive one socket from connect to close. Always ends with a `Closed` event.
async fn run_socket(
    socket: SocketId,
    url: String,
    mut outbound: UnboundedReceiver<Outbound>,
    state: Arc<AtomicU8>,
    events: UnboundedSender<SocketEvent>,
) {
    let emit = |kind: SocketEventKind| {
        // Receiver gone means the driver shut down; nothing left to tell.
        let _ = events.unbounded_send(SocketEvent::new(socket, kind));
    };

    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            tracing::debug!(%socket, error = %e, "connect failed");
            state.store(ReadyState::Closed as u8, Ordering::Release);
            emit(SocketEventKind::Error(e.to_string()));
            emit(SocketEventKind::Closed {
                code: CLOSE_ABNORMAL,
            });
            return;
        }
    };

    let (mut write, mut read) = stream.split();
    // A close requested during the handshake already moved the state to
    // Closing; the queued close is handled below without reporting Open.
    let opened = state
        .compare_exchange(
            ReadyState::Connecting as u8,
            ReadyState::Open as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        )
        .is_ok();
    if opened {
        emit(SocketEventKind::Open);
    }

    let code = loop {
        tokio::select! {
            command = outbound.next() => match command {
                Some(Outbound::Text(text)) => {
                    if let Err(e) = write.send(Message::text(text)).await {
                        tracing::debug!(%socket, error = %e, "send failed");
                        emit(SocketEventKind::Error(e.to_string()));
                        break CLOSE_ABNORMAL;
                    }
                }
                Some(Outbound::Close(code)) => {
                    state.store(ReadyState::Closing as u8, Ordering::Release);
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: Utf8Bytes::from_static(""),
                    };
                    let _ = write.send(Message::Close(Some(frame))).await;
                    break code;
                }
                None => {
                    // Transport dropped: the client is gone.
                    let _ = write.send(Message::Close(None)).await;
                    break CLOSE_NO_STATUS;
                }
            },
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    emit(SocketEventKind::Message(text.as_str().to_owned()));
                }
                Some(Ok(Message::Close(frame))) => {
                    break frame.map(|f| u16::from(f.code)).unwrap_or(CLOSE_NO_STATUS);
                }
                Some(Ok(_)) => {
                    // Binary and protocol-level ping/pong are not part of the dashboard protocol
                }
                Some(Err(e)) => {
                    emit(SocketEventKind::Error(e.to_string()));
                    break CLOSE_ABNORMAL;
                }
                None => break CLOSE_ABNORMAL,
            },
        }
    };

    state.store(ReadyState::Closed as u8, Ordering::Release);
    tracing::debug!(%socket, code, "socket closed");
    emit(SocketEventKind::Closed { code });
}
