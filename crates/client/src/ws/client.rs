//! Async driver that owns a [`ConnectionManager`] and feeds it real time.
//!
//! The manager is a plain state machine. This module runs it on a tokio task:
//! commands from [`SyncClient`] handles, socket events from the transport and
//! timer deadlines are multiplexed in one loop, and every change is
//! published as a [`DashboardSnapshot`] on a watch channel.

use std::time::Instant;

use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_channel::oneshot;
use futures_util::StreamExt;
use pulseboard_shared::ClientCommand;
use serde_json::Value;
use tokio::sync::watch;

use super::connection::TungsteniteTransport;
use super::manager::ConnectionManager;
use super::transport::{SocketEvent, Transport};
use crate::config::{ConfigError, SyncConfig};
use crate::error::SendError;
use crate::stores::DashboardSnapshot;

enum Command {
    Start,
    Send {
        kind: String,
        payload: Value,
        reply: oneshot::Sender<Result<(), SendError>>,
    },
    SendCommand {
        command: ClientCommand,
        reply: oneshot::Sender<Result<(), SendError>>,
    },
    Stop {
        closed: Option<oneshot::Sender<()>>,
    },
}

/// Cheap, cloneable handle to a running sync driver.
///
/// The driver stops once every handle is dropped.
#[derive(Clone)]
pub struct SyncClient {
    commands: UnboundedSender<Command>,
    snapshots: watch::Receiver<DashboardSnapshot>,
}

impl SyncClient {
    /// Validate `config` and spawn the driver on the current tokio runtime.
    /// Nothing connects until [`SyncClient::start`] is called.
    pub fn spawn(config: SyncConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let (event_tx, event_rx) = unbounded();
        let manager = ConnectionManager::new(config, TungsteniteTransport::new(event_tx));
        let (command_tx, command_rx) = unbounded();
        let (snapshot_tx, snapshot_rx) = watch::channel(manager.snapshot());

        tokio::spawn(drive(manager, command_rx, event_rx, snapshot_tx));

        Ok(Self {
            commands: command_tx,
            snapshots: snapshot_rx,
        })
    }

    pub fn start(&self) {
        if self.commands.unbounded_send(Command::Start).is_err() {
            tracing::warn!("start() ignored: sync driver has shut down");
        }
    }

    /// Close the connection for good. Later `start()` calls are ignored.
    pub fn stop(&self) {
        let _ = self.commands.unbounded_send(Command::Stop { closed: None });
    }

    /// Like [`SyncClient::stop`], but resolves once the socket has closed.
    pub async fn shutdown(&self) {
        let (closed, done) = oneshot::channel();
        if self
            .commands
            .unbounded_send(Command::Stop {
                closed: Some(closed),
            })
            .is_ok()
        {
            let _ = done.await;
        }
    }

    /// Send `{type, data}` to the server once connected and ready.
    pub async fn send(&self, kind: impl Into<String>, payload: Value) -> Result<(), SendError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .unbounded_send(Command::Send {
                kind: kind.into(),
                payload,
                reply,
            })
            .map_err(|_| SendError::DriverGone)?;
        response.await.map_err(|_| SendError::DriverGone)?
    }

    pub async fn send_command(&self, command: ClientCommand) -> Result<(), SendError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .unbounded_send(Command::SendCommand { command, reply })
            .map_err(|_| SendError::DriverGone)?;
        response.await.map_err(|_| SendError::DriverGone)?
    }

    pub async fn start_feed(&self, feed_id: impl Into<String>) -> Result<(), SendError> {
        self.send_command(ClientCommand::StartFeed {
            feed_id: feed_id.into(),
        })
        .await
    }

    pub async fn stop_feed(&self, feed_id: impl Into<String>) -> Result<(), SendError> {
        self.send_command(ClientCommand::StopFeed {
            feed_id: feed_id.into(),
        })
        .await
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that wakes on every snapshot change.
    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshots.clone()
    }
}

async fn drive<T: Transport>(
    mut manager: ConnectionManager<T>,
    mut commands: UnboundedReceiver<Command>,
    mut events: UnboundedReceiver<SocketEvent>,
    snapshots: watch::Sender<DashboardSnapshot>,
) {
    tracing::debug!("sync driver started");
    let mut waiting_for_close = Vec::new();
    loop {
        let deadline = manager.next_deadline();
        tokio::select! {
            command = commands.next() => match command {
                Some(Command::Start) => manager.start(Instant::now()),
                Some(Command::Send { kind, payload, reply }) => {
                    let _ = reply.send(manager.send(&kind, &payload));
                }
                Some(Command::SendCommand { command, reply }) => {
                    let _ = reply.send(manager.send_command(&command));
                }
                Some(Command::Stop { closed }) => {
                    manager.stop();
                    waiting_for_close.extend(closed);
                }
                None => {
                    manager.destroy();
                    break;
                }
            },
            Some(event) = events.next() => manager.handle_event(event, Instant::now()),
            _ = sleep_until(deadline) => manager.poll_timers(Instant::now()),
        }
        publish(&snapshots, manager.snapshot());
        if manager.is_torn_down() && manager.socket().is_none() {
            for closed in waiting_for_close.drain(..) {
                let _ = closed.send(());
            }
        }
    }
    tracing::debug!("sync driver stopped");
}

fn publish(snapshots: &watch::Sender<DashboardSnapshot>, next: DashboardSnapshot) {
    snapshots.send_if_modified(|current| {
        if *current == next {
            return false;
        }
        *current = next;
        true
    });
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}
