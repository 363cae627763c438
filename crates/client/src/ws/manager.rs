//! Connection manager: one socket, its lifecycle, and the state it feeds.
//!
//! The manager is a plain state machine. It never sleeps or spawns; every
//! transition takes the current [`Instant`] from the caller, and timers are
//! deadlines the caller polls with [`ConnectionManager::poll_timers`]. The
//! async driver in [`super::client`] feeds it real events, tests feed it
//! scripted ones.

use std::time::{Duration, Instant};

use pulseboard_shared::{is_clean_close, ClientCommand, CLOSE_NORMAL};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::heartbeat::{HeartbeatMonitor, Liveness};
use super::reconnect::{ReconnectPolicy, RetryDecision};
use super::router::{self, RouteOutcome};
use super::sender;
use super::timers::{Schedule, TimerKind};
use super::transport::{ReadyState, SocketEvent, SocketEventKind, SocketId, Transport};
use crate::config::SyncConfig;
use crate::error::{SendError, SyncError, TransportError};
use crate::stores::{DashboardSnapshot, EntityStore};

/// Connection state for the dashboard socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// A socket exists in every state but these two.
    pub fn has_socket(&self) -> bool {
        !matches!(self, ConnectionState::Idle | ConnectionState::Closed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseCause {
    /// Close event from the socket.
    Remote(u16),
    /// The transport could not even create a socket.
    ConnectFailed,
    /// We closed it ourselves after the server went quiet.
    HeartbeatTimeout,
}

impl CloseCause {
    fn is_clean(self) -> bool {
        matches!(self, CloseCause::Remote(code) if is_clean_close(code))
    }
}

pub struct ConnectionManager<T: Transport> {
    url: String,
    ready_grace: Duration,
    transport: T,
    policy: ReconnectPolicy,
    heartbeat: HeartbeatMonitor,
    timers: Schedule<TimerKind>,
    store: EntityStore,
    state: ConnectionState,
    /// The only socket whose events are applied.
    socket: Option<SocketId>,
    ready: bool,
    attempts: u32,
    /// Set by `stop()`; nothing reconnects afterwards.
    torn_down: bool,
    /// The exhaustion error was already raised.
    exhausted: bool,
    error: Option<SyncError>,
}

impl<T: Transport> ConnectionManager<T> {
    pub fn new(config: SyncConfig, transport: T) -> Self {
        Self {
            url: config.url,
            ready_grace: config.ready_grace,
            transport,
            policy: ReconnectPolicy::new(config.reconnect),
            heartbeat: HeartbeatMonitor::new(config.heartbeat),
            timers: Schedule::new(),
            store: EntityStore::new(),
            state: ConnectionState::Idle,
            socket: None,
            ready: false,
            attempts: 0,
            torn_down: false,
            exhausted: false,
            error: None,
        }
    }

    // --- accessors ---

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn error(&self) -> Option<&SyncError> {
        self.error.as_ref()
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn socket(&self) -> Option<SocketId> {
        self.socket
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Earliest pending timer; the driver sleeps until then.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn timer_deadline(&self, kind: TimerKind) -> Option<Instant> {
        self.timers.deadline(kind)
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            is_connected: self.state.is_connected(),
            is_ready: self.ready,
            error: self.error.as_ref().map(ToString::to_string),
            last_ping_at: self.heartbeat.last_ping_at(),
            ..DashboardSnapshot::capture(&self.store)
        }
    }

    // --- transitions ---

    /// Open the connection. No-op while a socket is live.
    pub fn start(&mut self, now: Instant) {
        if self.torn_down {
            warn!("start() after stop(): connection manager is torn down");
            return;
        }
        if self.state.has_socket() {
            debug!(state = ?self.state, "start() ignored, socket already live");
            return;
        }
        if self.timers.cancel(TimerKind::Reconnect) {
            debug!("manual start replaces the pending reconnect");
        }
        self.connect(now);
    }

    /// Close with 1000 and never reconnect again.
    pub fn stop(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.timers.clear();
        self.attempts = self.policy.max_attempts().saturating_add(1);
        self.ready = false;
        self.heartbeat.stop();

        match self.socket {
            Some(socket) => {
                info!(%socket, "closing connection");
                self.state = ConnectionState::Closing;
                self.transport.close(socket, CLOSE_NORMAL);
            }
            None => self.state = ConnectionState::Closed,
        }
    }

    /// Tear down and drop all entity state.
    pub fn destroy(mut self) {
        self.stop();
    }

    pub fn handle_event(&mut self, event: SocketEvent, now: Instant) {
        if self.socket != Some(event.socket) {
            debug!(socket = %event.socket, "dropping event from superseded socket");
            return;
        }
        match event.kind {
            SocketEventKind::Open => self.on_open(now),
            SocketEventKind::Message(text) => self.on_message(&text, now),
            SocketEventKind::Error(reason) => {
                let err = SyncError::Transport(TransportError::Io(reason));
                warn!(socket = %event.socket, error = %err, "socket error");
            }
            SocketEventKind::Closed { code } => self.handle_close(CloseCause::Remote(code), now),
        }
    }

    /// Fire every timer due at `now`.
    pub fn poll_timers(&mut self, now: Instant) {
        for timer in self.timers.take_due(now) {
            match timer {
                TimerKind::Reconnect => {
                    if !self.torn_down && self.socket.is_none() {
                        info!(attempt = self.attempts, "reconnecting");
                        self.connect(now);
                    }
                }
                TimerKind::ReadyGrace => {
                    if self.state == ConnectionState::Open {
                        self.mark_ready("grace period");
                    }
                }
                TimerKind::HeartbeatCheck => match self.heartbeat.check(now) {
                    Liveness::Idle => {}
                    Liveness::Alive { next_check } => {
                        self.timers.schedule(TimerKind::HeartbeatCheck, next_check);
                    }
                    Liveness::Expired { silence } => self.heartbeat_timeout(silence, now),
                },
            }
        }
    }

    /// Send `{type, data}` once connected and ready.
    pub fn send(&mut self, kind: &str, payload: &Value) -> Result<(), SendError> {
        self.check_gate(kind)?;
        let text = sender::encode(kind, payload)?;
        self.transmit(text)
    }

    pub fn send_command(&mut self, command: &ClientCommand) -> Result<(), SendError> {
        self.check_gate(command.kind())?;
        let text = sender::encode_command(command)?;
        self.transmit(text)
    }

    // --- internals ---

    fn connect(&mut self, now: Instant) {
        self.state = ConnectionState::Connecting;
        match self.transport.connect(&self.url) {
            Ok(socket) => {
                info!(%socket, url = %self.url, attempt = self.attempts, "connecting");
                self.socket = Some(socket);
            }
            Err(e) => {
                warn!(error = %SyncError::from(e), "could not create socket");
                self.handle_close(CloseCause::ConnectFailed, now);
            }
        }
    }

    fn on_open(&mut self, now: Instant) {
        if self.state != ConnectionState::Connecting {
            debug!(state = ?self.state, "ignoring open outside of connecting");
            return;
        }
        self.state = ConnectionState::Open;
        self.attempts = 0;
        self.exhausted = false;
        self.error = None;
        self.ready = false;
        self.timers
            .schedule(TimerKind::ReadyGrace, now + self.ready_grace);
        let first_check = self.heartbeat.start(now);
        self.timers.schedule(TimerKind::HeartbeatCheck, first_check);
        if let Some(socket) = self.socket {
            info!(%socket, "connected");
        }
    }

    fn on_message(&mut self, text: &str, now: Instant) {
        match router::route_frame(&mut self.store, text) {
            Ok(RouteOutcome::Ready) => self.mark_ready("initial_data"),
            Ok(RouteOutcome::ServerError(message)) => {
                warn!(%message, "server reported an error");
                self.error = Some(SyncError::Server(message));
            }
            Ok(RouteOutcome::Ping) => self.on_ping(now),
            Ok(RouteOutcome::Applied | RouteOutcome::Ignored) => {}
            Err(e) => warn!(error = %SyncError::from(e), "dropping frame"),
        }
    }

    fn on_ping(&mut self, now: Instant) {
        self.heartbeat.record_ping(now);
        let pong = sender::encode_command(&ClientCommand::Pong {}).and_then(|text| self.transmit(text));
        if let Err(e) = pong {
            warn!(error = %e, "failed to answer ping");
        }
    }

    fn mark_ready(&mut self, via: &'static str) {
        self.timers.cancel(TimerKind::ReadyGrace);
        if !self.ready {
            self.ready = true;
            info!(via, "connection ready");
        }
    }

    fn heartbeat_timeout(&mut self, silence: Duration, now: Instant) {
        let err = SyncError::HeartbeatTimeout(silence);
        warn!(error = %err, "server went quiet, forcing reconnect");
        if let Some(socket) = self.socket {
            self.transport.close(socket, CLOSE_NORMAL);
        }
        self.handle_close(CloseCause::HeartbeatTimeout, now);
    }

    fn handle_close(&mut self, cause: CloseCause, now: Instant) {
        self.socket = None;
        self.ready = false;
        self.timers.cancel(TimerKind::ReadyGrace);
        self.timers.cancel(TimerKind::HeartbeatCheck);
        self.heartbeat.stop();
        self.state = ConnectionState::Closed;

        if self.torn_down {
            debug!(?cause, "closed after teardown");
            return;
        }
        if cause.is_clean() {
            info!(?cause, "connection closed cleanly");
            self.attempts = 0;
            return;
        }

        match self.policy.next(self.attempts) {
            RetryDecision::Retry { attempt, delay } => {
                self.attempts = attempt;
                self.timers.schedule(TimerKind::Reconnect, now + delay);
                info!(
                    ?cause,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "connection lost, scheduling reconnect"
                );
            }
            RetryDecision::GiveUp => {
                if !self.exhausted {
                    self.exhausted = true;
                    let err = SyncError::ReconnectExhausted {
                        attempts: self.attempts,
                    };
                    error!(error = %err, "giving up on reconnecting");
                    self.error = Some(err);
                }
            }
        }
    }

    fn check_gate(&self, kind: &str) -> Result<(), SendError> {
        let transport = self.socket.map(|socket| self.transport.ready_state(socket));
        sender::check_gate(self.state, self.ready, transport).inspect_err(|e| {
            warn!(%kind, reason = %e, "dropping outbound command");
        })
    }

    fn transmit(&mut self, text: String) -> Result<(), SendError> {
        let socket = self.socket.ok_or(SendError::SocketNotOpen)?;
        if self.transport.ready_state(socket) != ReadyState::Open {
            return Err(SendError::SocketNotOpen);
        }
        self.transport.send_text(socket, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HeartbeatConfig, ReconnectConfig};
    use crate::ws::mock::MockTransport;
    use pulseboard_shared::{FeedStatus, CLOSE_ABNORMAL, CLOSE_NO_STATUS};
    use serde_json::json;

    type Manager = ConnectionManager<MockTransport>;

    fn config() -> SyncConfig {
        SyncConfig {
            url: "ws://dashboard.test/ws".into(),
            reconnect: ReconnectConfig {
                max_attempts: 5,
                initial_delay: Duration::from_secs(2),
                max_delay: Duration::from_secs(30),
                jitter: 0.0,
            },
            heartbeat: HeartbeatConfig {
                timeout: Duration::from_secs(40),
                check_interval: Duration::from_secs(10),
            },
            ready_grace: Duration::from_secs(1),
        }
    }

    fn manager() -> Manager {
        ConnectionManager::new(config(), MockTransport::default())
    }

    fn current(m: &Manager) -> SocketId {
        m.socket().expect("no live socket")
    }

    /// Let the transport accept the pending socket.
    fn open(m: &mut Manager, now: Instant) -> SocketId {
        let socket = current(m);
        m.transport_mut().set_state(socket, ReadyState::Open);
        m.handle_event(SocketEvent::new(socket, SocketEventKind::Open), now);
        socket
    }

    fn close(m: &mut Manager, code: u16, now: Instant) {
        let socket = current(m);
        m.transport_mut().set_state(socket, ReadyState::Closed);
        m.handle_event(SocketEvent::new(socket, SocketEventKind::Closed { code }), now);
    }

    fn receive(m: &mut Manager, frame: serde_json::Value, now: Instant) {
        let socket = current(m);
        m.handle_event(
            SocketEvent::new(socket, SocketEventKind::Message(frame.to_string())),
            now,
        );
    }

    /// Fire timers one deadline at a time up to `until`.
    fn advance(m: &mut Manager, until: Instant) {
        while let Some(deadline) = m.next_deadline() {
            if deadline > until {
                break;
            }
            m.poll_timers(deadline);
        }
    }

    #[test]
    fn start_is_idempotent() {
        let t0 = Instant::now();
        let mut m = manager();
        assert_eq!(m.state(), ConnectionState::Idle);

        m.start(t0);
        m.start(t0);
        assert_eq!(m.state(), ConnectionState::Connecting);
        open(&mut m, t0);
        m.start(t0);

        assert_eq!(m.transport().connects.len(), 1);
        assert_eq!(m.state(), ConnectionState::Open);
        assert_eq!(m.transport().connects[0], "ws://dashboard.test/ws");
    }

    #[test]
    fn clean_close_schedules_nothing_and_resets_attempts() {
        for code in [CLOSE_NORMAL, CLOSE_NO_STATUS] {
            let t0 = Instant::now();
            let mut m = manager();
            m.start(t0);
            close(&mut m, CLOSE_ABNORMAL, t0);
            assert_eq!(m.attempts(), 1);

            advance(&mut m, t0 + Duration::from_secs(2));
            assert_eq!(m.transport().connects.len(), 2);
            close(&mut m, code, t0 + Duration::from_secs(2));

            assert_eq!(m.attempts(), 0);
            assert_eq!(m.state(), ConnectionState::Closed);
            assert_eq!(m.next_deadline(), None);
            assert!(m.error().is_none());
        }
    }

    #[test]
    fn backoff_doubles_to_the_cap_then_gives_up() {
        let t0 = Instant::now();
        let mut m = manager();
        m.start(t0);
        open(&mut m, t0);

        let mut now = t0;
        let mut delays = Vec::new();
        for _ in 0..5 {
            close(&mut m, CLOSE_ABNORMAL, now);
            let deadline = m.timer_deadline(TimerKind::Reconnect).unwrap();
            delays.push((deadline - now).as_secs());
            now = deadline;
            m.poll_timers(now);
            assert_eq!(m.state(), ConnectionState::Connecting);
        }
        assert_eq!(delays, vec![2, 4, 8, 16, 30]);
        assert_eq!(m.attempts(), 5);
        assert!(m.error().is_none());

        close(&mut m, CLOSE_ABNORMAL, now);

        assert_eq!(m.next_deadline(), None);
        assert_eq!(m.state(), ConnectionState::Closed);
        let message = m.snapshot().error.unwrap();
        assert!(message.contains("gave up after 5"), "{message}");

        advance(&mut m, now + Duration::from_secs(3600));
        assert_eq!(m.transport().connects.len(), 6);
    }

    #[test]
    fn exhaustion_error_persists_through_manual_retry() {
        let t0 = Instant::now();
        let mut m = ConnectionManager::new(
            SyncConfig {
                reconnect: ReconnectConfig {
                    max_attempts: 1,
                    ..config().reconnect
                },
                ..config()
            },
            MockTransport::default(),
        );
        m.start(t0);
        close(&mut m, CLOSE_ABNORMAL, t0);
        advance(&mut m, t0 + Duration::from_secs(2));
        close(&mut m, CLOSE_ABNORMAL, t0 + Duration::from_secs(2));
        let first = m.snapshot().error.unwrap();

        // manual retry fails too: still terminal, nothing scheduled
        m.start(t0 + Duration::from_secs(10));
        assert_eq!(m.state(), ConnectionState::Connecting);
        close(&mut m, CLOSE_ABNORMAL, t0 + Duration::from_secs(10));
        assert_eq!(m.next_deadline(), None);
        assert_eq!(m.snapshot().error.unwrap(), first);

        // a manual retry that succeeds clears it
        m.start(t0 + Duration::from_secs(20));
        open(&mut m, t0 + Duration::from_secs(20));
        assert!(m.snapshot().error.is_none());
        assert_eq!(m.attempts(), 0);
    }

    #[test]
    fn transport_refusing_to_connect_counts_as_failure() {
        let t0 = Instant::now();
        let mut m = manager();
        m.transport_mut().fail_connect = true;
        m.start(t0);

        assert_eq!(m.state(), ConnectionState::Closed);
        assert_eq!(m.attempts(), 1);
        assert_eq!(
            m.timer_deadline(TimerKind::Reconnect),
            Some(t0 + Duration::from_secs(2))
        );
    }

    #[test]
    fn silent_server_forces_close_and_reconnect() {
        let t0 = Instant::now();
        let mut m = manager();
        m.start(t0);
        let first = open(&mut m, t0);
        receive(&mut m, json!({"type": "ping"}), t0 + Duration::from_secs(5));

        advance(&mut m, t0 + Duration::from_secs(49));
        assert_eq!(m.state(), ConnectionState::Open);

        advance(&mut m, t0 + Duration::from_secs(50));
        assert_eq!(m.transport().closed, vec![(first, CLOSE_NORMAL)]);
        assert_eq!(m.state(), ConnectionState::Closed);
        assert!(!m.is_ready());
        assert_eq!(m.attempts(), 1);

        // late close of the detached socket changes nothing
        m.handle_event(
            SocketEvent::new(first, SocketEventKind::Closed { code: CLOSE_NORMAL }),
            t0 + Duration::from_secs(50),
        );
        assert_eq!(m.attempts(), 1);

        advance(&mut m, t0 + Duration::from_secs(52));
        assert_eq!(m.transport().connects.len(), 2);
        assert_ne!(current(&m), first);
    }

    #[test]
    fn heartbeat_is_idle_while_disconnected() {
        let t0 = Instant::now();
        let mut m = manager();
        m.start(t0);
        open(&mut m, t0);
        assert!(m.timer_deadline(TimerKind::HeartbeatCheck).is_some());

        close(&mut m, 1011, t0 + Duration::from_secs(1));
        assert!(m.timer_deadline(TimerKind::HeartbeatCheck).is_none());

        advance(&mut m, t0 + Duration::from_secs(3));
        assert!(m.timer_deadline(TimerKind::HeartbeatCheck).is_none());
        open(&mut m, t0 + Duration::from_secs(3));
        assert_eq!(
            m.timer_deadline(TimerKind::HeartbeatCheck),
            Some(t0 + Duration::from_secs(13))
        );
    }

    #[test]
    fn ping_is_answered_before_ready() {
        let t0 = Instant::now();
        let mut m = manager();
        m.start(t0);
        open(&mut m, t0);
        assert!(!m.is_ready());

        receive(&mut m, json!({"type": "ping"}), t0);

        assert_eq!(m.transport().sent_json(), vec![json!({"type": "pong", "data": {}})]);
        assert!(m.snapshot().last_ping_at.is_some());
    }

    #[test]
    fn send_before_ready_never_reaches_the_socket() {
        let t0 = Instant::now();
        let mut m = manager();
        let payload = json!({"feed_id": "f1"});

        assert!(matches!(
            m.send("start_feed", &payload),
            Err(SendError::NotConnected(ConnectionState::Idle))
        ));
        m.start(t0);
        assert!(m.send("start_feed", &payload).is_err());
        open(&mut m, t0);
        assert!(matches!(m.send("start_feed", &payload), Err(SendError::NotReady)));
        assert!(m.transport().sent.is_empty());

        advance(&mut m, t0 + Duration::from_secs(1));
        assert!(m.is_ready());
        m.send("start_feed", &payload).unwrap();
        m.send_command(&ClientCommand::StopFeed {
            feed_id: "f1".into(),
        })
        .unwrap();

        assert_eq!(
            m.transport().sent_json(),
            vec![
                json!({"type": "start_feed", "data": {"feed_id": "f1"}}),
                json!({"type": "stop_feed", "data": {"feed_id": "f1"}}),
            ]
        );
    }

    #[test]
    fn send_requires_the_socket_to_agree() {
        let t0 = Instant::now();
        let mut m = manager();
        m.start(t0);
        let socket = open(&mut m, t0);
        receive(&mut m, json!({"type": "initial_data", "data": {}}), t0);

        m.transport_mut().set_state(socket, ReadyState::Closing);
        assert!(matches!(
            m.send("start_feed", &json!({})),
            Err(SendError::SocketNotOpen)
        ));
        assert!(m.transport().sent.is_empty());
    }

    #[test]
    fn initial_data_wins_over_grace_timer() {
        let t0 = Instant::now();
        let mut m = manager();
        m.start(t0);
        open(&mut m, t0);
        assert!(m.timer_deadline(TimerKind::ReadyGrace).is_some());

        receive(
            &mut m,
            json!({"type": "initial_data", "data": {"feeds": [{"id": "f1", "source": "cam", "status": "running"}]}}),
            t0 + Duration::from_millis(100),
        );

        assert!(m.is_ready());
        assert!(m.timer_deadline(TimerKind::ReadyGrace).is_none());
        assert_eq!(m.snapshot().feeds.len(), 1);
    }

    #[test]
    fn initial_data_without_a_body_still_makes_ready() {
        let t0 = Instant::now();
        let mut m = manager();
        m.start(t0);
        open(&mut m, t0);

        receive(&mut m, json!({"type": "initial_data"}), t0 + Duration::from_millis(10));

        assert!(m.is_ready());
        assert!(m.timer_deadline(TimerKind::ReadyGrace).is_none());
        assert!(m.snapshot().feeds.is_empty());
    }

    #[test]
    fn close_clears_readiness_immediately() {
        let t0 = Instant::now();
        let mut m = manager();
        m.start(t0);
        open(&mut m, t0);
        receive(&mut m, json!({"type": "initial_data", "data": {}}), t0);
        assert!(m.snapshot().is_ready);

        close(&mut m, CLOSE_ABNORMAL, t0);

        let snapshot = m.snapshot();
        assert!(!snapshot.is_ready);
        assert!(!snapshot.is_connected);
    }

    #[test]
    fn events_from_superseded_socket_are_dropped() {
        let t0 = Instant::now();
        let mut m = manager();
        m.start(t0);
        let first = open(&mut m, t0);
        close(&mut m, CLOSE_ABNORMAL, t0);
        advance(&mut m, t0 + Duration::from_secs(2));
        let second = open(&mut m, t0 + Duration::from_secs(2));
        assert_ne!(first, second);

        let late = json!({"type": "feed_update", "data": {"id": "f1", "status": "running"}});
        m.handle_event(
            SocketEvent::new(first, SocketEventKind::Message(late.to_string())),
            t0 + Duration::from_secs(3),
        );
        m.handle_event(
            SocketEvent::new(first, SocketEventKind::Closed { code: CLOSE_ABNORMAL }),
            t0 + Duration::from_secs(3),
        );

        assert!(m.store().feeds().is_empty());
        assert_eq!(m.state(), ConnectionState::Open);
        assert_eq!(current(&m), second);
    }

    #[test]
    fn stop_disables_reconnection() {
        let t0 = Instant::now();
        let mut m = manager();
        m.start(t0);
        let socket = open(&mut m, t0);

        m.stop();
        assert_eq!(m.state(), ConnectionState::Closing);
        assert_eq!(m.transport().closed, vec![(socket, CLOSE_NORMAL)]);
        assert_eq!(m.next_deadline(), None);
        assert!(m.attempts() > 5);

        // even an abnormal code cannot bring it back
        close(&mut m, CLOSE_ABNORMAL, t0);
        assert_eq!(m.state(), ConnectionState::Closed);
        assert_eq!(m.next_deadline(), None);

        m.start(t0 + Duration::from_secs(5));
        assert_eq!(m.transport().connects.len(), 1);
        assert!(m.is_torn_down());
    }

    #[test]
    fn stop_cancels_pending_reconnect() {
        let t0 = Instant::now();
        let mut m = manager();
        m.start(t0);
        close(&mut m, CLOSE_ABNORMAL, t0);
        assert!(m.next_deadline().is_some());

        m.stop();
        advance(&mut m, t0 + Duration::from_secs(60));

        assert_eq!(m.state(), ConnectionState::Closed);
        assert_eq!(m.transport().connects.len(), 1);
        assert!(m.transport().closed.is_empty());
    }

    #[test]
    fn feed_updates_end_to_end() {
        let t0 = Instant::now();
        let mut m = manager();
        m.start(t0);
        open(&mut m, t0);
        receive(
            &mut m,
            json!({"type": "feed_update", "data": {"id": "f1", "status": "running"}}),
            t0,
        );
        receive(
            &mut m,
            json!({"type": "feed_update", "data": {"id": "f1", "status": "error"}}),
            t0,
        );

        let snapshot = m.snapshot();
        assert_eq!(snapshot.feeds.len(), 1);
        assert_eq!(snapshot.feed("f1").unwrap().status, FeedStatus::Error);
    }

    #[test]
    fn alert_status_transitions() {
        let t0 = Instant::now();
        let mut m = manager();
        m.start(t0);
        open(&mut m, t0);
        for id in ["a1", "a2"] {
            receive(
                &mut m,
                json!({"type": "alert_update", "data": {
                    "id": id,
                    "timestamp": "2024-05-01T10:00:00Z",
                    "severity": "critical",
                    "message": "stalled vehicle",
                    "feedId": "f1"
                }}),
                t0,
            );
        }
        let before = m.snapshot().alert("a1").cloned().unwrap();

        receive(
            &mut m,
            json!({"type": "alert_status_update", "payload": {"alert_id": "a1", "status": "acknowledged"}}),
            t0,
        );
        let after = m.snapshot().alert("a1").cloned().unwrap();
        assert!(after.acknowledged);
        assert_eq!(after.message, before.message);
        assert_eq!(after.timestamp, before.timestamp);
        assert_eq!(after.feed_id, before.feed_id);
        assert_eq!(m.snapshot().open_alerts().count(), 1);

        receive(
            &mut m,
            json!({"type": "alert_status_update", "payload": {"alert_id": "a1", "status": "dismissed"}}),
            t0,
        );
        assert!(m.snapshot().alert("a1").is_none());
        assert_eq!(m.snapshot().alerts.len(), 1);
    }

    #[test]
    fn server_errors_surface_without_closing() {
        let t0 = Instant::now();
        let mut m = manager();
        m.start(t0);
        open(&mut m, t0);
        receive(&mut m, json!({"type": "error", "data": {"message": "feed f3 not found"}}), t0);
        receive(&mut m, json!({"type": "kpi_update", "data": {"vehicles": 7}}), t0);

        let snapshot = m.snapshot();
        assert_eq!(snapshot.error.as_deref(), Some("feed f3 not found"));
        assert!(snapshot.is_connected);
        assert_eq!(snapshot.kpis.get("vehicles"), Some(&json!(7)));
    }

    #[test]
    fn garbage_frames_do_not_disturb_anything() {
        let t0 = Instant::now();
        let mut m = manager();
        m.start(t0);
        let socket = open(&mut m, t0);
        receive(&mut m, json!({"type": "kpi_update", "data": {"vehicles": 7}}), t0);
        let before = m.snapshot();

        m.handle_event(
            SocketEvent::new(socket, SocketEventKind::Message("<html>".into())),
            t0,
        );
        m.handle_event(
            SocketEvent::new(socket, SocketEventKind::Error("reset by peer".into())),
            t0,
        );

        assert_eq!(m.snapshot(), before);
        assert_eq!(m.state(), ConnectionState::Open);
    }

    #[test]
    fn destroy_closes_the_socket() {
        let t0 = Instant::now();
        let mut m = manager();
        m.start(t0);
        open(&mut m, t0);
        m.stop();
        m.stop();
        assert_eq!(m.transport().closed.len(), 1);

        let mut fresh = manager();
        fresh.start(t0);
        fresh.destroy();
    }
}
