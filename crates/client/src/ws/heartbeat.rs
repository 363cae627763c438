//! Detects a connection that went silent without closing.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::config::HeartbeatConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Nothing to check: no connection is open.
    Idle,
    /// Still alive; check again at the given instant.
    Alive { next_check: Instant },
    /// No ping for longer than the timeout.
    Expired { silence: Duration },
}

#[derive(Debug)]
pub struct HeartbeatMonitor {
    config: HeartbeatConfig,
    /// Last ping, or the open time until the first ping arrives.
    last_seen: Option<Instant>,
    last_ping_at: Option<DateTime<Utc>>,
}

impl HeartbeatMonitor {
    pub fn new(config: HeartbeatConfig) -> Self {
        Self {
            config,
            last_seen: None,
            last_ping_at: None,
        }
    }

    /// Begin watching a fresh connection. Returns the first check time.
    pub fn start(&mut self, now: Instant) -> Instant {
        self.last_seen = Some(now);
        now + self.config.check_interval
    }

    pub fn stop(&mut self) {
        self.last_seen = None;
    }

    pub fn is_active(&self) -> bool {
        self.last_seen.is_some()
    }

    pub fn record_ping(&mut self, now: Instant) {
        if self.last_seen.is_some() {
            self.last_seen = Some(now);
            self.last_ping_at = Some(Utc::now());
        }
    }

    /// Wall-clock time of the last ping, for display.
    pub fn last_ping_at(&self) -> Option<DateTime<Utc>> {
        self.last_ping_at
    }

    pub fn check(&self, now: Instant) -> Liveness {
        let Some(last_seen) = self.last_seen else {
            return Liveness::Idle;
        };
        let silence = now.saturating_duration_since(last_seen);
        if silence > self.config.timeout {
            Liveness::Expired { silence }
        } else {
            Liveness::Alive {
                next_check: now + self.config.check_interval,
            }
        }
    }
}
