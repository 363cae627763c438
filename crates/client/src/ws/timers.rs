//! Keyed, cancellable timers driven by explicit instants.
//!
//! Nothing here sleeps. The owner asks for [`Schedule::next_deadline`], waits
//! however it likes (a tokio sleep in production, nothing at all in tests) and
//! then calls [`Schedule::take_due`] with the current time.

use std::collections::BTreeMap;
use std::time::Instant;

/// Timers owned by the connection manager. At most one of each is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerKind {
    Reconnect,
    ReadyGrace,
    HeartbeatCheck,
}

#[derive(Debug)]
pub struct Schedule<K: Ord + Copy> {
    deadlines: BTreeMap<K, Instant>,
}

impl<K: Ord + Copy> Default for Schedule<K> {
    fn default() -> Self {
        Self {
            deadlines: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Copy> Schedule<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `key` for `at`, replacing any pending deadline for the same key.
    pub fn schedule(&mut self, key: K, at: Instant) -> Option<Instant> {
        self.deadlines.insert(key, at)
    }

    /// Returns whether something was actually pending.
    pub fn cancel(&mut self, key: K) -> bool {
        self.deadlines.remove(&key).is_some()
    }

    pub fn clear(&mut self) {
        self.deadlines.clear();
    }

    pub fn is_scheduled(&self, key: K) -> bool {
        self.deadlines.contains_key(&key)
    }

    pub fn deadline(&self, key: K) -> Option<Instant> {
        self.deadlines.get(&key).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Remove and return every key due at `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<K> {
        let mut due: Vec<(Instant, K)> = self
            .deadlines
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(key, at)| (*at, *key))
            .collect();
        due.sort();
        for (_, key) in &due {
            self.deadlines.remove(key);
        }
        due.into_iter().map(|(_, key)| key).collect()
    }
}
