//! Client configuration, with overrides from environment variables.

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_URL: &str = "ws://localhost:8000/ws/dashboard";

/// Upper bound for every configured delay, so deadlines never overflow `Instant`.
pub const MAX_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: invalid value {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("invalid WebSocket URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("{0}")]
    Invalid(String),
}

/// Configuration for auto-reconnect behavior
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Attempts allowed after a drop before giving up for good
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Random spread applied to each delay, 0.0 to 1.0 (0 = deterministic)
    pub jitter: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            jitter: 0.0,
        }
    }
}

/// Liveness checking against the server's ping frames
#[derive(Debug, Clone, PartialEq)]
pub struct HeartbeatConfig {
    /// Silence longer than this forces a reconnect
    pub timeout: Duration,
    /// How often silence is checked
    pub check_interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(40),
            check_interval: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Dashboard WebSocket endpoint (`ws://` or `wss://`)
    pub url: String,
    pub reconnect: ReconnectConfig,
    pub heartbeat: HeartbeatConfig,
    /// Readiness is assumed this long after open if no `initial_data` arrives
    pub ready_grace: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            reconnect: ReconnectConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            ready_grace: Duration::from_secs(1),
        }
    }
}

impl SyncConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Parse configuration from environment variables.
    ///
    /// Environment variables (all optional):
    /// - `PULSEBOARD_WS_URL`: endpoint (default: `ws://localhost:8000/ws/dashboard`)
    /// - `PULSEBOARD_RECONNECT_MAX_ATTEMPTS` (default: 5)
    /// - `PULSEBOARD_RECONNECT_INITIAL_DELAY_MS` (default: 2000)
    /// - `PULSEBOARD_RECONNECT_MAX_DELAY_MS` (default: 30000)
    /// - `PULSEBOARD_RECONNECT_JITTER` (default: 0.0)
    /// - `PULSEBOARD_HEARTBEAT_TIMEOUT_MS` (default: 40000)
    /// - `PULSEBOARD_HEARTBEAT_INTERVAL_MS` (default: 10000)
    /// - `PULSEBOARD_READY_GRACE_MS` (default: 1000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`SyncConfig::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup("PULSEBOARD_WS_URL") {
            config.url = url;
        }
        if let Some(n) = parse_var(&lookup, "PULSEBOARD_RECONNECT_MAX_ATTEMPTS")? {
            config.reconnect.max_attempts = n;
        }
        if let Some(ms) = parse_var(&lookup, "PULSEBOARD_RECONNECT_INITIAL_DELAY_MS")? {
            config.reconnect.initial_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, "PULSEBOARD_RECONNECT_MAX_DELAY_MS")? {
            config.reconnect.max_delay = Duration::from_millis(ms);
        }
        if let Some(jitter) = parse_var(&lookup, "PULSEBOARD_RECONNECT_JITTER")? {
            config.reconnect.jitter = jitter;
        }
        if let Some(ms) = parse_var(&lookup, "PULSEBOARD_HEARTBEAT_TIMEOUT_MS")? {
            config.heartbeat.timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, "PULSEBOARD_HEARTBEAT_INTERVAL_MS")? {
            config.heartbeat.check_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, "PULSEBOARD_READY_GRACE_MS")? {
            config.ready_grace = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(&self.url).map_err(|e| ConfigError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(ConfigError::InvalidUrl {
                url: self.url.clone(),
                reason: format!("unsupported scheme {:?}", parsed.scheme()),
            });
        }
        if !(0.0..=1.0).contains(&self.reconnect.jitter) {
            return Err(ConfigError::Invalid(format!(
                "reconnect jitter must be within 0.0..=1.0, got {}",
                self.reconnect.jitter
            )));
        }
        if self.reconnect.initial_delay > self.reconnect.max_delay {
            return Err(ConfigError::Invalid(
                "reconnect initial delay exceeds the maximum delay".to_string(),
            ));
        }
        if self.heartbeat.check_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "heartbeat check interval must be non-zero".to_string(),
            ));
        }
        let durations = [
            ("reconnect initial delay", self.reconnect.initial_delay),
            ("reconnect max delay", self.reconnect.max_delay),
            ("heartbeat timeout", self.heartbeat.timeout),
            ("heartbeat check interval", self.heartbeat.check_interval),
            ("ready grace", self.ready_grace),
        ];
        for (name, value) in durations {
            if value > MAX_DURATION {
                return Err(ConfigError::Invalid(format!(
                    "{name} of {value:?} exceeds the {MAX_DURATION:?} limit"
                )));
            }
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}
