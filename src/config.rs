//! Relay configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the signaling relay server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Address to bind the listener to
    pub bind_address: String,

    /// TCP port for the combined HTTP/WebSocket listener (0 = ephemeral)
    pub port: u16,

    /// Directory served as static content alongside the WebSocket endpoint
    pub static_dir: PathBuf,

    /// Interval between heartbeat pings on each connection, in milliseconds
    pub heartbeat_interval_ms: u64,

    /// Interval between expiry sweeps over the session directory, in milliseconds
    pub sweep_interval_ms: u64,

    /// Idle time after which an empty session is evicted, in milliseconds
    pub session_timeout_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            static_dir: PathBuf::from("public"),
            heartbeat_interval_ms: 30_000,
            sweep_interval_ms: 300_000,   // 5 minutes
            session_timeout_ms: 3_600_000, // 1 hour
        }
    }
}

impl RelayConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values
    pub fn validate(&self) -> crate::Result<()> {
        if self.bind_address.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "bind_address must not be empty".to_string(),
            ));
        }

        if self.heartbeat_interval_ms < 50 || self.heartbeat_interval_ms > 600_000 {
            return Err(crate::Error::InvalidConfig(format!(
                "heartbeat_interval_ms must be in range 50-600000, got {}",
                self.heartbeat_interval_ms
            )));
        }

        if self.sweep_interval_ms < 50 {
            return Err(crate::Error::InvalidConfig(format!(
                "sweep_interval_ms must be at least 50, got {}",
                self.sweep_interval_ms
            )));
        }

        if self.session_timeout_ms == 0 {
            return Err(crate::Error::InvalidConfig(
                "session_timeout_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Heartbeat ping interval as a [`Duration`]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Expiry sweep interval as a [`Duration`]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Empty-session expiry timeout as a [`Duration`]
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    /// Set the bind address
    pub fn with_bind_address(mut self, addr: impl Into<String>) -> Self {
        self.bind_address = addr.into();
        self
    }

    /// Set the listener port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the static content directory
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = dir.into();
        self
    }

    /// Set the heartbeat ping interval in milliseconds
    pub fn with_heartbeat_interval_ms(mut self, ms: u64) -> Self {
        self.heartbeat_interval_ms = ms;
        self
    }

    /// Set the expiry sweep interval in milliseconds
    pub fn with_sweep_interval_ms(mut self, ms: u64) -> Self {
        self.sweep_interval_ms = ms;
        self
    }

    /// Set the empty-session expiry timeout in milliseconds
    pub fn with_session_timeout_ms(mut self, ms: u64) -> Self {
        self.session_timeout_ms = ms;
        self
    }
}
