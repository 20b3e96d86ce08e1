//! In-process relay server for integration tests.

use std::sync::Arc;

use signal_relay::{RelayConfig, RelayServer, RelayServerHandle, SignalingService};

use super::{HarnessError, HarnessResult};

/// A relay bound to an ephemeral port on localhost
pub struct TestServer {
    handle: RelayServerHandle,
}

impl TestServer {
    /// Start a relay with test-friendly defaults
    pub async fn start() -> HarnessResult<Self> {
        Self::start_with_config(Self::default_config()).await
    }

    /// Default test configuration: localhost, ephemeral port, timers long
    /// enough to stay out of the way unless a test shortens them.
    pub fn default_config() -> RelayConfig {
        RelayConfig::default()
            .with_bind_address("127.0.0.1")
            .with_port(0)
            .with_heartbeat_interval_ms(30_000)
            .with_sweep_interval_ms(60_000)
            .with_session_timeout_ms(600_000)
    }

    /// Start a relay with an explicit configuration
    pub async fn start_with_config(config: RelayConfig) -> HarnessResult<Self> {
        let server =
            RelayServer::new(config).map_err(|e| HarnessError::ServerError(e.to_string()))?;
        let handle = server
            .start()
            .await
            .map_err(|e| HarnessError::ServerError(e.to_string()))?;
        Ok(Self { handle })
    }

    /// WebSocket URL of the signaling endpoint
    pub fn ws_url(&self) -> String {
        self.handle.ws_url()
    }

    /// Shared signaling service, for asserting on relay state
    pub fn service(&self) -> Arc<SignalingService> {
        self.handle.service()
    }

    /// Stop the server
    pub async fn shutdown(self) -> HarnessResult<()> {
        self.handle
            .shutdown()
            .await
            .map_err(|e| HarnessError::ServerError(e.to_string()))
    }
}
