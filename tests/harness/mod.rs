//! Shared test harness: an in-process relay plus WebSocket test clients.
#![allow(dead_code)]

pub mod test_client;
pub mod test_server;

pub use test_client::TestClient;
pub use test_server::TestServer;

use thiserror::Error;

/// Errors produced by harness helpers
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Client error: {0}")]
    ClientError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
