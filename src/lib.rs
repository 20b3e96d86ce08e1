//! Room-scoped WebRTC signaling relay with bounded two-party sessions.
//!
//! Clients connect over WebSocket, join a named room, and are paired into a
//! session of at most two participants. The relay forwards opaque
//! negotiation payloads (`offer`/`answer`/`candidate`) and recording control
//! messages between exactly the right participants; it never inspects them.
//!
//! # Features
//!
//! - Rooms bucket any number of bounded pair sessions; joins fill the oldest
//!   session with spare capacity before opening a new one
//! - Fire-and-forget delivery: closed or absent targets are skipped, never
//!   stall a handler
//! - Per-connection heartbeat with forced termination on a missed pong
//! - Periodic expiry sweep evicting sessions left empty past a timeout
//! - Static demo client and health endpoint on the same listener
//!
//! # Architecture
//!
//! ```text
//!   client A --ws--+                    +--ws-- client B
//!                  v                    v
//!              socket task          socket task
//!             (heartbeat)          (heartbeat)
//!                  |                    |
//!                  +--------+  +--------+
//!                           v  v
//!                     SignalingService
//!                  (router + connection
//!                       registry)
//!                           |
//!                           v
//!                    SessionDirectory
//!                    rooms -> sessions
//!                     (<= 2 peers each)
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use signal_relay::{RelayConfig, RelayServer};
//!
//! # async fn run() -> signal_relay::Result<()> {
//! let config = RelayConfig::default().with_port(8080);
//! let handle = RelayServer::new(config)?.start().await?;
//! println!("listening on {}", handle.addr());
//! handle.shutdown().await?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod server;
pub mod service;
pub mod session;

pub use config::RelayConfig;
pub use connection::{ConnectionHandle, ConnectionId};
pub use error::{Error, Result};
pub use protocol::{ClientMessage, ServerMessage};
pub use server::{RelayServer, RelayServerHandle};
pub use service::SignalingService;
pub use session::{Session, SessionDirectory, SESSION_CAPACITY};

/// Returns the version of the crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
