//! Error types for the signaling relay.

/// Result type for relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the signaling relay
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A join request did not name a room
    #[error("Join request is missing a room")]
    MissingRoom,

    /// A routed message arrived on a connection that has not joined a session
    #[error("No active session for this connection")]
    NoActiveSession,

    /// The session already holds its maximum number of participants
    #[error("Session {0} is full")]
    SessionFull(String),

    /// The connection's bound session no longer exists in the directory
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Failed to serialize or deserialize a message
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Other errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Returns true for per-message routing failures.
    ///
    /// These are reported back to the offending connection as an `error`
    /// envelope; the connection itself stays usable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::MissingRoom
                | Error::NoActiveSession
                | Error::SessionFull(_)
                | Error::SessionNotFound(_)
                | Error::SerializationError(_)
        )
    }

    /// Returns true if this error indicates invalid configuration
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::InvalidConfig(_))
    }
}
