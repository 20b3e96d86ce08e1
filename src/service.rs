//! Message routing between connections and sessions.
//!
//! [`SignalingService`] owns the session directory and the connection side
//! table behind a single lock, so every handler observes and mutates relay
//! state atomically. Handler failures are reported to the offending
//! connection as an `error` envelope and never tear the connection down.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{broadcast, RwLock};

use crate::config::RelayConfig;
use crate::connection::{ConnectionHandle, ConnectionId};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::SessionDirectory;

/// Registry entry for one live connection
#[derive(Debug)]
struct ConnectionEntry {
    handle: ConnectionHandle,
    user_id: Option<String>,
    session_id: Option<String>,
}

/// Relay state guarded by one lock: the directory plus the side table
/// binding each connection to its user id and session.
#[derive(Debug, Default)]
struct RelayState {
    directory: SessionDirectory,
    connections: HashMap<ConnectionId, ConnectionEntry>,
}

impl RelayState {
    /// Remove the connection's session membership, if any.
    ///
    /// Clears the binding, fans out `peerLeft` to the remaining
    /// participants, and drops the session once it empties. Returns the
    /// cleared `(user_id, session_id)` pair; unbound connections are a
    /// no-op returning `None`.
    fn detach(&mut self, connection_id: ConnectionId) -> Option<(String, String)> {
        let entry = self.connections.get_mut(&connection_id)?;
        let user_id = entry.user_id.take();
        let session_id = entry.session_id.take();
        let (Some(user_id), Some(session_id)) = (user_id, session_id) else {
            return None;
        };

        if let Some(session) = self.directory.get_mut(&session_id) {
            if session.remove_participant(&user_id) {
                self.directory.remove_session(&session_id);
            }
        }
        Some((user_id, session_id))
    }

    fn bound_identity(&self, connection_id: ConnectionId) -> crate::Result<(String, String)> {
        let entry = self
            .connections
            .get(&connection_id)
            .ok_or(crate::Error::NoActiveSession)?;
        match (&entry.user_id, &entry.session_id) {
            (Some(user_id), Some(session_id)) => Ok((user_id.clone(), session_id.clone())),
            _ => Err(crate::Error::NoActiveSession),
        }
    }
}

/// Routes client messages, tracks connections, and sweeps expired sessions
#[derive(Debug)]
pub struct SignalingService {
    state: RwLock<RelayState>,
    session_timeout: Duration,
}

impl SignalingService {
    /// Create a service with the given relay configuration
    ///
    /// ```
    /// use signal_relay::{RelayConfig, SignalingService};
    ///
    /// # tokio_test::block_on(async {
    /// let service = SignalingService::new(&RelayConfig::default());
    /// assert_eq!(service.session_count().await, 0);
    /// # });
    /// ```
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            state: RwLock::new(RelayState::default()),
            session_timeout: config.session_timeout(),
        }
    }

    /// Register a connection's outbound handle
    pub async fn register(&self, handle: ConnectionHandle) {
        let connection_id = handle.id();
        let mut guard = self.state.write().await;
        guard.connections.insert(
            connection_id,
            ConnectionEntry {
                handle,
                user_id: None,
                session_id: None,
            },
        );
        tracing::debug!(connection_id, "Connection registered");
    }

    /// Handle one inbound frame from a connection.
    ///
    /// A failing handler replies with an `error` envelope; the connection
    /// stays registered and usable either way.
    pub async fn handle_message(&self, connection_id: ConnectionId, raw: &str) {
        if let Err(e) = self.dispatch(connection_id, raw).await {
            tracing::debug!(connection_id, error = %e, "Handler failure");
            let guard = self.state.read().await;
            if let Some(entry) = guard.connections.get(&connection_id) {
                entry.handle.send(&ServerMessage::Error {
                    message: e.to_string(),
                });
            }
        }
    }

    async fn dispatch(&self, connection_id: ConnectionId, raw: &str) -> crate::Result<()> {
        match ClientMessage::from_json(raw)? {
            ClientMessage::Join { room, user_id } => {
                self.handle_join(connection_id, room, user_id).await
            }
            ClientMessage::Offer {
                target_user_id,
                data,
                ..
            } => {
                self.forward_signal(connection_id, target_user_id, data, |data, from, target| {
                    ServerMessage::Offer {
                        data,
                        from,
                        target_user_id: target,
                    }
                })
                .await
            }
            ClientMessage::Answer {
                target_user_id,
                data,
                ..
            } => {
                self.forward_signal(connection_id, target_user_id, data, |data, from, target| {
                    ServerMessage::Answer {
                        data,
                        from,
                        target_user_id: target,
                    }
                })
                .await
            }
            ClientMessage::Candidate {
                target_user_id,
                data,
                ..
            } => {
                self.forward_signal(connection_id, target_user_id, data, |data, from, target| {
                    ServerMessage::Candidate {
                        data,
                        from,
                        target_user_id: target,
                    }
                })
                .await
            }
            ClientMessage::Leave { .. } => self.handle_leave(connection_id).await,
            ClientMessage::RecordingRequest { data, .. } => {
                self.handle_recording_request(connection_id, data).await
            }
            ClientMessage::RecordingResponse {
                target_user_id,
                data,
                ..
            } => {
                self.handle_recording_response(connection_id, target_user_id, data)
                    .await
            }
            ClientMessage::Unknown => {
                tracing::debug!(connection_id, "Ignoring unknown message type");
                Ok(())
            }
        }
    }

    async fn handle_join(
        &self,
        connection_id: ConnectionId,
        room: Option<String>,
        user_id: String,
    ) -> crate::Result<()> {
        let room_id = match room {
            Some(room) if !room.is_empty() => room,
            _ => return Err(crate::Error::MissingRoom),
        };

        let mut guard = self.state.write().await;
        let state = &mut *guard;

        // One session per connection: moving rooms detaches first.
        state.detach(connection_id);

        let Some(entry) = state.connections.get(&connection_id) else {
            return Ok(());
        };
        let handle = entry.handle.clone();

        let session_id = state.directory.find_or_create(&room_id);
        let session = state
            .directory
            .get_mut(&session_id)
            .ok_or_else(|| crate::Error::SessionNotFound(session_id.clone()))?;
        session.add_participant(&user_id, handle)?;

        if let Some(entry) = state.connections.get_mut(&connection_id) {
            entry.user_id = Some(user_id.clone());
            entry.session_id = Some(session_id.clone());
        }

        tracing::info!(
            connection_id,
            session_id = %session_id,
            room_id = %room_id,
            user_id = %user_id,
            "Participant joined"
        );
        Ok(())
    }

    async fn forward_signal<F>(
        &self,
        connection_id: ConnectionId,
        target_user_id: String,
        data: Value,
        build: F,
    ) -> crate::Result<()>
    where
        F: FnOnce(Value, String, String) -> ServerMessage,
    {
        let guard = self.state.read().await;
        let (from, session_id) = guard.bound_identity(connection_id)?;

        let Some(session) = guard.directory.get(&session_id) else {
            drop(guard);
            self.clear_binding(connection_id).await;
            return Err(crate::Error::SessionNotFound(session_id));
        };

        let message = build(data, from, target_user_id.clone());
        if !session.send_to(&target_user_id, &message) {
            // Absent or closed targets drop the signal silently.
            tracing::debug!(
                session_id = %session_id,
                target_user_id = %target_user_id,
                "Dropped signal for unreachable target"
            );
        }
        Ok(())
    }

    async fn handle_leave(&self, connection_id: ConnectionId) -> crate::Result<()> {
        let mut guard = self.state.write().await;
        if let Some((user_id, session_id)) = guard.detach(connection_id) {
            tracing::info!(
                connection_id,
                user_id = %user_id,
                session_id = %session_id,
                "Participant left"
            );
        }
        Ok(())
    }

    async fn handle_recording_request(
        &self,
        connection_id: ConnectionId,
        data: Value,
    ) -> crate::Result<()> {
        let guard = self.state.read().await;
        let (from, session_id) = guard.bound_identity(connection_id)?;

        let Some(session) = guard.directory.get(&session_id) else {
            drop(guard);
            self.clear_binding(connection_id).await;
            return Err(crate::Error::SessionNotFound(session_id));
        };

        session.broadcast(
            &ServerMessage::RecordingRequest {
                data,
                from: from.clone(),
            },
            Some(&from),
        );
        Ok(())
    }

    async fn handle_recording_response(
        &self,
        connection_id: ConnectionId,
        target_user_id: String,
        data: Value,
    ) -> crate::Result<()> {
        let guard = self.state.read().await;
        let (from, session_id) = guard.bound_identity(connection_id)?;

        let Some(session) = guard.directory.get(&session_id) else {
            drop(guard);
            self.clear_binding(connection_id).await;
            return Err(crate::Error::SessionNotFound(session_id));
        };

        let message = ServerMessage::RecordingResponse { data, from };
        if !session.send_to(&target_user_id, &message) {
            tracing::debug!(
                session_id = %session_id,
                target_user_id = %target_user_id,
                "Dropped recording response for unreachable target"
            );
        }
        Ok(())
    }

    /// A bound session can only vanish through eviction; drop the stale
    /// binding so later messages report cleanly.
    async fn clear_binding(&self, connection_id: ConnectionId) {
        let mut guard = self.state.write().await;
        if let Some(entry) = guard.connections.get_mut(&connection_id) {
            entry.user_id = None;
            entry.session_id = None;
        }
    }

    /// Tear down a connection: session cleanup plus registry removal
    pub async fn handle_disconnect(&self, connection_id: ConnectionId) {
        let mut guard = self.state.write().await;
        let binding = guard.detach(connection_id);
        guard.connections.remove(&connection_id);
        match binding {
            Some((user_id, session_id)) => tracing::info!(
                connection_id,
                user_id = %user_id,
                session_id = %session_id,
                "Connection closed"
            ),
            None => tracing::debug!(connection_id, "Connection closed"),
        }
    }

    /// Evict sessions that have been empty longer than the configured
    /// timeout; returns how many were removed.
    ///
    /// Called from the sweep loop and directly callable from tests.
    pub async fn sweep_expired(&self) -> usize {
        let mut guard = self.state.write().await;
        guard.directory.sweep_expired(self.session_timeout).len()
    }

    /// Periodic sweep driver; exits when the shutdown channel fires
    pub async fn run_sweep_loop(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        tracing::debug!(interval_ms = interval.as_millis() as u64, "Expiry sweeper started");
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    self.sweep_expired().await;
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("Expiry sweeper stopped");
                    break;
                }
            }
        }
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.state.read().await.directory.session_count()
    }

    /// Number of rooms with at least one session
    pub async fn room_count(&self) -> usize {
        self.state.read().await.directory.room_count()
    }

    /// Number of registered connections
    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }
}
