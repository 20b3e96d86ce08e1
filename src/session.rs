//! Pair sessions and the room directory.
//!
//! A [`Session`] holds up to two participants exchanging signaling traffic.
//! The [`SessionDirectory`] indexes sessions by id and buckets them by room;
//! joining a room fills the oldest session with spare capacity before a new
//! one is created.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::connection::ConnectionHandle;
use crate::protocol::ServerMessage;

/// Maximum number of participants per session
pub const SESSION_CAPACITY: usize = 2;

/// A bounded two-party signaling session inside a room
#[derive(Debug)]
pub struct Session {
    id: String,
    room_id: String,
    participants: HashMap<String, ConnectionHandle>,
    last_activity: Instant,
}

impl Session {
    fn new(room_id: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            room_id: room_id.to_string(),
            participants: HashMap::new(),
            last_activity: Instant::now(),
        }
    }

    /// Session identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Room this session belongs to
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Number of current participants
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// True while the session has spare capacity
    pub fn is_available(&self) -> bool {
        self.participants.len() < SESSION_CAPACITY
    }

    /// True when the session is empty and has seen no membership change
    /// for longer than `timeout`
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.participants.is_empty() && self.last_activity.elapsed() > timeout
    }

    /// Participant user ids, sorted for stable output
    pub fn peer_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.participants.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn peer_ids_except(&self, user_id: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .participants
            .keys()
            .filter(|id| id.as_str() != user_id)
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Add a participant.
    ///
    /// Every other current participant is told about the newcomer via
    /// `newPeer`, and the joiner receives `sessionInfo` listing the peers
    /// already present. Fails with [`crate::Error::SessionFull`] at capacity.
    pub fn add_participant(&mut self, user_id: &str, handle: ConnectionHandle) -> crate::Result<()> {
        if self.participants.len() >= SESSION_CAPACITY {
            return Err(crate::Error::SessionFull(self.id.clone()));
        }

        let peers = self.peer_ids_except(user_id);
        self.broadcast(
            &ServerMessage::NewPeer {
                user_id: user_id.to_string(),
            },
            Some(user_id),
        );

        handle.send(&ServerMessage::SessionInfo {
            session_id: self.id.clone(),
            peers,
        });
        self.participants.insert(user_id.to_string(), handle);
        self.touch();
        Ok(())
    }

    /// Remove a participant if present; returns true when the session is
    /// now empty.
    ///
    /// Removing an absent id is a no-op: no broadcast, no activity stamp.
    pub fn remove_participant(&mut self, user_id: &str) -> bool {
        if self.participants.remove(user_id).is_some() {
            self.touch();
            self.broadcast(
                &ServerMessage::PeerLeft {
                    user_id: user_id.to_string(),
                },
                None,
            );
        }
        self.participants.is_empty()
    }

    /// Send a message to every participant except `exclude`.
    ///
    /// Closed connections are skipped after a state check; cleanup happens
    /// through disconnect handling, not here.
    pub fn broadcast(&self, message: &ServerMessage, exclude: Option<&str>) {
        for (user_id, handle) in &self.participants {
            if Some(user_id.as_str()) == exclude {
                continue;
            }
            if !handle.is_open() {
                tracing::debug!(session_id = %self.id, user_id = %user_id, "Skipped send to closed connection");
                continue;
            }
            handle.send(message);
        }
    }

    /// Send a message to a single participant; returns false when the
    /// target is absent or its connection is closed.
    pub fn send_to(&self, user_id: &str, message: &ServerMessage) -> bool {
        match self.participants.get(user_id) {
            Some(handle) if handle.is_open() => handle.send(message),
            _ => false,
        }
    }
}

/// Directory of live sessions, indexed by id and bucketed by room.
///
/// The two maps stay consistent: a session id is listed under its room
/// exactly while the session itself is present.
#[derive(Debug, Default)]
pub struct SessionDirectory {
    sessions: HashMap<String, Session>,
    rooms: HashMap<String, Vec<String>>,
}

impl SessionDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the oldest session in the room with spare capacity, creating a
    /// fresh one when every existing session is full.
    ///
    /// Per-room lists keep insertion order, so earlier sessions fill first.
    pub fn find_or_create(&mut self, room_id: &str) -> String {
        let ids = self.rooms.entry(room_id.to_string()).or_default();
        for id in ids.iter() {
            if let Some(session) = self.sessions.get(id) {
                if session.is_available() {
                    return id.clone();
                }
            }
        }

        let session = Session::new(room_id);
        let id = session.id().to_string();
        ids.push(id.clone());
        self.sessions.insert(id.clone(), session);
        tracing::info!(session_id = %id, room_id = %room_id, "Created session");
        id
    }

    /// Look up a session by id
    pub fn get(&self, session_id: &str) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    /// Look up a session by id for mutation
    pub fn get_mut(&mut self, session_id: &str) -> Option<&mut Session> {
        self.sessions.get_mut(session_id)
    }

    /// Drop a session and its room listing; the room entry itself is
    /// removed once its last session is gone.
    pub fn remove_session(&mut self, session_id: &str) {
        if let Some(session) = self.sessions.remove(session_id) {
            let room_id = session.room_id().to_string();
            if let Some(ids) = self.rooms.get_mut(&room_id) {
                ids.retain(|id| id != session_id);
                if ids.is_empty() {
                    self.rooms.remove(&room_id);
                }
            }
            tracing::info!(session_id = %session_id, room_id = %room_id, "Removed session");
        }
    }

    /// Evict every session that has been empty for longer than `timeout`;
    /// returns the evicted ids.
    pub fn sweep_expired(&mut self, timeout: Duration) -> Vec<String> {
        let expired: Vec<String> = self
            .sessions
            .values()
            .filter(|session| session.is_expired(timeout))
            .map(|session| session.id().to_string())
            .collect();

        for id in &expired {
            self.remove_session(id);
        }
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "Swept expired sessions");
        }
        expired
    }

    /// Number of live sessions
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of rooms with at least one session
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of sessions listed under a room
    pub fn sessions_in_room(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map(|ids| ids.len()).unwrap_or(0)
    }
}
