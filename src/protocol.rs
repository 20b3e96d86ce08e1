//! Wire protocol for the signaling relay.
//!
//! All envelopes are flat JSON objects tagged by a `type` field. Inbound
//! envelopes are [`ClientMessage`]; outbound ones are [`ServerMessage`].
//! Negotiation payloads (`data`) are opaque to the relay and forwarded
//! verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages received from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Join a room; the relay places the connection into a session
    #[serde(rename_all = "camelCase")]
    Join {
        /// Room to join
        room: Option<String>,
        /// Caller-chosen user identifier
        user_id: String,
    },

    /// SDP offer for one peer in the sender's session
    #[serde(rename_all = "camelCase")]
    Offer {
        /// User id of the intended recipient
        target_user_id: String,
        /// Opaque negotiation payload
        #[serde(default)]
        data: Value,
        /// Sender's user id as claimed on the wire (ignored; the bound
        /// identity is authoritative)
        #[serde(default)]
        user_id: Option<String>,
    },

    /// SDP answer for one peer in the sender's session
    #[serde(rename_all = "camelCase")]
    Answer {
        /// User id of the intended recipient
        target_user_id: String,
        /// Opaque negotiation payload
        #[serde(default)]
        data: Value,
        /// Sender's claimed user id (ignored)
        #[serde(default)]
        user_id: Option<String>,
    },

    /// ICE candidate for one peer in the sender's session
    #[serde(rename_all = "camelCase")]
    Candidate {
        /// User id of the intended recipient
        target_user_id: String,
        /// Opaque candidate payload
        #[serde(default)]
        data: Value,
        /// Sender's claimed user id (ignored)
        #[serde(default)]
        user_id: Option<String>,
    },

    /// Leave the current session
    #[serde(rename_all = "camelCase")]
    Leave {
        /// Sender's claimed user id (ignored)
        #[serde(default)]
        user_id: Option<String>,
    },

    /// Recording control request, fanned out to the other participants
    #[serde(rename_all = "camelCase")]
    RecordingRequest {
        /// Opaque control payload
        #[serde(default)]
        data: Value,
        /// Sender's claimed user id (ignored)
        #[serde(default)]
        user_id: Option<String>,
    },

    /// Recording control response, delivered to one participant
    #[serde(rename_all = "camelCase")]
    RecordingResponse {
        /// User id of the intended recipient
        target_user_id: String,
        /// Opaque control payload
        #[serde(default)]
        data: Value,
        /// Sender's claimed user id (ignored)
        #[serde(default)]
        user_id: Option<String>,
    },

    /// Any unrecognized message type; dropped without a reply
    #[serde(other)]
    Unknown,
}

/// Messages sent to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Reply to a successful join
    #[serde(rename_all = "camelCase")]
    SessionInfo {
        /// Id of the session the connection was placed into
        session_id: String,
        /// User ids of the participants already present
        peers: Vec<String>,
    },

    /// A new participant joined the recipient's session
    #[serde(rename_all = "camelCase")]
    NewPeer {
        /// User id of the participant that joined
        user_id: String,
    },

    /// A participant left the recipient's session
    #[serde(rename_all = "camelCase")]
    PeerLeft {
        /// User id of the participant that left
        user_id: String,
    },

    /// Forwarded SDP offer
    #[serde(rename_all = "camelCase")]
    Offer {
        /// Opaque negotiation payload, forwarded verbatim
        data: Value,
        /// Bound user id of the sender
        from: String,
        /// User id of the recipient
        target_user_id: String,
    },

    /// Forwarded SDP answer
    #[serde(rename_all = "camelCase")]
    Answer {
        /// Opaque negotiation payload, forwarded verbatim
        data: Value,
        /// Bound user id of the sender
        from: String,
        /// User id of the recipient
        target_user_id: String,
    },

    /// Forwarded ICE candidate
    #[serde(rename_all = "camelCase")]
    Candidate {
        /// Opaque candidate payload, forwarded verbatim
        data: Value,
        /// Bound user id of the sender
        from: String,
        /// User id of the recipient
        target_user_id: String,
    },

    /// Forwarded recording control request
    #[serde(rename_all = "camelCase")]
    RecordingRequest {
        /// Opaque control payload
        data: Value,
        /// Bound user id of the sender
        from: String,
    },

    /// Forwarded recording control response
    #[serde(rename_all = "camelCase")]
    RecordingResponse {
        /// Opaque control payload
        data: Value,
        /// Bound user id of the sender
        from: String,
    },

    /// Handler failure reported to the offending connection
    #[serde(rename_all = "camelCase")]
    Error {
        /// Human-readable description of the failure
        message: String,
    },
}

impl ClientMessage {
    /// Serialize to a JSON string
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string(self)
            .map_err(|e| crate::Error::SerializationError(format!("Failed to serialize message: {}", e)))
    }

    /// Parse from a JSON string
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| crate::Error::SerializationError(format!("Failed to parse message: {}", e)))
    }
}

impl ServerMessage {
    /// Serialize to a JSON string
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string(self)
            .map_err(|e| crate::Error::SerializationError(format!("Failed to serialize message: {}", e)))
    }

    /// Parse from a JSON string
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| crate::Error::SerializationError(format!("Failed to parse message: {}", e)))
    }
}
