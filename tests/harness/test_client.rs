//! WebSocket test client for the relay.

use std::time::Duration;

use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use signal_relay::ServerMessage;

use super::{HarnessError, HarnessResult};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Poll step for the wait helpers
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A connected relay client with a background reader.
///
/// Received envelopes accumulate in arrival order; the `wait_for_*` helpers
/// poll that buffer against a deadline. The background reader also keeps the
/// connection heartbeat-alive, since pings are answered while the stream is
/// being polled.
pub struct TestClient {
    name: String,
    writer: WsSink,
    received: mpsc::UnboundedReceiver<ServerMessage>,
    buffer: Vec<ServerMessage>,
    reader_task: JoinHandle<()>,
}

impl TestClient {
    /// Connect to the relay; `name` doubles as the user id for `join`
    pub async fn connect(url: &str, name: &str) -> HarnessResult<Self> {
        let (ws, _response) = connect_async(url).await.map_err(|e| {
            HarnessError::ConnectionError(format!("Failed to connect {}: {}", name, e))
        })?;
        let (writer, mut reader) = ws.split();
        let (tx, rx) = mpsc::unbounded_channel();

        let reader_task = tokio::spawn(async move {
            while let Some(frame) = reader.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if let Ok(msg) = ServerMessage::from_json(&text) {
                            if tx.send(msg).is_err() {
                                break;
                            }
                        }
                    }
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        });

        Ok(Self {
            name: name.to_string(),
            writer,
            received: rx,
            buffer: Vec::new(),
            reader_task,
        })
    }

    /// User id this client joins with
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Send an arbitrary JSON value as one text frame
    pub async fn send_json(&mut self, value: serde_json::Value) -> HarnessResult<()> {
        let name = self.name.clone();
        self.writer
            .send(Message::Text(value.to_string()))
            .await
            .map_err(|e| HarnessError::ClientError(format!("{} failed to send: {}", name, e)))
    }

    /// Send a raw text frame, valid JSON or not
    pub async fn send_raw(&mut self, text: &str) -> HarnessResult<()> {
        let name = self.name.clone();
        self.writer
            .send(Message::Text(text.to_string()))
            .await
            .map_err(|e| HarnessError::ClientError(format!("{} failed to send: {}", name, e)))
    }

    /// Join a room under this client's name
    pub async fn join(&mut self, room: &str) -> HarnessResult<()> {
        let msg = json!({"type": "join", "room": room, "userId": self.name});
        self.send_json(msg).await
    }

    /// Send an offer to `target`
    pub async fn send_offer(&mut self, target: &str, data: serde_json::Value) -> HarnessResult<()> {
        let msg = json!({"type": "offer", "targetUserId": target, "data": data, "userId": self.name});
        self.send_json(msg).await
    }

    /// Send an answer to `target`
    pub async fn send_answer(&mut self, target: &str, data: serde_json::Value) -> HarnessResult<()> {
        let msg = json!({"type": "answer", "targetUserId": target, "data": data, "userId": self.name});
        self.send_json(msg).await
    }

    /// Send an ICE candidate to `target`
    pub async fn send_candidate(
        &mut self,
        target: &str,
        data: serde_json::Value,
    ) -> HarnessResult<()> {
        let msg =
            json!({"type": "candidate", "targetUserId": target, "data": data, "userId": self.name});
        self.send_json(msg).await
    }

    /// Fan a recording request out to the session
    pub async fn send_recording_request(&mut self, data: serde_json::Value) -> HarnessResult<()> {
        let msg = json!({"type": "recordingRequest", "data": data, "userId": self.name});
        self.send_json(msg).await
    }

    /// Send a recording response to `target`
    pub async fn send_recording_response(
        &mut self,
        target: &str,
        data: serde_json::Value,
    ) -> HarnessResult<()> {
        let msg = json!({
            "type": "recordingResponse",
            "targetUserId": target,
            "data": data,
            "userId": self.name
        });
        self.send_json(msg).await
    }

    /// Leave the current session
    pub async fn leave(&mut self) -> HarnessResult<()> {
        let msg = json!({"type": "leave", "userId": self.name});
        self.send_json(msg).await
    }

    fn drain(&mut self) {
        while let Ok(msg) = self.received.try_recv() {
            self.buffer.push(msg);
        }
    }

    /// Wait until a received envelope matches `predicate` and consume it
    pub async fn wait_for<F>(
        &mut self,
        what: &str,
        timeout: Duration,
        mut predicate: F,
    ) -> HarnessResult<ServerMessage>
    where
        F: FnMut(&ServerMessage) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            self.drain();
            if let Some(pos) = self.buffer.iter().position(|m| predicate(m)) {
                return Ok(self.buffer.remove(pos));
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(HarnessError::Timeout(format!(
                    "{} waiting for {}",
                    self.name, what
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Wait for the `sessionInfo` reply to a join
    pub async fn wait_for_session_info(
        &mut self,
        timeout: Duration,
    ) -> HarnessResult<(String, Vec<String>)> {
        let msg = self
            .wait_for("sessionInfo", timeout, |m| {
                matches!(m, ServerMessage::SessionInfo { .. })
            })
            .await?;
        match msg {
            ServerMessage::SessionInfo { session_id, peers } => Ok((session_id, peers)),
            _ => unreachable!(),
        }
    }

    /// Wait for a `newPeer` notification; returns the peer's user id
    pub async fn wait_for_new_peer(&mut self, timeout: Duration) -> HarnessResult<String> {
        let msg = self
            .wait_for("newPeer", timeout, |m| {
                matches!(m, ServerMessage::NewPeer { .. })
            })
            .await?;
        match msg {
            ServerMessage::NewPeer { user_id } => Ok(user_id),
            _ => unreachable!(),
        }
    }

    /// Wait for a `peerLeft` notification; returns the peer's user id
    pub async fn wait_for_peer_left(&mut self, timeout: Duration) -> HarnessResult<String> {
        let msg = self
            .wait_for("peerLeft", timeout, |m| {
                matches!(m, ServerMessage::PeerLeft { .. })
            })
            .await?;
        match msg {
            ServerMessage::PeerLeft { user_id } => Ok(user_id),
            _ => unreachable!(),
        }
    }

    /// Wait for an `error` envelope; returns its message
    pub async fn wait_for_error(&mut self, timeout: Duration) -> HarnessResult<String> {
        let msg = self
            .wait_for("error", timeout, |m| {
                matches!(m, ServerMessage::Error { .. })
            })
            .await?;
        match msg {
            ServerMessage::Error { message } => Ok(message),
            _ => unreachable!(),
        }
    }

    /// True when no further envelope arrives within `window`
    pub async fn silent_for(&mut self, window: Duration) -> bool {
        self.drain();
        let before = self.buffer.len();
        tokio::time::sleep(window).await;
        self.drain();
        self.buffer.len() == before
    }

    /// Close gracefully with a close frame
    pub async fn close(mut self) -> HarnessResult<()> {
        let _ = self.writer.send(Message::Close(None)).await;
        let _ = self.writer.close().await;
        self.reader_task.abort();
        Ok(())
    }

    /// Drop the connection abruptly, without a close frame
    pub async fn abort(self) {
        self.reader_task.abort();
        drop(self.writer);
    }
}
