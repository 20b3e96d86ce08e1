//! HTTP/WebSocket server for the relay.
//!
//! One listener carries three surfaces: the `/ws` signaling endpoint, a
//! `/health` status endpoint, and the static demo client served from the
//! configured directory. Each accepted socket runs its own task that feeds
//! inbound frames to the [`SignalingService`], drains the connection's
//! outbound queue, and drives the heartbeat.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::RelayConfig;
use crate::connection::ConnectionHandle;
use crate::service::SignalingService;

/// Shared handler state
#[derive(Clone)]
struct AppState {
    service: Arc<SignalingService>,
    config: Arc<RelayConfig>,
    shutdown_tx: broadcast::Sender<()>,
}

/// The relay server, ready to bind its listener
pub struct RelayServer {
    config: RelayConfig,
    service: Arc<SignalingService>,
    shutdown_tx: broadcast::Sender<()>,
}

impl RelayServer {
    /// Create a server from a validated configuration
    pub fn new(config: RelayConfig) -> crate::Result<Self> {
        config.validate()?;
        let service = Arc::new(SignalingService::new(&config));
        let (shutdown_tx, _) = broadcast::channel(8);
        Ok(Self {
            config,
            service,
            shutdown_tx,
        })
    }

    /// Shared signaling service
    pub fn service(&self) -> Arc<SignalingService> {
        self.service.clone()
    }

    fn build_router(&self) -> Router {
        let state = AppState {
            service: self.service.clone(),
            config: Arc::new(self.config.clone()),
            shutdown_tx: self.shutdown_tx.clone(),
        };

        Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .fallback_service(ServeDir::new(&self.config.static_dir))
            .with_state(state)
            .layer(
                tower::ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive()),
            )
    }

    /// Bind the listener and start serving.
    ///
    /// Returns a handle carrying the bound address and shutdown control;
    /// binding port 0 picks an ephemeral port.
    pub async fn start(self) -> crate::Result<RelayServerHandle> {
        let router = self.build_router();
        let RelayServer {
            config,
            service,
            shutdown_tx,
        } = self;

        let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
            .parse()
            .map_err(|e| crate::Error::InvalidConfig(format!("Invalid bind address: {}", e)))?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        let sweeper = tokio::spawn(
            service
                .clone()
                .run_sweep_loop(config.sweep_interval(), shutdown_tx.subscribe()),
        );

        let mut serve_shutdown = shutdown_tx.subscribe();
        let resignal = shutdown_tx.clone();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
                let _ = serve_shutdown.recv().await;
            });
            if let Err(e) = serve.await {
                tracing::error!(error = %e, "Server error");
            }
            // The sweeper listens on the same channel; fire it again in
            // case serving ended on its own.
            let _ = resignal.send(());
            let _ = sweeper.await;
            tracing::info!("Server stopped");
        });

        tracing::info!(addr = %local_addr, "Signaling relay listening");
        Ok(RelayServerHandle {
            addr: local_addr,
            service,
            shutdown_tx,
            task,
        })
    }
}

/// Handle to a running relay server
pub struct RelayServerHandle {
    addr: SocketAddr,
    service: Arc<SignalingService>,
    shutdown_tx: broadcast::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl RelayServerHandle {
    /// Address the listener is bound to
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// WebSocket URL of the signaling endpoint
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Shared signaling service
    pub fn service(&self) -> Arc<SignalingService> {
        self.service.clone()
    }

    /// Stop the server and wait for the serve task to finish
    pub async fn shutdown(self) -> crate::Result<()> {
        let _ = self.shutdown_tx.send(());
        self.task
            .await
            .map_err(|e| crate::Error::Other(anyhow::anyhow!("Server task failed: {}", e)))?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    sessions: usize,
    connections: usize,
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok",
        sessions: state.service.session_count().await,
        connections: state.service.connection_count().await,
    };
    (StatusCode::OK, Json(response))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Per-connection loop: inbound frames, queued outbound frames, heartbeat.
///
/// The liveness flag starts true, is cleared at every ping tick, and is set
/// again only by a pong. A tick that finds it still cleared terminates the
/// connection; disconnect cleanup then runs exactly as for a normal close.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let handle = ConnectionHandle::new(outbound_tx);
    let connection_id = handle.id();
    state.service.register(handle).await;
    tracing::debug!(connection_id, "WebSocket connected");

    let (mut sink, mut stream) = socket.split();
    let mut shutdown_rx = state.shutdown_tx.subscribe();
    let mut ticker = tokio::time::interval(state.config.heartbeat_interval());
    let mut alive = true;

    loop {
        tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    state.service.handle_message(connection_id, &text).await;
                }
                Some(Ok(Message::Pong(_))) => {
                    alive = true;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(connection_id, error = %e, "WebSocket read failed");
                    break;
                }
            },
            outbound = outbound_rx.recv() => match outbound {
                Some(frame) => {
                    if sink.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            _ = ticker.tick() => {
                if !alive {
                    tracing::info!(connection_id, "Heartbeat missed, terminating connection");
                    break;
                }
                alive = false;
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
            _ = shutdown_rx.recv() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        }
    }

    state.service.handle_disconnect(connection_id).await;
    tracing::debug!(connection_id, "WebSocket closed");
}
