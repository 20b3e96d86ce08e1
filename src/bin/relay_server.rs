//! Standalone signaling relay server.
//!
//! Serves the WebSocket signaling endpoint, a health endpoint, and the
//! static demo client on one port.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use signal_relay::{RelayConfig, RelayServer};

#[derive(Parser, Debug)]
#[command(name = "relay_server", version, about = "Room-scoped WebRTC signaling relay")]
struct Args {
    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0", env = "SIGNAL_RELAY_BIND")]
    bind: String,

    /// Port for the combined HTTP/WebSocket listener
    #[arg(short, long, default_value_t = 8080, env = "SIGNAL_RELAY_PORT")]
    port: u16,

    /// Directory of static content served next to the signaling endpoint
    #[arg(long, default_value = "public", env = "SIGNAL_RELAY_STATIC_DIR")]
    static_dir: PathBuf,

    /// Heartbeat ping interval in milliseconds
    #[arg(long, default_value_t = 30_000, env = "SIGNAL_RELAY_HEARTBEAT_MS")]
    heartbeat_interval_ms: u64,

    /// Expiry sweep interval in milliseconds
    #[arg(long, default_value_t = 300_000, env = "SIGNAL_RELAY_SWEEP_MS")]
    sweep_interval_ms: u64,

    /// Idle timeout for empty sessions in milliseconds
    #[arg(long, default_value_t = 3_600_000, env = "SIGNAL_RELAY_SESSION_TIMEOUT_MS")]
    session_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "SIGNAL_RELAY_LOG")]
    log_level: String,
}

fn init_tracing(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let config = RelayConfig::new()
        .with_bind_address(args.bind)
        .with_port(args.port)
        .with_static_dir(args.static_dir)
        .with_heartbeat_interval_ms(args.heartbeat_interval_ms)
        .with_sweep_interval_ms(args.sweep_interval_ms)
        .with_session_timeout_ms(args.session_timeout_ms);
    config.validate()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = shutdown.clone();
    ctrlc::set_handler(move || {
        tracing::info!("Shutdown requested");
        shutdown_flag.store(true, Ordering::SeqCst);
        // Force exit if graceful shutdown hangs.
        std::thread::spawn(|| {
            std::thread::sleep(Duration::from_secs(10));
            tracing::warn!("Shutdown timed out, exiting");
            std::process::exit(1);
        });
    })?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .thread_name("signal-relay")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config, shutdown))
}

async fn async_main(
    config: RelayConfig,
    shutdown: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(version = signal_relay::version(), "Starting signaling relay");

    let handle = RelayServer::new(config)?.start().await?;
    tracing::info!(addr = %handle.addr(), "Relay ready");

    while !shutdown.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    tracing::info!("Stopping server");
    handle.shutdown().await?;
    Ok(())
}
