//! upkeepd — the upkeep monitoring daemon.
//!
//! Single binary wiring the state store, the monitoring engine, the
//! cluster coordinator, and the HTTP surface. Every flag has an
//! `UPKEEP_*` environment fallback so containers can be configured
//! without a command line.
//!
//! # Usage
//!
//! ```text
//! upkeepd --http-port 8080 --data-dir /var/lib/upkeep
//! upkeepd --cluster-mode follower --peer-url http://primary:8080 \
//!         --cluster-secret s3cret
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use upkeep_cluster::{ClusterConfig, ClusterMode, Coordinator};
use upkeep_engine::Engine;
use upkeep_state::{StateStore, Store};

#[derive(Parser)]
#[command(name = "upkeepd", about = "Uptime and certificate monitoring daemon")]
struct Cli {
    /// HTTP port for the heartbeat and health endpoints.
    #[arg(long, env = "UPKEEP_HTTP_PORT", default_value = "8080")]
    http_port: u16,

    /// Data directory for the embedded state store.
    #[arg(long, env = "UPKEEP_DATA_DIR", default_value = "/var/lib/upkeep")]
    data_dir: PathBuf,

    /// Cluster role: "leader" or "follower".
    #[arg(long, env = "UPKEEP_CLUSTER_MODE", default_value = "leader")]
    cluster_mode: String,

    /// Base URL of the leader replica (follower only), e.g. http://primary:8080.
    #[arg(long, env = "UPKEEP_PEER_URL", default_value = "")]
    peer_url: String,

    /// Shared secret protecting /api/health and attached to peer probes.
    #[arg(long, env = "UPKEEP_CLUSTER_SECRET")]
    cluster_secret: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,upkeepd=debug,upkeep=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let mode = match cli.cluster_mode.as_str() {
        "leader" => ClusterMode::Leader,
        "follower" => ClusterMode::Follower,
        other => anyhow::bail!("unknown cluster mode '{other}' (expected leader or follower)"),
    };
    if mode == ClusterMode::Follower && cli.peer_url.is_empty() {
        anyhow::bail!("--peer-url is required in follower mode");
    }

    info!("upkeepd starting");
    std::fs::create_dir_all(&cli.data_dir)?;

    // ── State store ──────────────────────────────────────────────
    let db_path = cli.data_dir.join("upkeep.redb");
    let store = StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");

    // ── Engine ───────────────────────────────────────────────────
    let engine = Arc::new(Engine::new(Arc::new(store) as Arc<dyn Store>));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Supervisor: discovers monitors and spawns probe tasks.
    let supervisor_handle = tokio::spawn(upkeep_engine::supervisor::run_supervisor(
        Arc::clone(&engine),
        shutdown_rx.clone(),
    ));

    // ── Cluster coordinator ──────────────────────────────────────
    let coordinator = Coordinator::new(
        Arc::clone(&engine),
        ClusterConfig {
            mode,
            peer_url: cli.peer_url.clone(),
            shared_key: cli.cluster_secret.clone(),
        },
    );
    let coordinator_handle = tokio::spawn(coordinator.run(shutdown_rx.clone()));

    // ── HTTP server ──────────────────────────────────────────────
    let router = upkeep_api::build_router(Arc::clone(&engine), cli.cluster_secret.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], cli.http_port));
    info!(%addr, "http server starting");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    let _ = supervisor_handle.await;
    let _ = coordinator_handle.await;

    info!("upkeepd stopped");
    Ok(())
}
