//! hireme server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), restores the
//! ownership graph from SQLite, starts the scan scheduler and serves the JSON
//! API under `/api` until interrupted.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use axum::Router;
use clap::Parser;
use hireme_api::{ApiState, api_router};
use hireme_monitor::{Registry, ScanScheduler, SystemClock};
use hireme_notify::Notifier;
use hireme_server::{expand_tilde, load_config, load_graph, open_store, seed_demo};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "HireME internship deadline monitor")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Register a few demo subscribers when the store is empty.
  #[arg(long)]
  seed_demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let server_cfg = load_config(&cli.config)?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = Arc::new(open_store(&store_path).await?);

  let registry = Registry::new(load_graph(&*store).await);
  if cli.seed_demo {
    let added = seed_demo(&registry, &*store).await;
    tracing::info!(added, "seeded demo subscribers");
  }

  let notifier = Notifier::from_config(&server_cfg.notifier)
    .context("failed to build notifier")?;
  let scheduler = Arc::new(ScanScheduler::new(
    registry.clone(),
    Arc::new(notifier),
    &server_cfg.monitor,
    Arc::new(SystemClock),
  ));
  scheduler.start();

  let app = Router::new().nest(
    "/api",
    api_router(ApiState::new(registry, store, scheduler.clone())),
  );
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  let served = axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error");

  scheduler.stop().await;
  served
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutdown requested");
}
