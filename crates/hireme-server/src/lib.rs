//! Startup wiring for the HireME server binary.
//!
//! Everything here tolerates a broken environment: an unreadable database
//! falls back to an in-memory store, and a store that cannot be loaded
//! yields an empty graph. The scheduler always gets to run.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use hireme_core::{
  graph::OwnershipGraph,
  store::{DeadlineStore, Entity},
  subscriber::Subscriber,
};
use hireme_monitor::{MonitorConfig, Registry};
use hireme_notify::NotifierConfig;
use hireme_store_sqlite::SqliteStore;
use serde::Deserialize;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `HIREME_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  pub monitor:    MonitorConfig,
  pub notifier:   NotifierConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_string(),
      port:       8080,
      store_path: PathBuf::from("hireme.db"),
      monitor:    MonitorConfig::default(),
      notifier:   NotifierConfig::default(),
    }
  }
}

/// Layer the optional TOML file at `path` under `HIREME_*` environment
/// variables. Nested keys use `__`, e.g. `HIREME_MONITOR__LEAD_TIME_DAYS=5`.
pub fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("HIREME")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read config")?;

  settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Storage ──────────────────────────────────────────────────────────────────

/// Open the store at `path`, or an in-memory store if that fails.
pub async fn open_store(path: &Path) -> anyhow::Result<SqliteStore> {
  match SqliteStore::open(path).await {
    Ok(store) => {
      tracing::info!(path = %path.display(), "opened store");
      Ok(store)
    }
    Err(e) => {
      tracing::warn!(
        path = %path.display(),
        error = %e,
        "failed to open store; falling back to in-memory storage"
      );
      SqliteStore::open_in_memory()
        .await
        .context("failed to open in-memory store")
    }
  }
}

/// Rebuild the ownership graph from `store`, or start empty if it cannot be
/// read.
pub async fn load_graph<S: DeadlineStore>(store: &S) -> OwnershipGraph {
  let loaded = async {
    let subscribers = store.load_subscribers().await?;
    let groups = store.load_groups().await?;
    Ok::<_, S::Error>((subscribers, groups))
  }
  .await;

  match loaded {
    Ok((subscribers, groups)) => {
      let graph = OwnershipGraph::from_stored(subscribers, groups);
      tracing::info!(subscribers = graph.subscriber_count(), "loaded subscribers");
      graph
    }
    Err(e) => {
      tracing::warn!(error = %e, "failed to load stored data; starting with an empty graph");
      OwnershipGraph::new()
    }
  }
}

// ─── Demo data ────────────────────────────────────────────────────────────────

/// Subscribers registered by `--seed-demo`.
pub fn demo_subscribers() -> Vec<Subscriber> {
  vec![
    Subscriber::new("John Doe", "john@example.com"),
    Subscriber::new("Jane Smith", "jane@example.com"),
    Subscriber::new("Bob Johnson", "bob@example.com"),
  ]
}

/// Register the demo subscribers if the registry is empty. Returns how many
/// were added.
pub async fn seed_demo<S: DeadlineStore>(registry: &Registry, store: &S) -> usize {
  if registry.read().await.subscriber_count() > 0 {
    tracing::debug!("registry not empty; skipping demo seed");
    return 0;
  }

  let mut added = 0;
  for subscriber in demo_subscribers() {
    let id = subscriber.id.clone();
    if !registry.register_subscriber(subscriber).await {
      continue;
    }
    added += 1;

    let stored = registry.read().await.stored_subscriber(&id);
    if let Some(stored) = stored
      && let Err(e) = store.persist(&Entity::Subscriber(stored)).await
    {
      tracing::warn!(subscriber = %id, error = %e, "failed to persist demo subscriber");
    }
  }
  added
}
