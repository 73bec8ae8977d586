//! [`Registry`] — the shared, explicitly constructed ownership graph.
//!
//! The scheduler reads from it; API handlers and the server write to it. Each
//! process (and each test) builds its own registry; nothing here is global.

use std::sync::Arc;

use hireme_core::{
  graph::{OwnershipGraph, ScanSnapshot},
  record::{Record, RecordKey},
  subscriber::{Subscriber, SubscriberId},
};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Cheap to clone — all clones share one graph.
#[derive(Debug, Clone, Default)]
pub struct Registry {
  graph: Arc<RwLock<OwnershipGraph>>,
}

impl Registry {
  pub fn new(graph: OwnershipGraph) -> Self {
    Self { graph: Arc::new(RwLock::new(graph)) }
  }

  /// Add a subscriber for the next scan. Returns `true` if it was new.
  pub async fn register_subscriber(&self, subscriber: Subscriber) -> bool {
    let id = subscriber.id.clone();
    let inserted = self.graph.write().await.register_subscriber(subscriber);
    if inserted {
      tracing::info!(subscriber = %id, "subscriber registered");
    } else {
      tracing::debug!(subscriber = %id, "subscriber already registered");
    }
    inserted
  }

  /// Remove a subscriber from the next scan. An in-flight scan keeps the
  /// snapshot it already took.
  pub async fn unregister_subscriber(&self, id: &SubscriberId) -> Option<Subscriber> {
    let removed = self.graph.write().await.unregister_subscriber(id);
    if removed.is_some() {
      tracing::info!(subscriber = %id, "subscriber unregistered");
    }
    removed
  }

  pub async fn read(&self) -> RwLockReadGuard<'_, OwnershipGraph> {
    self.graph.read().await
  }

  pub async fn write(&self) -> RwLockWriteGuard<'_, OwnershipGraph> {
    self.graph.write().await
  }

  pub async fn snapshot(&self) -> ScanSnapshot { self.graph.read().await.snapshot() }

  /// Current data for `key`, or `None` if the record has been removed.
  pub async fn resolve(&self, key: &RecordKey) -> Option<Record> {
    self.graph.read().await.record(key).cloned()
  }
}
