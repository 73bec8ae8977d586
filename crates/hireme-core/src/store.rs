//! The `DeadlineStore` trait and the shapes it loads and persists.
//!
//! The trait is implemented by storage backends (e.g. `hireme-store-sqlite`).
//! The monitor never talks to storage during a scan; stores are read at
//! startup and written after each mutation.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
  record::Record,
  subscriber::{Group, Subscriber, SubscriberId},
};

// ─── Stored shapes ───────────────────────────────────────────────────────────

/// A subscriber together with the records it owns directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSubscriber {
  pub subscriber: Subscriber,
  pub records:    Vec<Record>,
}

/// A group together with its member ids and the records shared in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredGroup {
  pub group:   Group,
  pub members: Vec<SubscriberId>,
  pub records: Vec<Record>,
}

/// Anything [`DeadlineStore::persist`] accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Entity {
  /// Upserts the subscriber and its records; replaces its owned edges.
  Subscriber(StoredSubscriber),
  /// Upserts the group and its records; replaces members and shared edges.
  Group(StoredGroup),
  /// Upserts record data only.
  Record(Record),
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a storage backend for subscribers, groups and records.
///
/// All methods return `Send` futures so the trait can be used from spawned
/// tokio tasks and axum handlers.
pub trait DeadlineStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Every subscriber with its owned records.
  fn load_subscribers(
    &self,
  ) -> impl Future<Output = Result<Vec<StoredSubscriber>, Self::Error>> + Send + '_;

  /// Every group with its members and shared records.
  fn load_groups(
    &self,
  ) -> impl Future<Output = Result<Vec<StoredGroup>, Self::Error>> + Send + '_;

  /// Upsert an entity. Edge sets carried by the entity replace the stored ones.
  fn persist<'a>(
    &'a self,
    entity: &'a Entity,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove a subscriber, its owned edges and its memberships. Records stay.
  fn delete_subscriber<'a>(
    &'a self,
    id: &'a SubscriberId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
