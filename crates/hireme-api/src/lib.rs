//! JSON REST API for the HireME deadline monitor.
//!
//! Exposes an axum [`Router`] over the shared [`Registry`], a
//! [`DeadlineStore`] and the [`ScanScheduler`]. Every mutation is applied to
//! the registry first and persisted afterwards; a persistence failure is
//! logged and the request still succeeds, since the monitor runs on the
//! in-memory graph. Mutations are serialised end to end, so the store never
//! sees an older edge set after a newer one.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", hireme_api::api_router(state))
//! ```

pub mod error;
pub mod groups;
pub mod scans;
pub mod subscribers;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use chrono::NaiveDate;
use hireme_core::{
  record::Record,
  store::{DeadlineStore, Entity},
  transport::Transport,
};
use hireme_monitor::{Registry, ScanScheduler};
use serde::Deserialize;
use tokio::sync::Mutex as AsyncMutex;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── State ────────────────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct ApiState<S, T> {
  pub registry:  Registry,
  pub store:     Arc<S>,
  pub scheduler: Arc<ScanScheduler<T>>,
  /// Held by every mutating handler from the registry change until the
  /// store write completes, so persisted edge sets land in mutation order.
  writes:        Arc<AsyncMutex<()>>,
}

impl<S, T> ApiState<S, T> {
  pub fn new(registry: Registry, store: Arc<S>, scheduler: Arc<ScanScheduler<T>>) -> Self {
    Self { registry, store, scheduler, writes: Arc::default() }
  }
}

impl<S, T> Clone for ApiState<S, T> {
  fn clone(&self) -> Self {
    Self {
      registry:  self.registry.clone(),
      store:     self.store.clone(),
      scheduler: self.scheduler.clone(),
      writes:    self.writes.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn api_router<S, T>(state: ApiState<S, T>) -> Router<()>
where
  S: DeadlineStore + 'static,
  T: Transport + 'static,
{
  Router::new()
    // Subscribers
    .route(
      "/subscribers",
      get(subscribers::list::<S, T>).post(subscribers::register::<S, T>),
    )
    .route("/subscribers/{email}", delete(subscribers::unregister::<S, T>))
    .route(
      "/subscribers/{email}/records",
      get(subscribers::records::<S, T>).post(subscribers::own::<S, T>),
    )
    .route(
      "/subscribers/{email}/records/{company}/{position}",
      delete(subscribers::disown::<S, T>),
    )
    // Groups
    .route("/groups", get(groups::list::<S, T>).post(groups::create::<S, T>))
    .route("/groups/{id}/members", post(groups::join::<S, T>))
    .route("/groups/{id}/members/{email}", delete(groups::leave::<S, T>))
    .route("/groups/{id}/records", post(groups::share::<S, T>))
    // Scans
    .route("/scans", post(scans::trigger::<S, T>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Shared helpers ───────────────────────────────────────────────────────────

/// JSON body for creating or updating a record.
#[derive(Debug, Deserialize)]
pub struct RecordBody {
  pub company:     String,
  pub position:    String,
  #[serde(default)]
  pub description: String,
  pub deadline:    NaiveDate,
  #[serde(default)]
  pub url:         String,
  pub annotation:  Option<String>,
}

impl RecordBody {
  fn into_record(self) -> Result<Record, ApiError> {
    if self.company.trim().is_empty() || self.position.trim().is_empty() {
      return Err(ApiError::BadRequest("company and position are required".into()));
    }
    let mut record =
      Record::new(self.company, self.position, self.description, self.deadline, self.url);
    record.annotation = self.annotation;
    Ok(record)
  }
}

/// Write `entity` to the store. Failures are logged, never returned.
async fn persist<S: DeadlineStore>(store: &S, entity: Option<Entity>) {
  let Some(entity) = entity else { return };
  if let Err(e) = store.persist(&entity).await {
    tracing::warn!(error = %e, "failed to persist change; keeping in-memory state");
  }
}
