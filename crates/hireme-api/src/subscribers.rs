//! Handlers for `/subscribers` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/subscribers` | All registered subscribers |
//! | `POST`   | `/subscribers` | Body: `{"name":"..","email":".."}`; 201 if new, 200 if already registered |
//! | `DELETE` | `/subscribers/:email` | 204; 404 if unknown |
//! | `GET`    | `/subscribers/:email/records` | Reachable records, each listed once |
//! | `POST`   | `/subscribers/:email/records` | Body: [`RecordBody`]; upserts and owns the record |
//! | `DELETE` | `/subscribers/:email/records/:company/:position` | 204; 404 if not owned |

use std::collections::HashSet;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use hireme_core::{
  record::{Record, RecordKey},
  store::{DeadlineStore, Entity},
  subscriber::{Subscriber, SubscriberId},
  transport::Transport,
};
use serde::Deserialize;

use crate::{ApiState, RecordBody, error::ApiError, persist};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /subscribers`
pub async fn list<S, T>(State(state): State<ApiState<S, T>>) -> Json<Vec<Subscriber>>
where
  S: DeadlineStore,
  T: Transport,
{
  Json(state.registry.read().await.subscribers().cloned().collect())
}

// ─── Register ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub name:  String,
  pub email: String,
}

/// `POST /subscribers`
pub async fn register<S, T>(
  State(state): State<ApiState<S, T>>,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DeadlineStore,
  T: Transport,
{
  let _writes = state.writes.lock().await;
  if body.email.trim().is_empty() {
    return Err(ApiError::BadRequest("email is required".into()));
  }
  let subscriber = Subscriber::new(body.name, body.email.trim());
  let id = subscriber.id.clone();

  let inserted = state.registry.register_subscriber(subscriber.clone()).await;
  let stored = state.registry.read().await.stored_subscriber(&id);
  persist(&*state.store, stored.map(Entity::Subscriber)).await;

  let status = if inserted { StatusCode::CREATED } else { StatusCode::OK };
  Ok((status, Json(subscriber)))
}

// ─── Unregister ───────────────────────────────────────────────────────────────

/// `DELETE /subscribers/:email`
pub async fn unregister<S, T>(
  State(state): State<ApiState<S, T>>,
  Path(email): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: DeadlineStore,
  T: Transport,
{
  let _writes = state.writes.lock().await;
  let id = SubscriberId::new(email);
  state
    .registry
    .unregister_subscriber(&id)
    .await
    .ok_or_else(|| ApiError::NotFound(format!("subscriber {id} not found")))?;

  if let Err(e) = state.store.delete_subscriber(&id).await {
    tracing::warn!(subscriber = %id, error = %e, "failed to delete subscriber from store");
  }
  Ok(StatusCode::NO_CONTENT)
}

// ─── Reachable records ────────────────────────────────────────────────────────

/// `GET /subscribers/:email/records` — owned records first, then group-shared
/// ones; a record reachable through several paths appears once.
pub async fn records<S, T>(
  State(state): State<ApiState<S, T>>,
  Path(email): Path<String>,
) -> Result<Json<Vec<Record>>, ApiError>
where
  S: DeadlineStore,
  T: Transport,
{
  let id = SubscriberId::new(email);
  let graph = state.registry.read().await;
  if graph.subscriber(&id).is_none() {
    return Err(ApiError::NotFound(format!("subscriber {id} not found")));
  }

  let mut seen = HashSet::new();
  let records = graph
    .reachable_records(&id)
    .into_iter()
    .filter(|key| seen.insert(key.clone()))
    .filter_map(|key| graph.record(&key).cloned())
    .collect();
  Ok(Json(records))
}

// ─── Own ──────────────────────────────────────────────────────────────────────

/// `POST /subscribers/:email/records` — returns 201 + the stored record.
pub async fn own<S, T>(
  State(state): State<ApiState<S, T>>,
  Path(email): Path<String>,
  Json(body): Json<RecordBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DeadlineStore,
  T: Transport,
{
  let _writes = state.writes.lock().await;
  let id = SubscriberId::new(email);
  let record = body.into_record()?;

  let stored = {
    let mut graph = state.registry.write().await;
    if graph.subscriber(&id).is_none() {
      return Err(ApiError::NotFound(format!("subscriber {id} not found")));
    }
    graph.upsert_record(record.clone());
    graph.own_record(&id, record.key())?;
    graph.stored_subscriber(&id)
  };
  tracing::info!(subscriber = %id, record = %record.key(), "record owned");

  persist(&*state.store, stored.map(Entity::Subscriber)).await;
  Ok((StatusCode::CREATED, Json(record)))
}

// ─── Disown ───────────────────────────────────────────────────────────────────

/// `DELETE /subscribers/:email/records/:company/:position`
pub async fn disown<S, T>(
  State(state): State<ApiState<S, T>>,
  Path((email, company, position)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError>
where
  S: DeadlineStore,
  T: Transport,
{
  let _writes = state.writes.lock().await;
  let id = SubscriberId::new(email);
  let key = RecordKey::new(company, position);

  let stored = {
    let mut graph = state.registry.write().await;
    if !graph.disown_record(&id, &key)? {
      return Err(ApiError::NotFound(format!("{id} does not own {key}")));
    }
    graph.stored_subscriber(&id)
  };

  persist(&*state.store, stored.map(Entity::Subscriber)).await;
  Ok(StatusCode::NO_CONTENT)
}
