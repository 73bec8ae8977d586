//! Handlers for `/groups` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/groups` | Each group with its member ids and shared records |
//! | `POST`   | `/groups` | Body: `{"name":".."}`; returns 201 + the group |
//! | `POST`   | `/groups/:id/members` | Body: `{"email":".."}` |
//! | `DELETE` | `/groups/:id/members/:email` | 204; 404 if not a member |
//! | `POST`   | `/groups/:id/records` | Body: [`RecordBody`]; upserts and shares the record |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use hireme_core::{
  store::{DeadlineStore, Entity, StoredGroup},
  subscriber::{Group, GroupId, SubscriberId},
  transport::Transport,
};
use serde::Deserialize;

use crate::{ApiState, RecordBody, error::ApiError, persist};

fn group_not_found(gid: GroupId) -> ApiError {
  ApiError::NotFound(format!("group {gid} not found"))
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /groups`
pub async fn list<S, T>(State(state): State<ApiState<S, T>>) -> Json<Vec<StoredGroup>>
where
  S: DeadlineStore,
  T: Transport,
{
  let graph = state.registry.read().await;
  Json(
    graph
      .groups()
      .filter_map(|g| graph.stored_group(g.id))
      .collect(),
  )
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name: String,
}

/// `POST /groups`
pub async fn create<S, T>(
  State(state): State<ApiState<S, T>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DeadlineStore,
  T: Transport,
{
  let _writes = state.writes.lock().await;
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("group name is required".into()));
  }

  let group = Group::new(body.name);
  let stored = {
    let mut graph = state.registry.write().await;
    graph.insert_group(group.clone());
    graph.stored_group(group.id)
  };
  tracing::info!(group = %group.id, name = %group.name, "group created");

  persist(&*state.store, stored.map(Entity::Group)).await;
  Ok((StatusCode::CREATED, Json(group)))
}

// ─── Membership ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct JoinBody {
  pub email: String,
}

/// `POST /groups/:id/members` — returns the updated group.
pub async fn join<S, T>(
  State(state): State<ApiState<S, T>>,
  Path(gid): Path<GroupId>,
  Json(body): Json<JoinBody>,
) -> Result<Json<StoredGroup>, ApiError>
where
  S: DeadlineStore,
  T: Transport,
{
  let _writes = state.writes.lock().await;
  let id = SubscriberId::new(body.email);

  let stored = {
    let mut graph = state.registry.write().await;
    graph.join_group(&id, gid)?;
    graph.stored_group(gid).ok_or_else(|| group_not_found(gid))?
  };
  tracing::info!(subscriber = %id, group = %gid, "joined group");

  persist(&*state.store, Some(Entity::Group(stored.clone()))).await;
  Ok(Json(stored))
}

/// `DELETE /groups/:id/members/:email`
pub async fn leave<S, T>(
  State(state): State<ApiState<S, T>>,
  Path((gid, email)): Path<(GroupId, String)>,
) -> Result<StatusCode, ApiError>
where
  S: DeadlineStore,
  T: Transport,
{
  let _writes = state.writes.lock().await;
  let id = SubscriberId::new(email);

  let stored = {
    let mut graph = state.registry.write().await;
    if !graph.leave_group(&id, gid)? {
      return Err(ApiError::NotFound(format!("{id} is not a member of group {gid}")));
    }
    graph.stored_group(gid)
  };
  tracing::info!(subscriber = %id, group = %gid, "left group");

  persist(&*state.store, stored.map(Entity::Group)).await;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Sharing ──────────────────────────────────────────────────────────────────

/// `POST /groups/:id/records` — returns 201 + the shared record.
pub async fn share<S, T>(
  State(state): State<ApiState<S, T>>,
  Path(gid): Path<GroupId>,
  Json(body): Json<RecordBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DeadlineStore,
  T: Transport,
{
  let _writes = state.writes.lock().await;
  let record = body.into_record()?;

  let stored = {
    let mut graph = state.registry.write().await;
    if graph.group(gid).is_none() {
      return Err(group_not_found(gid));
    }
    graph.upsert_record(record.clone());
    graph.share_record(gid, record.key())?;
    graph.stored_group(gid)
  };
  tracing::info!(group = %gid, record = %record.key(), "record shared");

  persist(&*state.store, stored.map(Entity::Group)).await;
  Ok((StatusCode::CREATED, Json(record)))
}
