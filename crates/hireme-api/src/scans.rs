//! `POST /scans` — run one scan now, outside the schedule.
//!
//! Returns the [`ScanReport`](hireme_monitor::ScanReport), or 409 when a scan
//! is already in flight.

use axum::{Json, extract::State};
use hireme_core::{store::DeadlineStore, transport::Transport};
use hireme_monitor::ScanReport;

use crate::{ApiState, error::ApiError};

pub async fn trigger<S, T>(
  State(state): State<ApiState<S, T>>,
) -> Result<Json<ScanReport>, ApiError>
where
  S: DeadlineStore,
  T: Transport + 'static,
{
  state
    .scheduler
    .scan_now()
    .await
    .map(Json)
    .ok_or_else(|| ApiError::Conflict("a scan is already running".into()))
}
