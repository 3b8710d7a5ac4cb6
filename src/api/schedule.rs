//! Schedule admin endpoints.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::schedule::{
    prepare_schedule, ScheduleFilter, ScheduleRequest, ScheduledNotification,
};
use crate::error::{AppError, Result};
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RequeueRequest {
    /// New due time; keeps the current one when absent
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleListResponse {
    pub schedules: Vec<ScheduledNotification>,
    pub total: usize,
}

/// POST /api/v1/schedules
#[tracing::instrument(
    name = "http.create_schedule",
    skip(state, request),
    fields(template_type = %request.template_type, due_at = %request.due_at)
)]
pub async fn create_schedule(
    State(state): State<AppState>,
    Json(request): Json<ScheduleRequest>,
) -> Result<(StatusCode, Json<ScheduledNotification>)> {
    let item = prepare_schedule(request, state.templates.as_ref()).await?;
    let created = state.schedules.schedule(item).await?;

    tracing::info!(schedule_id = %created.id, "Scheduled notification created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/schedules?status=&template_type=&limit=
#[tracing::instrument(name = "http.list_schedules", skip(state))]
pub async fn list_schedules(
    State(state): State<AppState>,
    Query(filter): Query<ScheduleFilter>,
) -> Result<Json<ScheduleListResponse>> {
    let schedules = state.schedules.list(&filter).await?;
    let total = schedules.len();
    Ok(Json(ScheduleListResponse { schedules, total }))
}

/// GET /api/v1/schedules/{id}
#[tracing::instrument(name = "http.get_schedule", skip(state))]
pub async fn get_schedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScheduledNotification>> {
    state
        .schedules
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Scheduled notification not found: {}", id)))
}

/// POST /api/v1/schedules/{id}/cancel
#[tracing::instrument(name = "http.cancel_schedule", skip(state))]
pub async fn cancel_schedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScheduledNotification>> {
    Ok(Json(state.schedules.cancel(id).await?))
}

/// POST /api/v1/schedules/{id}/requeue
#[tracing::instrument(name = "http.requeue_schedule", skip(state, body))]
pub async fn requeue_schedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<ScheduledNotification>> {
    let request: RequeueRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RequeueRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))?
    };

    Ok(Json(state.schedules.requeue(id, request.due_at).await?))
}
