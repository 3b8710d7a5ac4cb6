//! Dispatch endpoints.

use axum::{body::Bytes, extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::notification::{SendByTemplateRequest, SendOutcome};
use crate::server::AppState;
use crate::tasks::{ProcessOptions, ProcessReport};

/// Body of `POST /notifications/process-due`; every field is optional
#[derive(Debug, Default, Deserialize)]
pub struct ProcessDueRequest {
    #[serde(default)]
    pub dry_run: bool,
    /// Defaults to now
    #[serde(default)]
    pub reference: Option<DateTime<Utc>>,
}

/// POST /api/v1/notifications/send
#[tracing::instrument(
    name = "http.send_notification",
    skip(state, request),
    fields(template_type = %request.template_type)
)]
pub async fn send_notification(
    State(state): State<AppState>,
    Json(request): Json<SendByTemplateRequest>,
) -> Result<Json<SendOutcome>> {
    let outcome = state
        .dispatcher
        .send_by_template(request.with_source("http"))
        .await?;
    Ok(Json(outcome))
}

/// POST /api/v1/notifications/process-due
#[tracing::instrument(name = "http.process_due", skip(state, body))]
pub async fn process_due(State(state): State<AppState>, body: Bytes) -> Result<Json<ProcessReport>> {
    let request: ProcessDueRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ProcessDueRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))?
    };

    let reference = request.reference.unwrap_or_else(Utc::now);
    let report = state
        .driver
        .process_due_notifications(
            reference,
            ProcessOptions {
                dry_run: request.dry_run,
            },
        )
        .await?;

    Ok(Json(report))
}
