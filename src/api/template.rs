//! Template read endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::domain::template::{NotificationTemplate, TemplateListResponse};
use crate::error::{AppError, Result};
use crate::server::AppState;

/// GET /api/v1/templates
#[tracing::instrument(name = "http.list_templates", skip(state))]
pub async fn list_templates(State(state): State<AppState>) -> Result<Json<TemplateListResponse>> {
    let templates = state.templates.list_templates().await?;
    let total = templates.len();

    Ok(Json(TemplateListResponse { templates, total }))
}

/// GET /api/v1/templates/{template_type}
#[tracing::instrument(name = "http.get_template", skip(state))]
pub async fn get_template(
    State(state): State<AppState>,
    Path(template_type): Path<String>,
) -> Result<Json<NotificationTemplate>> {
    state
        .templates
        .get_template(&template_type)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Template not found: {}", template_type)))
}
