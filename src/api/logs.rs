//! Notification log endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domain::log::{LogFilter, LogStats, NotificationLogEntry};
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LogStatsQuery {
    pub tenant_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecentLogsResponse {
    pub logs: Vec<NotificationLogEntry>,
    pub total: usize,
}

/// GET /api/v1/notifications/logs/stats?tenant_id=
pub async fn log_stats(
    State(state): State<AppState>,
    Query(query): Query<LogStatsQuery>,
) -> Json<LogStats> {
    Json(state.log_sink.stats(query.tenant_id.as_deref()).await)
}

/// GET /api/v1/notifications/logs?tenant_id=&template_type=&status=&limit=
pub async fn recent_logs(
    State(state): State<AppState>,
    Query(filter): Query<LogFilter>,
) -> Json<RecentLogsResponse> {
    let logs = state.log_sink.recent(&filter).await;
    let total = logs.len();
    Json(RecentLogsResponse { logs, total })
}
