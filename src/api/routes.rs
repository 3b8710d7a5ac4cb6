use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::server::{api_key_auth, AppState};

use super::health::{health, stats};
use super::logs::{log_stats, recent_logs};
use super::metrics::prometheus_metrics;
use super::notification::{process_due, send_notification};
use super::schedule::{
    cancel_schedule, create_schedule, get_schedule, list_schedules, requeue_schedule,
};
use super::template::{get_template, list_templates};

pub fn api_routes(state: AppState) -> Router<AppState> {
    let v1 = Router::new()
        // Dispatch
        .route("/notifications/send", post(send_notification))
        .route("/notifications/process-due", post(process_due))
        // Notification log
        .route("/notifications/logs", get(recent_logs))
        .route("/notifications/logs/stats", get(log_stats))
        // Templates
        .route("/templates", get(list_templates))
        .route("/templates/{template_type}", get(get_template))
        // Schedules
        .route("/schedules", post(create_schedule).get(list_schedules))
        .route("/schedules/{id}", get(get_schedule))
        .route("/schedules/{id}/cancel", post(cancel_schedule))
        .route("/schedules/{id}/requeue", post(requeue_schedule))
        .route_layer(middleware::from_fn_with_state(state, api_key_auth));

    Router::new()
        // Health, stats & metrics
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        .nest("/api/v1", v1)
}
