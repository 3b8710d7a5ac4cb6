//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::domain::log::LogStats;
use crate::notification::DispatcherStatsSnapshot;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub storage: StorageHealthResponse,
    pub delivery: DeliveryHealthResponse,
    pub scheduler: SchedulerHealthResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postgres: Option<PostgresHealthResponse>,
}

#[derive(Debug, Serialize)]
pub struct StorageHealthResponse {
    pub templates: &'static str,
    pub schedules: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DeliveryHealthResponse {
    pub backend: &'static str,
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
pub struct SchedulerHealthResponse {
    pub enabled: bool,
    pub poll_interval_seconds: u64,
    pub max_concurrency: usize,
}

#[derive(Debug, Serialize)]
pub struct PostgresHealthResponse {
    pub connected: bool,
    pub pool_size: u32,
    pub idle_connections: u32,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub dispatcher: DispatcherStatsSnapshot,
    pub log: LogStats,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let postgres = match &state.postgres {
        Some(pool) => Some(PostgresHealthResponse {
            connected: pool.ping().await,
            pool_size: pool.pool().size(),
            idle_connections: pool.pool().num_idle() as u32,
        }),
        None => None,
    };

    let degraded = postgres.as_ref().is_some_and(|p| !p.connected)
        || (state.settings.storage.backend == "postgres" && state.postgres.is_none());
    let status = if degraded { "degraded" } else { "healthy" };

    let scheduler = &state.settings.scheduler;

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        storage: StorageHealthResponse {
            templates: state.templates.backend_name(),
            schedules: state.schedules.backend_name(),
        },
        delivery: DeliveryHealthResponse {
            backend: state.dispatcher.channels().backend_name(),
            dry_run: state.dispatcher.dry_run_policy().is_forced(),
        },
        scheduler: SchedulerHealthResponse {
            enabled: scheduler.enabled,
            poll_interval_seconds: scheduler.poll_interval_seconds,
            max_concurrency: scheduler.max_concurrency,
        },
        postgres,
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        dispatcher: state.dispatcher.stats(),
        log: state.log_sink.stats(None).await,
    })
}
