use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::domain::delivery::{create_delivery_channels, DeliveryChannels};
use crate::domain::log::MemoryLogSink;
use crate::domain::schedule::ScheduleStore;
use crate::domain::storage::{create_store_backends, StoreBackends};
use crate::domain::template::TemplateStore;
use crate::notification::{DryRunPolicy, NotificationDispatcher};
use crate::postgres::PostgresPool;
use crate::tasks::ScheduledNotificationDriver;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub templates: Arc<dyn TemplateStore>,
    pub schedules: Arc<dyn ScheduleStore>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub driver: Arc<ScheduledNotificationDriver>,
    pub log_sink: Arc<MemoryLogSink>,
    pub postgres: Option<PostgresPool>,
    pub started_at: Instant,
}

impl AppState {
    /// Build the state from settings, connecting to PostgreSQL when the
    /// storage backend asks for it. Connection failures fall back to memory.
    pub async fn build(settings: Settings) -> Self {
        let postgres = if settings.storage.backend == "postgres" {
            connect_postgres(&settings).await
        } else {
            None
        };

        let stores = create_store_backends(&settings.storage, postgres.as_ref());
        let channels = create_delivery_channels(&settings.dispatch);

        let mut state = Self::from_parts(settings, stores, channels);
        state.postgres = postgres;
        state
    }

    /// Assemble the state from explicit stores and channels
    pub fn from_parts(
        settings: Settings,
        stores: StoreBackends,
        channels: Arc<dyn DeliveryChannels>,
    ) -> Self {
        let dry_run = DryRunPolicy::new(settings.dispatch.dry_run);
        if dry_run.is_forced() {
            tracing::warn!("Process-wide dry-run enabled, no notification will be delivered");
        }

        let log_sink = Arc::new(MemoryLogSink::default());
        let dispatcher = Arc::new(
            NotificationDispatcher::new(stores.templates.clone(), channels, dry_run)
                .with_log_sink(log_sink.clone()),
        );
        let driver = Arc::new(
            ScheduledNotificationDriver::new(dispatcher.clone(), stores.schedules.clone())
                .with_max_concurrency(settings.scheduler.max_concurrency),
        );

        Self {
            settings: Arc::new(settings),
            templates: stores.templates,
            schedules: stores.schedules,
            dispatcher,
            driver,
            log_sink,
            postgres: None,
            started_at: Instant::now(),
        }
    }
}

async fn connect_postgres(settings: &Settings) -> Option<PostgresPool> {
    let pool = match PostgresPool::connect(&settings.database).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            return None;
        }
    };

    if let Err(e) = pool.migrate().await {
        tracing::error!(error = %e, "Failed to apply PostgreSQL migrations");
        return None;
    }

    Some(pool)
}
