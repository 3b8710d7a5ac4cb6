use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::domain::delivery::DeliveryReport;
use crate::domain::schedule::{ScheduleStore, ScheduledNotification};
use crate::domain::storage::StoreError;
use crate::metrics::SchedulerMetrics;
use crate::notification::{NotificationDispatcher, SendByTemplateRequest};

/// Items dispatched concurrently when no limit is configured
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Data keys carrying the downstream deduplication key
const DATA_SCHEDULE_ID: &str = "scheduleId";
const DATA_SCHEDULED_FOR: &str = "scheduledFor";

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Failed to fetch due notifications: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessOptions {
    pub dry_run: bool,
}

/// Outcome of one due item
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleResult {
    pub schedule_id: Uuid,
    pub template_type: String,
    pub ok: bool,
    pub deliveries: Vec<DeliveryReport>,
    /// `null` on success
    pub error: Option<String>,
    pub dry_run: bool,
}

/// Outcome of one batch
#[derive(Debug, Clone, Serialize)]
pub struct ProcessReport {
    pub ok: bool,
    /// Items dispatched successfully
    pub processed: usize,
    pub dry_run: bool,
    pub results: Vec<ScheduleResult>,
}

/// Dispatches due scheduled notifications and records their outcome
pub struct ScheduledNotificationDriver {
    dispatcher: Arc<NotificationDispatcher>,
    store: Arc<dyn ScheduleStore>,
    max_concurrency: usize,
}

impl ScheduledNotificationDriver {
    pub fn new(dispatcher: Arc<NotificationDispatcher>, store: Arc<dyn ScheduleStore>) -> Self {
        Self {
            dispatcher,
            store,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn ScheduleStore> {
        &self.store
    }

    /// Dispatch every item due at `reference`.
    ///
    /// Per-item failures are persisted and reported, never propagated. Only a
    /// failure to fetch the batch is returned as an error.
    #[tracing::instrument(
        name = "scheduler.process_due",
        skip(self),
        fields(reference = %reference, dry_run = options.dry_run)
    )]
    pub async fn process_due_notifications(
        &self,
        reference: DateTime<Utc>,
        options: ProcessOptions,
    ) -> Result<ProcessReport, SchedulerError> {
        let start = Instant::now();
        let dry_run = options.dry_run || self.dispatcher.dry_run_policy().is_forced();

        let due = self.store.fetch_due(reference).await?;
        let due_count = due.len();

        if due_count > 0 {
            tracing::info!(due = due_count, "Processing due scheduled notifications");
        }

        let results: Vec<ScheduleResult> = stream::iter(due)
            .map(|item| self.process_item(item, dry_run))
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let processed = results.iter().filter(|r| r.ok).count();
        SchedulerMetrics::record_batch(due_count, start.elapsed().as_secs_f64());

        if due_count > 0 {
            tracing::info!(
                due = due_count,
                processed,
                failed = due_count - processed,
                "Scheduled batch complete"
            );
        }

        Ok(ProcessReport {
            ok: true,
            processed,
            dry_run,
            results,
        })
    }

    async fn process_item(&self, item: ScheduledNotification, dry_run: bool) -> ScheduleResult {
        let schedule_id = item.id;
        let template_type = item.template_type.clone();

        let request = dispatch_request(item, dry_run);
        let outcome = self.dispatcher.send_by_template(request).await;

        match outcome {
            Ok(outcome) => {
                if dry_run {
                    SchedulerMetrics::record_item("dry_run");
                } else {
                    SchedulerMetrics::record_item("sent");
                    if let Err(e) = self.store.mark_sent(schedule_id, Utc::now()).await {
                        tracing::error!(
                            schedule_id = %schedule_id,
                            error = %e,
                            "Failed to mark scheduled notification as sent"
                        );
                    }
                }

                ScheduleResult {
                    schedule_id,
                    template_type,
                    ok: true,
                    deliveries: outcome.deliveries,
                    error: None,
                    dry_run,
                }
            }
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(
                    schedule_id = %schedule_id,
                    template_type = %template_type,
                    error = %message,
                    "Scheduled notification failed"
                );
                SchedulerMetrics::record_item("failed");

                if !dry_run {
                    if let Err(e) = self
                        .store
                        .record_failure(schedule_id, &message, Utc::now())
                        .await
                    {
                        tracing::error!(
                            schedule_id = %schedule_id,
                            error = %e,
                            "Failed to record scheduled notification failure"
                        );
                    }
                }

                ScheduleResult {
                    schedule_id,
                    template_type,
                    ok: false,
                    deliveries: Vec::new(),
                    error: Some(message),
                    dry_run,
                }
            }
        }
    }
}

fn dispatch_request(item: ScheduledNotification, dry_run: bool) -> SendByTemplateRequest {
    let mut overrides = item.payload_overrides;
    overrides.data.insert(
        DATA_SCHEDULE_ID.to_string(),
        Value::String(item.id.to_string()),
    );
    overrides.data.insert(
        DATA_SCHEDULED_FOR.to_string(),
        Value::String(item.due_at.to_rfc3339()),
    );

    let mut request = SendByTemplateRequest::new(item.template_type)
        .with_variables(overrides.variables.clone())
        .with_roles(item.audience)
        .with_overrides(overrides)
        .with_dry_run(dry_run)
        .with_source("scheduler");
    request.tenant_id = item.tenant_id;
    request
}

/// Background poller driving `ScheduledNotificationDriver`
pub struct SchedulerTask {
    config: SchedulerConfig,
    driver: Arc<ScheduledNotificationDriver>,
    shutdown: broadcast::Receiver<()>,
}

impl SchedulerTask {
    pub fn new(
        config: SchedulerConfig,
        driver: Arc<ScheduledNotificationDriver>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            config,
            driver,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds.max(1));
        let mut timer = tokio::time::interval(poll_interval);

        // Skip immediate first tick
        timer.tick().await;

        tracing::info!(
            poll_interval_secs = self.config.poll_interval_seconds,
            max_concurrency = self.config.max_concurrency,
            backend = self.driver.store().backend_name(),
            "Scheduler task started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("Scheduler task received shutdown signal");
                    break;
                }
                _ = timer.tick() => {
                    if let Err(e) = self
                        .driver
                        .process_due_notifications(Utc::now(), ProcessOptions::default())
                        .await
                    {
                        tracing::error!(error = %e, "Scheduled batch failed");
                    }
                }
            }
        }

        tracing::info!("Scheduler task stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::delivery::NoopChannels;
    use crate::domain::payload::PayloadOverrides;
    use crate::domain::schedule::{MemoryScheduleStore, NewScheduledNotification, ScheduleStatus};
    use crate::domain::template::{MemoryTemplateStore, NotificationTemplate};
    use crate::notification::DryRunPolicy;
    use chrono::Duration as ChronoDuration;

    fn templates() -> Arc<MemoryTemplateStore> {
        let store = MemoryTemplateStore::new();
        store
            .upsert(NotificationTemplate::new("reminder", "Hi {{name}}", "b").with_audience(["customer"]))
            .unwrap();
        store
            .upsert(NotificationTemplate::new("paused", "t", "b").disabled())
            .unwrap();
        Arc::new(store)
    }

    fn new_item(template_type: &str, due_at: DateTime<Utc>) -> NewScheduledNotification {
        NewScheduledNotification {
            template_type: template_type.to_string(),
            due_at,
            audience: vec!["customer".into()],
            payload_overrides: PayloadOverrides::default(),
            tenant_id: None,
            recurrence: None,
        }
    }

    fn driver(policy: DryRunPolicy) -> (Arc<MemoryScheduleStore>, ScheduledNotificationDriver) {
        let store = Arc::new(MemoryScheduleStore::new());
        let dispatcher = Arc::new(NotificationDispatcher::new(
            templates(),
            Arc::new(NoopChannels),
            policy,
        ));
        let driver = ScheduledNotificationDriver::new(dispatcher, store.clone());
        (store, driver)
    }

    #[test]
    fn test_dispatch_request_injects_dedup_key() {
        let due_at = Utc::now();
        let item = ScheduledNotification::new(new_item("reminder", due_at));
        let id = item.id;

        let request = dispatch_request(item, false);

        let data = &request.payload_overrides.data;
        assert_eq!(data[DATA_SCHEDULE_ID], id.to_string());
        assert_eq!(data[DATA_SCHEDULED_FOR], due_at.to_rfc3339());
        assert_eq!(request.audience_roles, vec!["customer"]);
        assert_eq!(request.source.as_deref(), Some("scheduler"));
    }

    #[tokio::test]
    async fn test_batch_isolation() {
        let (store, driver) = driver(DryRunPolicy::live());
        let now = Utc::now();
        let first = store
            .schedule(new_item("reminder", now - ChronoDuration::minutes(3)))
            .await
            .unwrap();
        let second = store
            .schedule(new_item("paused", now - ChronoDuration::minutes(2)))
            .await
            .unwrap();
        let third = store
            .schedule(new_item("reminder", now - ChronoDuration::minutes(1)))
            .await
            .unwrap();

        let report = driver
            .process_due_notifications(now, ProcessOptions::default())
            .await
            .unwrap();

        assert!(report.ok);
        assert_eq!(report.processed, 2);
        let ids: Vec<_> = report.results.iter().map(|r| r.schedule_id).collect();
        assert_eq!(ids, vec![first.id, second.id, third.id]);
        assert!(report.results[1].error.is_some());

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["results"][0]["error"].is_null());
        assert!(json["results"][0].as_object().unwrap().contains_key("error"));
        assert!(json["results"][1]["error"].is_string());

        let second = store.get(second.id).await.unwrap().unwrap();
        assert_eq!(second.status, ScheduleStatus::Failed);
        assert_eq!(second.failure_count, 1);
        assert_eq!(
            store.get(first.id).await.unwrap().unwrap().status,
            ScheduleStatus::Sent
        );
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let (store, driver) = driver(DryRunPolicy::live());
        let now = Utc::now();
        let item = store.schedule(new_item("reminder", now)).await.unwrap();

        let report = driver
            .process_due_notifications(now, ProcessOptions { dry_run: true })
            .await
            .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.processed, 1);
        assert!(report.results[0].dry_run);
        assert_eq!(
            store.get(item.id).await.unwrap().unwrap().status,
            ScheduleStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_forced_dry_run_applies_to_batch() {
        let (store, driver) = driver(DryRunPolicy::forced());
        let now = Utc::now();
        store.schedule(new_item("reminder", now)).await.unwrap();

        let report = driver
            .process_due_notifications(now, ProcessOptions::default())
            .await
            .unwrap();

        assert!(report.dry_run);
        assert_eq!(store.fetch_due(now).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_future_items_are_skipped() {
        let (store, driver) = driver(DryRunPolicy::live());
        let now = Utc::now();
        store
            .schedule(new_item("reminder", now + ChronoDuration::hours(1)))
            .await
            .unwrap();

        let report = driver
            .process_due_notifications(now, ProcessOptions::default())
            .await
            .unwrap();

        assert_eq!(report.processed, 0);
        assert!(report.results.is_empty());
    }

    #[tokio::test]
    async fn test_scheduler_task_shutdown() {
        let (_, driver) = driver(DryRunPolicy::live());
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let config = SchedulerConfig {
            enabled: true,
            poll_interval_seconds: 1,
            max_concurrency: 2,
        };

        let task = SchedulerTask::new(config, Arc::new(driver), shutdown_rx);
        let handle = tokio::spawn(async move {
            task.run().await;
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("Task should complete")
            .expect("Task should not panic");
    }
}
