use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::domain::audience::{normalize_audience, AudienceSources, AudienceSpec};
use crate::domain::delivery::{
    DeliveryChannels, DeliveryError, DeliveryFanOut, DeliveryReport,
};
use crate::domain::log::{LogStatus, NotificationLogEntry, NotificationLogSink};
use crate::domain::payload::{build_payload, DeliveryPayload};
use crate::domain::template::TemplateStore;
use crate::metrics::DispatchMetrics;

use super::types::{DispatchError, DryRunPolicy, SendByTemplateRequest, SendOutcome};

/// Statistics for the notification dispatcher
#[derive(Debug, Default)]
pub struct DispatcherStats {
    /// Sends that reached the delivery stage
    pub total_sent: AtomicU64,
    /// Recipients reported by the channels
    pub total_delivered: AtomicU64,
    /// Sends where every attempted channel failed
    pub total_failed: AtomicU64,
    /// Individual channel failures
    pub channel_failures: AtomicU64,
    /// Sends rejected before delivery
    pub rejected: AtomicU64,
    /// Dry-run sends
    pub dry_runs: AtomicU64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            total_sent: self.total_sent.load(Ordering::Relaxed),
            total_delivered: self.total_delivered.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            channel_failures: self.channel_failures.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            dry_runs: self.dry_runs.load(Ordering::Relaxed),
        }
    }

    fn record_deliveries(&self, reports: &[DeliveryReport]) {
        let delivered: usize = reports.iter().map(|r| r.count).sum();
        let failed = reports.iter().filter(|r| !r.is_success()).count();
        self.total_delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.channel_failures
            .fetch_add(failed as u64, Ordering::Relaxed);
    }
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub total_sent: u64,
    pub total_delivered: u64,
    pub total_failed: u64,
    pub channel_failures: u64,
    pub rejected: u64,
    pub dry_runs: u64,
}

/// Turns a template type plus context into deliveries
pub struct NotificationDispatcher {
    templates: Arc<dyn TemplateStore>,
    fan_out: DeliveryFanOut,
    dry_run: DryRunPolicy,
    log_sink: Option<Arc<dyn NotificationLogSink>>,
    stats: DispatcherStats,
}

impl NotificationDispatcher {
    /// Create a new dispatcher without a log sink
    pub fn new(
        templates: Arc<dyn TemplateStore>,
        channels: Arc<dyn DeliveryChannels>,
        dry_run: DryRunPolicy,
    ) -> Self {
        Self {
            templates,
            fan_out: DeliveryFanOut::new(channels),
            dry_run,
            log_sink: None,
            stats: DispatcherStats::default(),
        }
    }

    /// Attach a sink receiving one entry per dispatch outcome
    pub fn with_log_sink(mut self, sink: Arc<dyn NotificationLogSink>) -> Self {
        self.log_sink = Some(sink);
        self
    }

    pub fn templates(&self) -> &Arc<dyn TemplateStore> {
        &self.templates
    }

    pub fn channels(&self) -> &Arc<dyn DeliveryChannels> {
        self.fan_out.channels()
    }

    pub fn dry_run_policy(&self) -> DryRunPolicy {
        self.dry_run
    }

    /// Get dispatcher statistics
    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// Render a template and deliver it to the resolved audience.
    ///
    /// Missing, unknown or disabled templates fail before any channel call.
    /// Channel failures are reported per channel; the call only fails when
    /// every attempted channel failed.
    #[tracing::instrument(
        name = "dispatcher.send_by_template",
        skip(self, request),
        fields(
            template_type = %request.template_type,
            tenant_id = ?request.tenant_id,
            dry_run = tracing::field::Empty
        )
    )]
    pub async fn send_by_template(
        &self,
        request: SendByTemplateRequest,
    ) -> Result<SendOutcome, DispatchError> {
        let start = Instant::now();

        let template_type = request.template_type.trim();
        if template_type.is_empty() {
            return Err(self.reject(DispatchError::TemplateTypeRequired));
        }

        let template = match self.templates.get_template(template_type).await {
            Ok(Some(template)) => template,
            Ok(None) => {
                return Err(self.reject(DispatchError::TemplateNotFound(template_type.to_string())))
            }
            Err(e) => return Err(self.reject(DispatchError::Store(e))),
        };

        if !template.enabled {
            return Err(self.reject(DispatchError::TemplateDisabled(template_type.to_string())));
        }

        let overrides = &request.payload_overrides;
        let payload = build_payload(&template, &request.variables, overrides);
        let audience = normalize_audience(&AudienceSources {
            template_audience: &template.audience,
            override_audience: &overrides.audience,
            caller_roles: &request.audience_roles,
            override_tags: &overrides.tags,
            caller_tags: &request.audience_tags,
            override_user_ids: &overrides.user_ids,
            caller_user_ids: &request.audience_user_ids,
        });
        let tenant_id = request
            .tenant_id
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        let dry_run = self.dry_run.resolve(request.dry_run);
        tracing::Span::current().record("dry_run", dry_run);

        let context = LogContext {
            template_type,
            payload: &payload,
            audience: &audience,
            tenant_id,
            source: request.source.as_deref().unwrap_or("api"),
        };

        if dry_run {
            let deliveries = vec![DeliveryReport::dry_run(audience.clone())];

            self.stats.dry_runs.fetch_add(1, Ordering::Relaxed);
            DispatchMetrics::record_dry_run();
            tracing::info!(
                roles = ?audience.roles,
                tags = audience.tags.len(),
                users = audience.user_ids.len(),
                "Dry-run dispatch, no channel invoked"
            );
            self.log(&context, &deliveries, LogStatus::DryRun, None).await;

            return Ok(SendOutcome {
                ok: true,
                template_type: template_type.to_string(),
                deliveries,
                dry_run: true,
            });
        }

        match self.fan_out.deliver(&audience, &payload, tenant_id).await {
            Ok(deliveries) => {
                self.stats.total_sent.fetch_add(1, Ordering::Relaxed);
                self.stats.record_deliveries(&deliveries);
                DispatchMetrics::record_sent(start.elapsed().as_secs_f64());

                tracing::info!(
                    channels = deliveries.len(),
                    recipients = deliveries.iter().map(|d| d.count).sum::<usize>(),
                    "Template dispatched"
                );
                self.log(&context, &deliveries, LogStatus::Sent, None).await;

                Ok(SendOutcome {
                    ok: true,
                    template_type: template_type.to_string(),
                    deliveries,
                    dry_run: false,
                })
            }
            Err(err) => {
                let DeliveryError::AllChannelsFailed { reports } = &err;
                self.stats.total_failed.fetch_add(1, Ordering::Relaxed);
                self.stats.record_deliveries(reports);
                DispatchMetrics::record_failed(start.elapsed().as_secs_f64());

                tracing::error!(error = %err, "Every delivery channel failed");
                self.log(&context, reports, LogStatus::Failed, Some(err.to_string()))
                    .await;

                Err(DispatchError::Delivery(err))
            }
        }
    }

    fn reject(&self, err: DispatchError) -> DispatchError {
        self.stats.rejected.fetch_add(1, Ordering::Relaxed);
        DispatchMetrics::record_rejected();
        tracing::warn!(code = err.code(), error = %err, "Dispatch rejected");
        err
    }

    async fn log(
        &self,
        context: &LogContext<'_>,
        deliveries: &[DeliveryReport],
        status: LogStatus,
        error: Option<String>,
    ) {
        let Some(sink) = &self.log_sink else {
            return;
        };

        let mut entry = NotificationLogEntry::from_dispatch(
            context.template_type,
            &context.payload.title,
            &context.payload.body,
            context.audience,
            deliveries,
            status,
        )
        .with_tenant(context.tenant_id)
        .with_source(context.source);
        if let Some(error) = error {
            entry = entry.with_error(error);
        }

        sink.record(entry).await;
    }
}

struct LogContext<'a> {
    template_type: &'a str,
    payload: &'a DeliveryPayload,
    audience: &'a AudienceSpec,
    tenant_id: Option<&'a str>,
    source: &'a str,
}
