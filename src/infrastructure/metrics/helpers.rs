//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    BACKEND_ERRORS_TOTAL, BACKEND_OPERATION_LATENCY, CHANNEL_CALLS_TOTAL,
    CHANNEL_DELIVERIES_TOTAL, CHANNEL_FAILURES_TOTAL, SCHEDULED_ITEMS_TOTAL,
    SCHEDULER_BATCH_DURATION, SCHEDULER_DUE_ITEMS, SENDS_TOTAL, SEND_LATENCY,
    TRIGGER_MESSAGES_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording send and channel metrics
pub struct DispatchMetrics;

impl DispatchMetrics {
    pub fn record_sent(latency_secs: f64) {
        SENDS_TOTAL.with_label_values(&["sent"]).inc();
        SEND_LATENCY.observe(latency_secs);
    }

    /// All attempted channels failed
    pub fn record_failed(latency_secs: f64) {
        SENDS_TOTAL.with_label_values(&["failed"]).inc();
        SEND_LATENCY.observe(latency_secs);
    }

    /// Rejected before any channel call (missing, unknown or disabled template)
    pub fn record_rejected() {
        SENDS_TOTAL.with_label_values(&["rejected"]).inc();
    }

    pub fn record_dry_run() {
        SENDS_TOTAL.with_label_values(&["dry_run"]).inc();
    }

    /// Record a successful channel call and the recipients it reached
    pub fn record_channel_delivered(channel: &str, count: usize) {
        CHANNEL_CALLS_TOTAL.with_label_values(&[channel]).inc();
        CHANNEL_DELIVERIES_TOTAL
            .with_label_values(&[channel])
            .inc_by(count as u64);
    }

    pub fn record_channel_failed(channel: &str) {
        CHANNEL_CALLS_TOTAL.with_label_values(&[channel]).inc();
        CHANNEL_FAILURES_TOTAL.with_label_values(&[channel]).inc();
    }
}

/// Helper struct for scheduler metrics
pub struct SchedulerMetrics;

impl SchedulerMetrics {
    pub fn record_item(outcome: &str) {
        SCHEDULED_ITEMS_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Record a processed batch
    pub fn record_batch(due: usize, duration_secs: f64) {
        SCHEDULER_DUE_ITEMS.set(due as i64);
        SCHEDULER_BATCH_DURATION.observe(duration_secs);
    }
}

/// Helper struct for trigger metrics
pub struct TriggerMetrics;

impl TriggerMetrics {
    pub fn record(source: &str, result: &str) {
        TRIGGER_MESSAGES_TOTAL
            .with_label_values(&[source, result])
            .inc();
    }
}

/// Helper struct for store backend metrics
pub struct BackendMetrics;

impl BackendMetrics {
    /// Record backend operation latency
    pub fn record_latency(backend: &str, operation: &str, latency_secs: f64) {
        BACKEND_OPERATION_LATENCY
            .with_label_values(&[backend, operation])
            .observe(latency_secs);
    }

    /// Record backend error
    pub fn record_error(backend: &str, operation: &str) {
        BACKEND_ERRORS_TOTAL
            .with_label_values(&[backend, operation])
            .inc();
    }
}
