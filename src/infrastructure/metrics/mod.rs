//! Prometheus metrics for the dispatch service.
//!
//! - Send metrics (outcome, latency)
//! - Channel metrics (calls, recipients, failures per channel)
//! - Scheduler metrics (items per outcome, batch size and duration)
//! - Trigger and store backend metrics

mod helpers;

pub use helpers::{encode_metrics, BackendMetrics, DispatchMetrics, SchedulerMetrics, TriggerMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter_vec, register_int_gauge,
    Histogram, HistogramVec, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "push_dispatch";

lazy_static! {
    // ============================================================================
    // Send Metrics
    // ============================================================================

    /// Template sends by outcome (sent, failed, rejected, dry_run)
    pub static ref SENDS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_sends_total", METRIC_PREFIX),
        "Total template sends by outcome",
        &["outcome"]
    ).unwrap();

    /// End-to-end latency of one send_by_template call
    pub static ref SEND_LATENCY: Histogram = register_histogram!(
        format!("{}_send_latency_seconds", METRIC_PREFIX),
        "Template send latency in seconds",
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    ).unwrap();

    // ============================================================================
    // Channel Metrics
    // ============================================================================

    /// Channel invocations
    pub static ref CHANNEL_CALLS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_channel_calls_total", METRIC_PREFIX),
        "Total delivery channel invocations",
        &["channel"]
    ).unwrap();

    /// Recipients reported by each channel
    pub static ref CHANNEL_DELIVERIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_channel_deliveries_total", METRIC_PREFIX),
        "Total recipients reached per delivery channel",
        &["channel"]
    ).unwrap();

    /// Failed channel invocations
    pub static ref CHANNEL_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_channel_failures_total", METRIC_PREFIX),
        "Total failed delivery channel invocations",
        &["channel"]
    ).unwrap();

    // ============================================================================
    // Scheduler Metrics
    // ============================================================================

    /// Scheduled items processed by outcome (sent, failed, dry_run)
    pub static ref SCHEDULED_ITEMS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_scheduled_items_total", METRIC_PREFIX),
        "Total scheduled notifications processed by outcome",
        &["outcome"]
    ).unwrap();

    /// Items due in the most recent batch
    pub static ref SCHEDULER_DUE_ITEMS: IntGauge = register_int_gauge!(
        format!("{}_scheduler_due_items", METRIC_PREFIX),
        "Number of due items in the last processed batch"
    ).unwrap();

    /// Duration of one process-due batch
    pub static ref SCHEDULER_BATCH_DURATION: Histogram = register_histogram!(
        format!("{}_scheduler_batch_duration_seconds", METRIC_PREFIX),
        "Duration of one scheduled batch in seconds",
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]
    ).unwrap();

    // ============================================================================
    // Trigger Metrics
    // ============================================================================

    /// Redis trigger messages by result (dispatched, invalid, failed)
    pub static ref TRIGGER_MESSAGES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_trigger_messages_total", METRIC_PREFIX),
        "Total trigger messages received by result",
        &["source", "result"]
    ).unwrap();

    // ============================================================================
    // Store Backend Metrics
    // ============================================================================

    /// Store operation latency by backend and operation
    pub static ref BACKEND_OPERATION_LATENCY: HistogramVec = register_histogram_vec!(
        format!("{}_backend_operation_latency_seconds", METRIC_PREFIX),
        "Store backend operation latency in seconds",
        &["backend", "operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    ).unwrap();

    /// Store operation errors by backend and operation
    pub static ref BACKEND_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_backend_errors_total", METRIC_PREFIX),
        "Total store backend errors",
        &["backend", "operation"]
    ).unwrap();
}
