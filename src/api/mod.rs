//! API layer - HTTP endpoint handlers organized by domain.

mod health;
mod logs;
mod metrics;
mod notification;
mod routes;
mod schedule;
mod template;

pub use health::{health, stats};
pub use logs::{log_stats, recent_logs};
pub use metrics::prometheus_metrics;
pub use notification::{process_due, send_notification, ProcessDueRequest};
pub use routes::api_routes;
pub use schedule::{
    cancel_schedule, create_schedule, get_schedule, list_schedules, requeue_schedule,
    RequeueRequest,
};
pub use template::{get_template, list_templates};
