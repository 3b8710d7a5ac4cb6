//! Template dispatch.
//!
//! `NotificationDispatcher::send_by_template` is the single entry point used
//! by the HTTP API, the Redis trigger and the scheduler:
//! template lookup, rendering, audience resolution, then fan-out or a
//! dry-run report.

mod dispatcher;
mod types;

pub use dispatcher::{DispatcherStats, DispatcherStatsSnapshot, NotificationDispatcher};
pub use types::{DispatchError, DryRunPolicy, SendByTemplateRequest, SendOutcome};
