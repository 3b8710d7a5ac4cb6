//! Schedule store abstraction

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::types::{
    NewScheduledNotification, ScheduleError, ScheduleFilter, ScheduleStatus, ScheduledNotification,
};
use crate::domain::storage::StoreError;

/// Persistence for scheduled notifications.
///
/// The driver uses `fetch_due`, `mark_sent` and `record_failure`; the rest are
/// admin operations. Each write touches a single item.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Pending items with `due_at <= reference`, ordered by `due_at` ascending
    async fn fetch_due(
        &self,
        reference: DateTime<Utc>,
    ) -> Result<Vec<ScheduledNotification>, StoreError>;

    /// Record a successful dispatch. Recurring items are rescheduled.
    /// Fails with `StoreError::Invalid` unless the item is pending.
    async fn mark_sent(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<ScheduledNotification, StoreError>;

    /// Record a failed dispatch: status `failed`, `last_error`, `failure_count + 1`.
    /// Fails with `StoreError::Invalid` unless the item is pending.
    async fn record_failure(
        &self,
        id: Uuid,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<ScheduledNotification, StoreError>;

    /// Store a new pending item
    async fn schedule(
        &self,
        item: NewScheduledNotification,
    ) -> Result<ScheduledNotification, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<ScheduledNotification>, StoreError>;

    /// Items matching `filter`, ordered by `due_at` ascending
    async fn list(&self, filter: &ScheduleFilter)
        -> Result<Vec<ScheduledNotification>, StoreError>;

    /// Cancel a pending or failed item
    async fn cancel(&self, id: Uuid) -> Result<ScheduledNotification, ScheduleError>;

    /// Return a failed or cancelled item to pending
    async fn requeue(
        &self,
        id: Uuid,
        due_at: Option<DateTime<Utc>>,
    ) -> Result<ScheduledNotification, ScheduleError>;

    /// Backend name for logs and health output
    fn backend_name(&self) -> &'static str;
}

/// Error for a driver write against an item that already left `pending`
pub(super) fn not_pending(id: Uuid, status: ScheduleStatus) -> StoreError {
    StoreError::Invalid(format!("scheduled notification {} is {}, not pending", id, status))
}
