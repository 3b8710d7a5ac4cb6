//! Scheduled notification types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::payload::{one_or_many, PayloadOverrides};
use crate::domain::storage::StoreError;

/// Lifecycle of a scheduled notification.
///
/// The driver moves `pending` items to `sent` or `failed`. `cancelled` is only
/// set through the admin operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    Pending,
    Sent,
    Failed,
    Cancelled,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Pending => "pending",
            ScheduleStatus::Sent => "sent",
            ScheduleStatus::Failed => "failed",
            ScheduleStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ScheduleStatus::Pending),
            "sent" => Ok(ScheduleStatus::Sent),
            "failed" => Ok(ScheduleStatus::Failed),
            "cancelled" => Ok(ScheduleStatus::Cancelled),
            other => Err(StoreError::Invalid(format!("unknown schedule status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceUnit {
    Day,
    Week,
}

/// Repeat rule for a scheduled notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Recurrence {
    Interval { every: u32, unit: RecurrenceUnit },
    Daily,
    Weekly,
}

/// Longest accepted `interval` rule in days
pub const MAX_INTERVAL_DAYS: u32 = 3650;
/// Longest accepted `interval` rule in weeks
pub const MAX_INTERVAL_WEEKS: u32 = 520;

impl Recurrence {
    /// Length of one period, `None` when it does not fit a `Duration`
    pub fn period(&self) -> Option<Duration> {
        match self {
            Recurrence::Interval {
                every,
                unit: RecurrenceUnit::Day,
            } => Duration::try_days(i64::from(*every)),
            Recurrence::Interval {
                every,
                unit: RecurrenceUnit::Week,
            } => Duration::try_weeks(i64::from(*every)),
            Recurrence::Daily => Duration::try_days(1),
            Recurrence::Weekly => Duration::try_weeks(1),
        }
    }

    /// Next due time, one period after `from`. `None` if out of range.
    pub fn next_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        from.checked_add_signed(self.period()?)
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        match *self {
            Recurrence::Interval { every: 0, .. } => Err(ScheduleError::InvalidRecurrence(
                "interval must repeat at least every 1 unit".to_string(),
            )),
            Recurrence::Interval {
                every,
                unit: RecurrenceUnit::Day,
            } if every > MAX_INTERVAL_DAYS => Err(ScheduleError::InvalidRecurrence(format!(
                "interval cannot exceed {} days",
                MAX_INTERVAL_DAYS
            ))),
            Recurrence::Interval {
                every,
                unit: RecurrenceUnit::Week,
            } if every > MAX_INTERVAL_WEEKS => Err(ScheduleError::InvalidRecurrence(format!(
                "interval cannot exceed {} weeks",
                MAX_INTERVAL_WEEKS
            ))),
            _ => Ok(()),
        }
    }
}

/// One row per future or recurring send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledNotification {
    pub id: Uuid,
    pub template_type: String,
    /// Role override list
    #[serde(default)]
    pub audience: Vec<String>,
    #[serde(default)]
    pub payload_overrides: PayloadOverrides,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub due_at: DateTime<Utc>,
    pub status: ScheduleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default)]
    pub failure_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduledNotification {
    /// Create a pending item from a validated request
    pub fn new(item: NewScheduledNotification) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            template_type: item.template_type,
            audience: item.audience,
            payload_overrides: item.payload_overrides,
            tenant_id: item.tenant_id,
            due_at: item.due_at,
            status: ScheduleStatus::Pending,
            last_error: None,
            failure_count: 0,
            sent_at: None,
            last_run_at: None,
            recurrence: item.recurrence,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_due(&self, reference: DateTime<Utc>) -> bool {
        self.status == ScheduleStatus::Pending && self.due_at <= reference
    }

    /// Apply a successful dispatch at `at`.
    ///
    /// Recurring items stay pending with `due_at` moved one period past `at`.
    /// A recurrence whose next due time is out of range ends here as `sent`.
    pub fn apply_sent(&mut self, at: DateTime<Utc>) {
        self.last_run_at = Some(at);
        self.updated_at = at;

        let next_due = self.recurrence.and_then(|recurrence| {
            let next = recurrence.next_after(at);
            if next.is_none() {
                tracing::warn!(
                    schedule_id = %self.id,
                    recurrence = ?recurrence,
                    "Next occurrence is out of range, ending recurrence"
                );
            }
            next
        });

        match next_due {
            Some(next) => {
                self.due_at = next;
                self.status = ScheduleStatus::Pending;
            }
            None => {
                self.sent_at = Some(at);
                self.status = ScheduleStatus::Sent;
            }
        }
    }

    /// Apply a failed dispatch at `at`
    pub fn apply_failure(&mut self, error: &str, at: DateTime<Utc>) {
        self.status = ScheduleStatus::Failed;
        self.last_error = Some(error.to_string());
        self.failure_count += 1;
        self.last_run_at = Some(at);
        self.updated_at = at;
    }
}

impl ScheduledNotification {
    /// Cancel a pending or failed item
    pub fn apply_cancel(&mut self, at: DateTime<Utc>) -> Result<(), ScheduleError> {
        match self.status {
            ScheduleStatus::Pending | ScheduleStatus::Failed => {
                self.status = ScheduleStatus::Cancelled;
                self.updated_at = at;
                Ok(())
            }
            status => Err(ScheduleError::InvalidTransition {
                id: self.id,
                status,
                action: "cancelled",
            }),
        }
    }

    /// Put a failed or cancelled item back to pending, optionally at a new time
    pub fn apply_requeue(
        &mut self,
        due_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> Result<(), ScheduleError> {
        match self.status {
            ScheduleStatus::Failed | ScheduleStatus::Cancelled => {
                self.status = ScheduleStatus::Pending;
                if let Some(due_at) = due_at {
                    self.due_at = due_at;
                }
                self.updated_at = at;
                Ok(())
            }
            status => Err(ScheduleError::InvalidTransition {
                id: self.id,
                status,
                action: "requeued",
            }),
        }
    }
}

/// A validated item ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewScheduledNotification {
    pub template_type: String,
    pub due_at: DateTime<Utc>,
    pub audience: Vec<String>,
    pub payload_overrides: PayloadOverrides,
    pub tenant_id: Option<String>,
    pub recurrence: Option<Recurrence>,
}

/// Admin request to schedule a notification
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleRequest {
    #[serde(default)]
    pub template_type: String,
    pub due_at: DateTime<Utc>,
    /// Role override list; the template audience is used when empty
    #[serde(default, deserialize_with = "one_or_many")]
    pub audience: Vec<String>,
    #[serde(default)]
    pub payload_overrides: PayloadOverrides,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub recurrence: Option<Recurrence>,
}

/// Filter for listing scheduled notifications
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleFilter {
    #[serde(default)]
    pub status: Option<ScheduleStatus>,
    #[serde(default)]
    pub template_type: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ScheduleFilter {
    pub fn matches(&self, item: &ScheduledNotification) -> bool {
        self.status.map_or(true, |s| s == item.status)
            && self
                .template_type
                .as_deref()
                .map_or(true, |t| t == item.template_type)
    }
}

/// Errors from the schedule admin operations
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("template_type is required")]
    TemplateTypeRequired,

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Template is disabled: {0}")]
    TemplateDisabled(String),

    #[error("Invalid recurrence: {0}")]
    InvalidRecurrence(String),

    #[error("Scheduled notification not found: {0}")]
    NotFound(Uuid),

    #[error("Scheduled notification {id} is {status} and cannot be {action}")]
    InvalidTransition {
        id: Uuid,
        status: ScheduleStatus,
        action: &'static str,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
