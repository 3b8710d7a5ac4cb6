//! PostgreSQL-backed schedule store.
//!
//! Table structure (see `migrations/`):
//! - `scheduled_notifications` - one row per item, overrides and recurrence as JSONB

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::store::{not_pending, ScheduleStore};
use super::types::{
    NewScheduledNotification, Recurrence, ScheduleError, ScheduleFilter, ScheduleStatus,
    ScheduledNotification,
};
use crate::domain::payload::PayloadOverrides;
use crate::domain::storage::StoreError;
use crate::metrics::BackendMetrics;

const BACKEND: &str = "postgres";

const COLUMNS: &str = "id, template_type, audience, payload_overrides, tenant_id, due_at, \
    status, last_error, failure_count, sent_at, last_run_at, recurrence, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ScheduleRow {
    id: Uuid,
    template_type: String,
    audience: Vec<String>,
    payload_overrides: Json<PayloadOverrides>,
    tenant_id: Option<String>,
    due_at: DateTime<Utc>,
    status: String,
    last_error: Option<String>,
    failure_count: i32,
    sent_at: Option<DateTime<Utc>>,
    last_run_at: Option<DateTime<Utc>>,
    recurrence: Option<Json<Recurrence>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ScheduleRow> for ScheduledNotification {
    type Error = StoreError;

    fn try_from(row: ScheduleRow) -> Result<Self, Self::Error> {
        Ok(ScheduledNotification {
            id: row.id,
            template_type: row.template_type,
            audience: row.audience,
            payload_overrides: row.payload_overrides.0,
            tenant_id: row.tenant_id,
            due_at: row.due_at,
            status: row.status.parse()?,
            last_error: row.last_error,
            failure_count: u32::try_from(row.failure_count).unwrap_or_default(),
            sent_at: row.sent_at,
            last_run_at: row.last_run_at,
            recurrence: row.recurrence.map(|r| r.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Schedule store backed by PostgreSQL
pub struct PostgresScheduleStore {
    pool: PgPool,
}

impl PostgresScheduleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn rows_to_items(rows: Vec<ScheduleRow>) -> Result<Vec<ScheduledNotification>, StoreError> {
        rows.into_iter().map(ScheduledNotification::try_from).collect()
    }

    async fn insert(&self, item: &ScheduledNotification) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO scheduled_notifications
                (id, template_type, audience, payload_overrides, tenant_id, due_at, status,
                 last_error, failure_count, sent_at, last_run_at, recurrence, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(item.id)
        .bind(&item.template_type)
        .bind(&item.audience)
        .bind(Json(&item.payload_overrides))
        .bind(&item.tenant_id)
        .bind(item.due_at)
        .bind(item.status.as_str())
        .bind(&item.last_error)
        .bind(item.failure_count as i32)
        .bind(item.sent_at)
        .bind(item.last_run_at)
        .bind(item.recurrence.map(Json))
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Write back the mutable columns of an item loaded and changed in memory.
    /// `expected` guards against a concurrent status change.
    async fn write_back(
        &self,
        item: &ScheduledNotification,
        expected: ScheduleStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE scheduled_notifications
            SET due_at = $2, status = $3, last_error = $4, failure_count = $5,
                sent_at = $6, last_run_at = $7, updated_at = $8
            WHERE id = $1 AND status = $9
            "#,
        )
        .bind(item.id)
        .bind(item.due_at)
        .bind(item.status.as_str())
        .bind(&item.last_error)
        .bind(item.failure_count as i32)
        .bind(item.sent_at)
        .bind(item.last_run_at)
        .bind(item.updated_at)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Invalid(format!(
                "scheduled notification {} changed concurrently",
                item.id
            )));
        }

        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<ScheduledNotification, StoreError> {
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl ScheduleStore for PostgresScheduleStore {
    async fn fetch_due(
        &self,
        reference: DateTime<Utc>,
    ) -> Result<Vec<ScheduledNotification>, StoreError> {
        let start = Instant::now();
        let query = format!(
            "SELECT {COLUMNS} FROM scheduled_notifications \
             WHERE status = 'pending' AND due_at <= $1 ORDER BY due_at ASC"
        );

        let rows: Vec<ScheduleRow> = sqlx::query_as(&query)
            .bind(reference)
            .fetch_all(&self.pool)
            .await
            .inspect_err(|_| BackendMetrics::record_error(BACKEND, "fetch_due"))?;

        BackendMetrics::record_latency(BACKEND, "fetch_due", start.elapsed().as_secs_f64());

        Self::rows_to_items(rows)
    }

    async fn mark_sent(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<ScheduledNotification, StoreError> {
        let mut item = self.load(id).await?;
        if item.status != ScheduleStatus::Pending {
            return Err(not_pending(id, item.status));
        }

        item.apply_sent(at);
        self.write_back(&item, ScheduleStatus::Pending)
            .await
            .inspect_err(|_| BackendMetrics::record_error(BACKEND, "mark_sent"))?;

        Ok(item)
    }

    async fn record_failure(
        &self,
        id: Uuid,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<ScheduledNotification, StoreError> {
        let query = format!(
            r#"
            UPDATE scheduled_notifications
            SET status = 'failed', last_error = $2, failure_count = failure_count + 1,
                last_run_at = $3, updated_at = $3
            WHERE id = $1 AND status = 'pending'
            RETURNING {COLUMNS}
            "#
        );

        let row: Option<ScheduleRow> = sqlx::query_as(&query)
            .bind(id)
            .bind(error)
            .bind(at)
            .fetch_optional(&self.pool)
            .await
            .inspect_err(|_| BackendMetrics::record_error(BACKEND, "record_failure"))?;

        match row {
            Some(row) => row.try_into(),
            None => match self.get(id).await? {
                Some(item) => Err(not_pending(id, item.status)),
                None => Err(StoreError::NotFound(id.to_string())),
            },
        }
    }

    async fn schedule(
        &self,
        item: NewScheduledNotification,
    ) -> Result<ScheduledNotification, StoreError> {
        let item = ScheduledNotification::new(item);
        self.insert(&item).await?;

        tracing::debug!(schedule_id = %item.id, template_type = %item.template_type, "Scheduled notification stored");

        Ok(item)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ScheduledNotification>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM scheduled_notifications WHERE id = $1");
        let row: Option<ScheduleRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ScheduledNotification::try_from).transpose()
    }

    async fn list(
        &self,
        filter: &ScheduleFilter,
    ) -> Result<Vec<ScheduledNotification>, StoreError> {
        let query = format!(
            r#"SELECT {COLUMNS} FROM scheduled_notifications
            WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::TEXT IS NULL OR template_type = $2)
            ORDER BY due_at ASC, created_at ASC
            LIMIT $3"#
        );

        let limit = filter.limit.map(|l| l as i64).unwrap_or(i64::MAX);
        let rows: Vec<ScheduleRow> = sqlx::query_as(&query)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.template_type.as_deref())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Self::rows_to_items(rows)
    }

    async fn cancel(&self, id: Uuid) -> Result<ScheduledNotification, ScheduleError> {
        let mut item = self.get(id).await?.ok_or(ScheduleError::NotFound(id))?;
        let expected = item.status;

        item.apply_cancel(Utc::now())?;
        self.write_back(&item, expected).await?;

        Ok(item)
    }

    async fn requeue(
        &self,
        id: Uuid,
        due_at: Option<DateTime<Utc>>,
    ) -> Result<ScheduledNotification, ScheduleError> {
        let mut item = self.get(id).await?.ok_or(ScheduleError::NotFound(id))?;
        let expected = item.status;

        item.apply_requeue(due_at, Utc::now())?;
        self.write_back(&item, expected).await?;

        Ok(item)
    }

    fn backend_name(&self) -> &'static str {
        BACKEND
    }
}
