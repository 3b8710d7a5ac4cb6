//! PostgreSQL-backed template store.
//!
//! Table structure (see `migrations/`):
//! - `notification_templates` - one row per template type

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::store::TemplateStore;
use super::types::NotificationTemplate;
use crate::domain::storage::StoreError;

const SELECT_COLUMNS: &str = r#"
    SELECT template_type, title, body, audience, enabled, variables, description,
           icon, badge, image, url, created_at, updated_at
    FROM notification_templates
"#;

#[derive(Debug, sqlx::FromRow)]
struct TemplateRow {
    template_type: String,
    title: String,
    body: String,
    audience: Vec<String>,
    enabled: bool,
    variables: Vec<String>,
    description: Option<String>,
    icon: Option<String>,
    badge: Option<String>,
    image: Option<String>,
    url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TemplateRow> for NotificationTemplate {
    fn from(row: TemplateRow) -> Self {
        NotificationTemplate {
            template_type: row.template_type,
            title: row.title,
            body: row.body,
            audience: row.audience,
            enabled: row.enabled,
            variables: row.variables,
            description: row.description,
            icon: row.icon,
            badge: row.badge,
            image: row.image,
            url: row.url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Template store reading from PostgreSQL
pub struct PostgresTemplateStore {
    pool: PgPool,
}

impl PostgresTemplateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateStore for PostgresTemplateStore {
    async fn get_template(
        &self,
        template_type: &str,
    ) -> Result<Option<NotificationTemplate>, StoreError> {
        let query = format!("{SELECT_COLUMNS} WHERE template_type = $1");
        let row: Option<TemplateRow> = sqlx::query_as(&query)
            .bind(template_type)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(NotificationTemplate::from))
    }

    async fn list_templates(&self) -> Result<Vec<NotificationTemplate>, StoreError> {
        let query = format!("{SELECT_COLUMNS} ORDER BY template_type ASC");
        let rows: Vec<TemplateRow> = sqlx::query_as(&query).fetch_all(&self.pool).await?;

        tracing::trace!(count = rows.len(), "Templates loaded from PostgreSQL");

        Ok(rows.into_iter().map(NotificationTemplate::from).collect())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
