//! Store error type and the template/schedule store factory

use std::sync::Arc;

use thiserror::Error;

use crate::config::StorageConfig;
use crate::domain::schedule::{MemoryScheduleStore, PostgresScheduleStore, ScheduleStore};
use crate::domain::template::{MemoryTemplateStore, PostgresTemplateStore, TemplateStore};
use crate::postgres::PostgresPool;

/// Store adapter error type
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid record: {0}")]
    Invalid(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Template and schedule stores sharing one backend
#[derive(Clone)]
pub struct StoreBackends {
    pub templates: Arc<dyn TemplateStore>,
    pub schedules: Arc<dyn ScheduleStore>,
}

impl StoreBackends {
    /// In-memory stores seeded with the default template catalog
    pub fn memory() -> Self {
        Self {
            templates: Arc::new(MemoryTemplateStore::with_default_templates()),
            schedules: Arc::new(MemoryScheduleStore::new()),
        }
    }
}

/// Create the stores named by `config.backend`.
///
/// - `"postgres"`: PostgreSQL stores when a pool is provided
/// - `"memory"` (default): in-memory stores with the default catalog
///
/// A postgres request without a pool falls back to memory.
pub fn create_store_backends(
    config: &StorageConfig,
    postgres_pool: Option<&PostgresPool>,
) -> StoreBackends {
    match (config.backend.as_str(), postgres_pool) {
        ("postgres", Some(pool)) => {
            tracing::info!(
                backend = "postgres",
                url = %pool.database_url_masked(),
                "Creating PostgreSQL template and schedule stores"
            );
            StoreBackends {
                templates: Arc::new(PostgresTemplateStore::new(pool.pool().clone())),
                schedules: Arc::new(PostgresScheduleStore::new(pool.pool().clone())),
            }
        }
        ("postgres", None) => {
            tracing::warn!(
                "PostgreSQL storage requested but no pool available, falling back to memory"
            );
            StoreBackends::memory()
        }
        (backend, _) => {
            if backend != "memory" {
                tracing::warn!(backend = %backend, "Unknown storage backend, using memory");
            }
            tracing::info!(backend = "memory", "Creating in-memory template and schedule stores");
            StoreBackends::memory()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backends() {
        let config = StorageConfig {
            backend: "memory".into(),
        };
        let stores = create_store_backends(&config, None);

        assert_eq!(stores.templates.backend_name(), "memory");
        assert_eq!(stores.schedules.backend_name(), "memory");
        assert!(stores.templates.get_template("order_new").await.unwrap().is_some());
    }

    #[test]
    fn test_postgres_without_pool_falls_back() {
        let config = StorageConfig {
            backend: "postgres".into(),
        };
        let stores = create_store_backends(&config, None);
        assert_eq!(stores.schedules.backend_name(), "memory");
    }
}
