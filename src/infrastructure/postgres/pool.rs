//! PostgreSQL connection pool.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;

use crate::config::DatabaseConfig;

#[derive(Debug, Error)]
pub enum PostgresPoolError {
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Shared pool used by the template and schedule stores
#[derive(Clone)]
pub struct PostgresPool {
    pool: PgPool,
    database_url: String,
}

impl PostgresPool {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, PostgresPoolError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds as u64))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds as u64))
            .connect(&config.url)
            .await?;

        let pool = Self {
            pool,
            database_url: config.url.clone(),
        };

        tracing::info!(
            url = %pool.database_url_masked(),
            pool_size = config.pool_size,
            "PostgreSQL connection pool created"
        );

        Ok(pool)
    }

    /// Apply the bundled migrations
    pub async fn migrate(&self) -> Result<(), PostgresPoolError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("PostgreSQL migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round-trip check used by the health endpoint
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    /// Get the database URL (masked for logging).
    pub fn database_url_masked(&self) -> String {
        mask_database_url(&self.database_url)
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("PostgreSQL connection pool closed");
    }
}

/// Replace the password in a connection URL with `***`
pub fn mask_database_url(url: &str) -> String {
    let start = url.find("://").map_or(0, |i| i + 3);
    if let Some(at_pos) = url[start..].rfind('@').map(|i| i + start) {
        if let Some(colon_pos) = url[start..at_pos].find(':').map(|i| i + start) {
            return format!("{}***{}", &url[..colon_pos + 1], &url[at_pos..]);
        }
    }
    url.to_string()
}
