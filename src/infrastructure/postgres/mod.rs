//! PostgreSQL connection pooling for the persistent stores.

pub mod pool;

pub use pool::{mask_database_url, PostgresPool, PostgresPoolError};
