//! Infrastructure layer modules
//!
//! - `config`: Application configuration and settings
//! - `error`: HTTP error mapping
//! - `metrics`: Prometheus metrics helpers
//! - `postgres`: PostgreSQL connection pool

pub mod config;
pub mod error;
pub mod metrics;
pub mod postgres;
