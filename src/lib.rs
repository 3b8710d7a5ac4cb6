// Infrastructure layer (shared components)
pub mod infrastructure;

pub use infrastructure::config;
pub use infrastructure::error;
pub use infrastructure::metrics;
pub use infrastructure::postgres;

// Domain layer (business logic)
pub mod domain;
pub mod notification;

// Application layer
pub mod api;
pub mod server;
pub mod triggers;

// Supporting modules
pub mod tasks;
pub mod telemetry;
