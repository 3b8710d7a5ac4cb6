//! Notification template system.
//!
//! This module provides:
//! - Template definition with `{{variable}}` placeholders in title and body
//! - The `TemplateStore` trait with in-memory and PostgreSQL adapters
//! - Placeholder rendering that leaves unknown keys visible
//!
//! # Example
//!
//! ```ignore
//! let store = MemoryTemplateStore::with_default_templates();
//! let template = store.get_template("order_new").await?.unwrap();
//!
//! let variables = json!({ "order_id": "ORD-123" });
//! let title = render_template_string(&template.title, variables.as_object().unwrap());
//! ```

mod catalog;
pub mod postgres_store;
mod render;
mod store;
mod types;

pub use catalog::default_templates;
pub use postgres_store::PostgresTemplateStore;
pub use render::{render, render_content, render_template_string, RenderedContent};
pub use store::{MemoryTemplateStore, TemplateStore};
pub use types::{
    NotificationTemplate, TemplateError, TemplateListResponse, TemplateResult,
};
