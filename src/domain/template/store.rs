//! Template store abstraction and the in-memory adapter

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use super::catalog::default_templates;
use super::types::{NotificationTemplate, TemplateResult};
use crate::domain::storage::StoreError;

/// Read access to notification templates.
///
/// The dispatch pipeline performs exactly one `get_template` per send and
/// never writes through this trait.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Look up a template by type. `Ok(None)` when no such template exists.
    async fn get_template(
        &self,
        template_type: &str,
    ) -> Result<Option<NotificationTemplate>, StoreError>;

    /// List all templates, ordered by type
    async fn list_templates(&self) -> Result<Vec<NotificationTemplate>, StoreError>;

    /// Backend name for logs and health output
    fn backend_name(&self) -> &'static str;
}

/// In-memory template storage
pub struct MemoryTemplateStore {
    templates: DashMap<String, NotificationTemplate>,
}

impl Default for MemoryTemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTemplateStore {
    /// Create an empty template store
    pub fn new() -> Self {
        Self {
            templates: DashMap::new(),
        }
    }

    /// Create a store seeded with the default catalog
    pub fn with_default_templates() -> Self {
        let store = Self::new();
        for template in default_templates() {
            store
                .templates
                .insert(template.template_type.clone(), template);
        }
        store
    }

    /// Insert or replace a template
    pub fn upsert(&self, mut template: NotificationTemplate) -> TemplateResult<NotificationTemplate> {
        template.validate()?;

        if let Some(existing) = self.templates.get(&template.template_type) {
            template.created_at = existing.created_at;
        }
        template.updated_at = Utc::now();

        self.templates
            .insert(template.template_type.clone(), template.clone());

        Ok(template)
    }

    /// Remove a template by type. Returns whether it existed.
    pub fn remove(&self, template_type: &str) -> bool {
        self.templates.remove(template_type).is_some()
    }

    /// Get the number of templates
    pub fn count(&self) -> usize {
        self.templates.len()
    }
}

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    async fn get_template(
        &self,
        template_type: &str,
    ) -> Result<Option<NotificationTemplate>, StoreError> {
        Ok(self.templates.get(template_type).map(|t| t.clone()))
    }

    async fn list_templates(&self) -> Result<Vec<NotificationTemplate>, StoreError> {
        let mut templates: Vec<_> = self
            .templates
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        templates.sort_by(|a, b| a.template_type.cmp(&b.template_type));
        Ok(templates)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
