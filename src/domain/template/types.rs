//! Template types and error definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Template-specific error type
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Invalid template type: {0}")]
    InvalidType(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),
}

/// Result type for template operations
pub type TemplateResult<T> = Result<T, TemplateError>;

/// A notification template, keyed by its `type`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationTemplate {
    /// Unique template type (alphanumeric, dash, underscore)
    #[serde(rename = "type")]
    pub template_type: String,

    /// Title with {{variable}} placeholders
    #[serde(default)]
    pub title: String,

    /// Body with {{variable}} placeholders
    #[serde(default)]
    pub body: String,

    /// Default audience roles, applied in addition to the caller's roles
    #[serde(default)]
    pub audience: Vec<String>,

    /// Disabled templates never dispatch
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Declared variable names (informational)
    #[serde(default)]
    pub variables: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Creation timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_enabled() -> bool {
    true
}

impl NotificationTemplate {
    /// Create an enabled template with no default payload fields
    pub fn new(
        template_type: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            template_type: template_type.into(),
            title: title.into(),
            body: body.into(),
            audience: Vec::new(),
            enabled: true,
            variables: Vec::new(),
            description: None,
            icon: None,
            badge: None,
            image: None,
            url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the default audience roles
    pub fn with_audience<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audience = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Set the declared variable names
    pub fn with_variables<I, S>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variables = variables.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Validate the template
    pub fn validate(&self) -> TemplateResult<()> {
        if self.template_type.is_empty() || self.template_type.len() > 64 {
            return Err(TemplateError::InvalidType(
                "Type must be 1-64 characters".to_string(),
            ));
        }

        if !self
            .template_type
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            return Err(TemplateError::InvalidType(
                "Type must contain only alphanumeric, dash, or underscore".to_string(),
            ));
        }

        if self.title.len() > 256 {
            return Err(TemplateError::InvalidTemplate(
                "Title must be at most 256 characters".to_string(),
            ));
        }

        if self.variables.len() > 20 {
            return Err(TemplateError::InvalidTemplate(
                "At most 20 variables may be declared".to_string(),
            ));
        }

        Ok(())
    }
}

/// Response for listing templates
#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub templates: Vec<NotificationTemplate>,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_bad_type() {
        let template = NotificationTemplate::new("order new!", "t", "b");
        assert!(matches!(
            template.validate(),
            Err(TemplateError::InvalidType(_))
        ));

        let empty = NotificationTemplate::new("", "t", "b");
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_deserialize_defaults_enabled() {
        let template: NotificationTemplate = serde_json::from_value(serde_json::json!({
            "type": "order_new",
            "title": "Order {{order_id}}",
            "body": ""
        }))
        .unwrap();

        assert!(template.enabled);
        assert!(template.audience.is_empty());
        assert_eq!(template.template_type, "order_new");
    }
}
