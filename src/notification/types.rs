//! Request, outcome and error types for template dispatch

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::delivery::{DeliveryError, DeliveryReport};
use crate::domain::payload::{one_or_many, PayloadOverrides};
use crate::domain::storage::StoreError;

/// Request to send one templated notification
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendByTemplateRequest {
    #[serde(default, alias = "type")]
    pub template_type: String,

    /// Render variables for `{{key}}` placeholders
    #[serde(default)]
    pub variables: Map<String, Value>,

    #[serde(default, alias = "roles", deserialize_with = "one_or_many")]
    pub audience_roles: Vec<String>,

    #[serde(default, alias = "tags", deserialize_with = "one_or_many")]
    pub audience_tags: Vec<String>,

    #[serde(default, alias = "user_ids", deserialize_with = "one_or_many")]
    pub audience_user_ids: Vec<String>,

    #[serde(default)]
    pub payload_overrides: PayloadOverrides,

    /// Confines role deliveries (and `all`) to one tenant
    #[serde(default)]
    pub tenant_id: Option<String>,

    /// Resolve everything but deliver nothing
    #[serde(default)]
    pub dry_run: bool,

    /// Caller label recorded in the notification log
    #[serde(skip)]
    pub source: Option<String>,
}

impl SendByTemplateRequest {
    pub fn new(template_type: impl Into<String>) -> Self {
        Self {
            template_type: template_type.into(),
            ..Default::default()
        }
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audience_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audience_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_user_ids<I, S>(mut self, user_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audience_user_ids = user_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_overrides(mut self, overrides: PayloadOverrides) -> Self {
        self.payload_overrides = overrides;
        self
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Result of a dispatch that reached the delivery stage
#[derive(Debug, Clone, Serialize)]
pub struct SendOutcome {
    pub ok: bool,
    pub template_type: String,
    pub deliveries: Vec<DeliveryReport>,
    pub dry_run: bool,
}

/// Process-wide dry-run switch, injected at construction.
///
/// The effective flag for a call is the per-call flag OR the process-wide
/// flag, so a forced dry-run can never be turned off by a caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DryRunPolicy {
    process_wide: bool,
}

impl DryRunPolicy {
    pub fn new(process_wide: bool) -> Self {
        Self { process_wide }
    }

    /// Live delivery unless a call asks for dry-run
    pub fn live() -> Self {
        Self::new(false)
    }

    /// Every call is a dry-run
    pub fn forced() -> Self {
        Self::new(true)
    }

    pub fn is_forced(&self) -> bool {
        self.process_wide
    }

    pub fn resolve(&self, requested: bool) -> bool {
        requested || self.process_wide
    }
}

/// Template dispatch errors
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("template_type is required")]
    TemplateTypeRequired,

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Template is disabled: {0}")]
    TemplateDisabled(String),

    #[error("Template store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl DispatchError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::TemplateTypeRequired => "template_type_required",
            DispatchError::TemplateNotFound(_) => "template_not_found",
            DispatchError::TemplateDisabled(_) => "template_disabled",
            DispatchError::Store(_) => "store_error",
            DispatchError::Delivery(_) => "all_channels_failed",
        }
    }
}
