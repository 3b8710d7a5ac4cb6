//! Scheduled notifications.
//!
//! Items live in a `ScheduleStore` (memory or PostgreSQL). The driver in
//! `tasks::scheduler` dispatches due items; the admin operations here create,
//! cancel and requeue them.

mod memory_store;
pub mod postgres_store;
mod store;
mod types;

pub use memory_store::MemoryScheduleStore;
pub use postgres_store::PostgresScheduleStore;
pub use store::ScheduleStore;
pub use types::{
    NewScheduledNotification, Recurrence, RecurrenceUnit, ScheduleError, ScheduleFilter,
    ScheduleRequest, ScheduleStatus, ScheduledNotification,
};

use crate::domain::audience::Role;
use crate::domain::template::TemplateStore;

/// Validate a schedule request against the template store.
///
/// The template must exist and be enabled. Unknown role names are dropped;
/// when no known role remains, the template's default audience is stored.
pub async fn prepare_schedule(
    request: ScheduleRequest,
    templates: &dyn TemplateStore,
) -> Result<NewScheduledNotification, ScheduleError> {
    let template_type = request.template_type.trim().to_string();
    if template_type.is_empty() {
        return Err(ScheduleError::TemplateTypeRequired);
    }

    let template = templates
        .get_template(&template_type)
        .await?
        .ok_or_else(|| ScheduleError::TemplateNotFound(template_type.clone()))?;

    if !template.enabled {
        return Err(ScheduleError::TemplateDisabled(template_type));
    }

    if let Some(recurrence) = &request.recurrence {
        recurrence.validate()?;
    }

    let mut audience: Vec<String> = Vec::new();
    for raw in &request.audience {
        match Role::parse(raw) {
            Some(role) if !audience.iter().any(|r| r == role.as_str()) => {
                audience.push(role.as_str().to_string())
            }
            Some(_) => {}
            None => tracing::debug!(role = %raw, "Dropping unknown schedule audience role"),
        }
    }
    if audience.is_empty() {
        audience = template.audience.clone();
    }

    Ok(NewScheduledNotification {
        template_type,
        due_at: request.due_at,
        audience,
        payload_overrides: request.payload_overrides,
        tenant_id: request.tenant_id.filter(|t| !t.trim().is_empty()),
        recurrence: request.recurrence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::template::{MemoryTemplateStore, NotificationTemplate};
    use chrono::Utc;

    fn request(template_type: &str, audience: &[&str]) -> ScheduleRequest {
        ScheduleRequest {
            template_type: template_type.to_string(),
            due_at: Utc::now(),
            audience: audience.iter().map(|s| s.to_string()).collect(),
            payload_overrides: Default::default(),
            tenant_id: None,
            recurrence: None,
        }
    }

    #[tokio::test]
    async fn test_prepare_falls_back_to_template_audience() {
        let templates = MemoryTemplateStore::with_default_templates();
        let prepared = prepare_schedule(request("order_new", &[]), &templates)
            .await
            .unwrap();

        assert_eq!(prepared.audience, vec!["admin", "business_admin"]);
    }

    #[tokio::test]
    async fn test_prepare_keeps_explicit_audience() {
        let templates = MemoryTemplateStore::with_default_templates();
        let prepared = prepare_schedule(request("order_new", &[" Agent "]), &templates)
            .await
            .unwrap();

        assert_eq!(prepared.audience, vec!["agent"]);
    }

    #[tokio::test]
    async fn test_prepare_rejects_bad_templates() {
        let templates = MemoryTemplateStore::new();
        templates
            .upsert(NotificationTemplate::new("off", "t", "b").disabled())
            .unwrap();

        assert!(matches!(
            prepare_schedule(request("  ", &[]), &templates).await,
            Err(ScheduleError::TemplateTypeRequired)
        ));
        assert!(matches!(
            prepare_schedule(request("missing", &[]), &templates).await,
            Err(ScheduleError::TemplateNotFound(_))
        ));
        assert!(matches!(
            prepare_schedule(request("off", &[]), &templates).await,
            Err(ScheduleError::TemplateDisabled(_))
        ));
    }

    #[tokio::test]
    async fn test_prepare_rejects_zero_interval() {
        let templates = MemoryTemplateStore::with_default_templates();
        let mut req = request("welcome_user", &[]);
        req.recurrence = Some(Recurrence::Interval {
            every: 0,
            unit: RecurrenceUnit::Week,
        });

        assert!(matches!(
            prepare_schedule(req, &templates).await,
            Err(ScheduleError::InvalidRecurrence(_))
        ));
    }

    #[tokio::test]
    async fn test_prepare_drops_unknown_roles() {
        let templates = MemoryTemplateStore::with_default_templates();

        let mixed = prepare_schedule(
            request("order_new", &["superuser", "Agent", "agent", " ALL "]),
            &templates,
        )
        .await
        .unwrap();
        assert_eq!(mixed.audience, vec!["agent", "all"]);

        let unknown_only = prepare_schedule(request("order_new", &["superuser", ""]), &templates)
            .await
            .unwrap();
        assert_eq!(unknown_only.audience, vec!["admin", "business_admin"]);
    }

    #[tokio::test]
    async fn test_prepare_rejects_oversized_interval() {
        let templates = MemoryTemplateStore::with_default_templates();
        let mut req = request("welcome_user", &[]);
        req.recurrence = Some(Recurrence::Interval {
            every: u32::MAX,
            unit: RecurrenceUnit::Day,
        });

        assert!(matches!(
            prepare_schedule(req, &templates).await,
            Err(ScheduleError::InvalidRecurrence(_))
        ));
    }
}
