//! Per-channel delivery reports

use serde::Serialize;
use thiserror::Error;

use super::channels::{ChannelError, DeliveryChannel, DeliveryCount};
use crate::domain::audience::AudienceSpec;

/// Outcome of one fan-out step, or the single dry-run entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryReport {
    pub channel: DeliveryChannel,

    /// Role names, tags or user IDs the step targeted
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,

    pub count: DeliveryCount,

    /// Set on a broadcast that was confined to one tenant
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub tenant_scoped: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Resolved audience; only present on the dry-run entry
    #[serde(flatten)]
    pub audience: Option<AudienceSpec>,
}

impl DeliveryReport {
    /// Build the report for a finished channel call
    pub fn from_result(
        channel: DeliveryChannel,
        targets: Vec<String>,
        tenant_id: Option<&str>,
        result: Result<DeliveryCount, ChannelError>,
    ) -> Self {
        let (count, error) = match result {
            Ok(count) => (count, None),
            Err(e) => (0, Some(e.to_string())),
        };

        Self {
            channel,
            targets,
            count,
            tenant_scoped: false,
            tenant_id: tenant_id.map(str::to_string),
            error,
            audience: None,
        }
    }

    /// The single report returned instead of deliveries in dry-run mode
    pub fn dry_run(audience: AudienceSpec) -> Self {
        Self {
            channel: DeliveryChannel::DryRun,
            targets: Vec::new(),
            count: 0,
            tenant_scoped: false,
            tenant_id: None,
            error: None,
            audience: Some(audience),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Fan-out level errors
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("All {} delivery channels failed: {}", .reports.len(), summarize(.reports))]
    AllChannelsFailed { reports: Vec<DeliveryReport> },
}

fn summarize(reports: &[DeliveryReport]) -> String {
    reports
        .iter()
        .map(|r| format!("{}: {}", r.channel, r.error.as_deref().unwrap_or("unknown")))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audience::Role;
    use serde_json::json;

    #[test]
    fn test_report_from_error() {
        let report = DeliveryReport::from_result(
            DeliveryChannel::Tags,
            vec!["vip".into()],
            None,
            Err(ChannelError::Unavailable("down".into())),
        );

        assert!(!report.is_success());
        assert_eq!(report.count, 0);
        assert_eq!(report.error.as_deref(), Some("Channel unavailable: down"));
    }

    #[test]
    fn test_dry_run_report_shape() {
        let report = DeliveryReport::dry_run(AudienceSpec {
            roles: vec![Role::Admin],
            tags: vec!["vip".into()],
            user_ids: vec![],
        });

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            json!({
                "channel": "dry_run",
                "count": 0,
                "roles": ["admin"],
                "tags": ["vip"],
                "user_ids": []
            })
        );
    }

    #[test]
    fn test_all_channels_failed_message() {
        let err = DeliveryError::AllChannelsFailed {
            reports: vec![DeliveryReport::from_result(
                DeliveryChannel::Users,
                vec!["u1".into()],
                None,
                Err(ChannelError::Failed("timeout".into())),
            )],
        };

        assert_eq!(
            err.to_string(),
            "All 1 delivery channels failed: users: Delivery failed: timeout"
        );
    }
}
