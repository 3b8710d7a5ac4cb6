//! Notification log.
//!
//! Every `send_by_template` outcome is summarized into a `NotificationLogEntry`
//! and handed to a `NotificationLogSink`. The in-memory sink keeps a bounded
//! window of recent entries and derives statistics from it.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::audience::AudienceSpec;
use crate::domain::delivery::{DeliveryChannel, DeliveryReport};

/// Maximum number of audience targets stored per entry
pub const MAX_LOGGED_TARGETS: usize = 100;

/// Default number of entries the memory sink retains
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

const TOP_TEMPLATES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Sent,
    Failed,
    DryRun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudienceType {
    Broadcast,
    Roles,
    Tags,
    Users,
}

/// Summary of one dispatch
#[derive(Debug, Clone, Serialize)]
pub struct NotificationLogEntry {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub template_type: String,
    pub title: String,
    pub body: String,
    pub audience_type: AudienceType,
    pub audience_targets: Vec<String>,
    pub recipient_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_user_id: Option<String>,
    pub status: LogStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Where the send came from: http, scheduler, redis, ...
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl NotificationLogEntry {
    /// Summarize a dispatch from its audience and delivery reports.
    ///
    /// The audience type is the widest channel that ran: broadcast, then
    /// roles, then tags, then users. Without reports it falls back to the
    /// resolved audience.
    pub fn from_dispatch(
        template_type: &str,
        title: &str,
        body: &str,
        audience: &AudienceSpec,
        deliveries: &[DeliveryReport],
        status: LogStatus,
    ) -> Self {
        let mut audience_type = AudienceType::Users;
        let mut targets: Vec<String> = Vec::new();
        let mut recipient_count = 0;

        for report in deliveries {
            recipient_count += report.count;
            match report.channel {
                DeliveryChannel::Broadcast => {
                    audience_type = AudienceType::Broadcast;
                    targets = vec!["all".to_string()];
                }
                DeliveryChannel::Roles if audience_type != AudienceType::Broadcast => {
                    audience_type = AudienceType::Roles;
                    merge_targets(&mut targets, &report.targets);
                }
                DeliveryChannel::Tags if audience_type == AudienceType::Users => {
                    audience_type = AudienceType::Tags;
                    merge_targets(&mut targets, &report.targets);
                }
                DeliveryChannel::Users => merge_targets(&mut targets, &report.targets),
                DeliveryChannel::DryRun => {
                    (audience_type, targets) = audience_summary(audience);
                }
                _ => {}
            }
        }

        if deliveries.is_empty() {
            (audience_type, targets) = audience_summary(audience);
        }

        targets.truncate(MAX_LOGGED_TARGETS);

        let recipient_user_id = match audience.user_ids.as_slice() {
            [single] => Some(single.clone()),
            _ => None,
        };

        Self {
            id: Uuid::new_v4(),
            tenant_id: None,
            template_type: template_type.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            audience_type,
            audience_targets: targets,
            recipient_count,
            recipient_user_id,
            status,
            error_message: None,
            source: "system".to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn with_tenant(mut self, tenant_id: Option<&str>) -> Self {
        self.tenant_id = tenant_id.map(str::to_string);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error_message = Some(error.into());
        self
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }
}

fn merge_targets(targets: &mut Vec<String>, extra: &[String]) {
    for target in extra {
        if !targets.contains(target) {
            targets.push(target.clone());
        }
    }
}

fn audience_summary(audience: &AudienceSpec) -> (AudienceType, Vec<String>) {
    if !audience.roles.is_empty() {
        (AudienceType::Roles, audience.role_names())
    } else if !audience.tags.is_empty() {
        (AudienceType::Tags, audience.tags.clone())
    } else {
        (AudienceType::Users, audience.user_ids.clone())
    }
}

/// Destination for notification log entries.
///
/// Recording never fails the dispatch; implementations log their own errors.
#[async_trait]
pub trait NotificationLogSink: Send + Sync {
    async fn record(&self, entry: NotificationLogEntry);
}

/// Filter for reading recent log entries
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogFilter {
    pub tenant_id: Option<String>,
    pub template_type: Option<String>,
    pub status: Option<LogStatus>,
    pub limit: Option<usize>,
}

impl LogFilter {
    fn matches(&self, entry: &NotificationLogEntry) -> bool {
        self.tenant_id
            .as_deref()
            .map_or(true, |t| entry.tenant_id.as_deref() == Some(t))
            && self
                .template_type
                .as_deref()
                .map_or(true, |t| entry.template_type == t)
            && self.status.map_or(true, |s| entry.status == s)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TemplateLogStats {
    pub template_type: String,
    pub count: u64,
    pub recipients: u64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct LogStats {
    pub total: u64,
    pub sent: u64,
    pub failed: u64,
    pub dry_run: u64,
    pub recipients: u64,
    /// Most used templates, at most ten
    pub by_template: Vec<TemplateLogStats>,
}

/// Bounded in-memory log. Oldest entries are evicted first.
pub struct MemoryLogSink {
    entries: RwLock<VecDeque<NotificationLogEntry>>,
    capacity: usize,
}

impl Default for MemoryLogSink {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl MemoryLogSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY))),
            capacity: capacity.max(1),
        }
    }

    /// Matching entries, newest first
    pub async fn recent(&self, filter: &LogFilter) -> Vec<NotificationLogEntry> {
        let limit = filter.limit.unwrap_or(50);
        self.entries
            .read()
            .await
            .iter()
            .rev()
            .filter(|entry| filter.matches(entry))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Aggregate statistics over retained entries, optionally for one tenant
    pub async fn stats(&self, tenant_id: Option<&str>) -> LogStats {
        let entries = self.entries.read().await;
        let mut stats = LogStats::default();
        let mut per_template: HashMap<&str, (u64, u64)> = HashMap::new();

        for entry in entries
            .iter()
            .filter(|e| tenant_id.map_or(true, |t| e.tenant_id.as_deref() == Some(t)))
        {
            let recipients = entry.recipient_count as u64;
            stats.total += 1;
            stats.recipients += recipients;
            match entry.status {
                LogStatus::Sent => stats.sent += 1,
                LogStatus::Failed => stats.failed += 1,
                LogStatus::DryRun => stats.dry_run += 1,
            }

            let slot = per_template.entry(entry.template_type.as_str()).or_default();
            slot.0 += 1;
            slot.1 += recipients;
        }

        let mut by_template: Vec<_> = per_template
            .into_iter()
            .map(|(template_type, (count, recipients))| TemplateLogStats {
                template_type: template_type.to_string(),
                count,
                recipients,
            })
            .collect();
        by_template.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.template_type.cmp(&b.template_type))
        });
        by_template.truncate(TOP_TEMPLATES);
        stats.by_template = by_template;

        stats
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl NotificationLogSink for MemoryLogSink {
    async fn record(&self, entry: NotificationLogEntry) {
        tracing::info!(
            template_type = %entry.template_type,
            status = ?entry.status,
            recipient_count = entry.recipient_count,
            audience_type = ?entry.audience_type,
            source = %entry.source,
            "Notification logged"
        );

        let mut entries = self.entries.write().await;
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audience::Role;
    use crate::domain::delivery::ChannelError;

    fn report(channel: DeliveryChannel, targets: &[&str], count: usize) -> DeliveryReport {
        DeliveryReport::from_result(
            channel,
            targets.iter().map(|s| s.to_string()).collect(),
            None,
            Ok(count),
        )
    }

    fn entry(template_type: &str, status: LogStatus, recipients: usize) -> NotificationLogEntry {
        let deliveries = [report(DeliveryChannel::Users, &["u1"], recipients)];
        NotificationLogEntry::from_dispatch(
            template_type,
            "t",
            "b",
            &AudienceSpec::default(),
            &deliveries,
            status,
        )
    }

    #[test]
    fn test_audience_type_prefers_widest_channel() {
        let audience = AudienceSpec {
            roles: vec![Role::Admin],
            tags: vec!["vip".into()],
            user_ids: vec!["u1".into()],
        };
        let deliveries = [
            report(DeliveryChannel::Roles, &["admin"], 2),
            report(DeliveryChannel::Tags, &["vip"], 3),
            report(DeliveryChannel::Users, &["u1"], 1),
        ];

        let entry = NotificationLogEntry::from_dispatch(
            "order_new", "t", "b", &audience, &deliveries, LogStatus::Sent,
        );

        assert_eq!(entry.audience_type, AudienceType::Roles);
        assert_eq!(entry.audience_targets, vec!["admin", "u1"]);
        assert_eq!(entry.recipient_count, 6);
        assert_eq!(entry.recipient_user_id.as_deref(), Some("u1"));
    }

    #[test]
    fn test_broadcast_and_failed_channels() {
        let deliveries = [
            report(DeliveryChannel::Broadcast, &["all"], 40),
            DeliveryReport::from_result(
                DeliveryChannel::Users,
                vec!["u9".into()],
                None,
                Err(ChannelError::Failed("x".into())),
            ),
        ];

        let entry = NotificationLogEntry::from_dispatch(
            "welcome_user",
            "t",
            "b",
            &AudienceSpec::default(),
            &deliveries,
            LogStatus::Sent,
        );

        assert_eq!(entry.audience_type, AudienceType::Broadcast);
        assert_eq!(entry.audience_targets, vec!["all", "u9"]);
        assert_eq!(entry.recipient_count, 40);
    }

    #[test]
    fn test_dry_run_uses_resolved_audience() {
        let audience = AudienceSpec {
            tags: vec!["vip".into()],
            ..Default::default()
        };
        let deliveries = [DeliveryReport::dry_run(audience.clone())];

        let entry = NotificationLogEntry::from_dispatch(
            "t", "t", "b", &audience, &deliveries, LogStatus::DryRun,
        );

        assert_eq!(entry.audience_type, AudienceType::Tags);
        assert_eq!(entry.audience_targets, vec!["vip"]);
        assert_eq!(entry.recipient_count, 0);
    }

    #[test]
    fn test_targets_capped() {
        let audience = AudienceSpec {
            user_ids: (0..250).map(|i| format!("u{}", i)).collect(),
            ..Default::default()
        };

        let entry =
            NotificationLogEntry::from_dispatch("t", "t", "b", &audience, &[], LogStatus::Failed);

        assert_eq!(entry.audience_targets.len(), MAX_LOGGED_TARGETS);
        assert!(entry.recipient_user_id.is_none());
    }

    #[tokio::test]
    async fn test_memory_sink_stats_and_eviction() {
        let sink = MemoryLogSink::new(3);
        sink.record(entry("old", LogStatus::Sent, 100)).await;
        sink.record(entry("order_new", LogStatus::Sent, 2)).await;
        sink.record(entry("order_new", LogStatus::Failed, 0)).await;
        sink.record(entry("welcome_user", LogStatus::DryRun, 0)).await;

        assert_eq!(sink.len().await, 3);

        let stats = sink.stats(None).await;
        assert_eq!(stats.total, 3);
        assert_eq!(stats.sent, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.dry_run, 1);
        assert_eq!(stats.recipients, 2);
        assert_eq!(stats.by_template[0].template_type, "order_new");
        assert_eq!(stats.by_template[0].count, 2);
    }

    #[tokio::test]
    async fn test_recent_filters_newest_first() {
        let sink = MemoryLogSink::default();
        sink.record(entry("a", LogStatus::Sent, 1).with_tenant(Some("T1"))).await;
        sink.record(entry("b", LogStatus::Sent, 1).with_tenant(Some("T2"))).await;
        sink.record(entry("c", LogStatus::Failed, 0).with_tenant(Some("T1"))).await;

        let t1 = sink
            .recent(&LogFilter {
                tenant_id: Some("T1".into()),
                ..Default::default()
            })
            .await;
        let types: Vec<_> = t1.iter().map(|e| e.template_type.as_str()).collect();
        assert_eq!(types, vec!["c", "a"]);

        let stats = sink.stats(Some("T2")).await;
        assert_eq!(stats.total, 1);
    }
}
