//! Audience fan-out across the delivery channels

use std::sync::Arc;

use super::channels::{DeliveryChannel, DeliveryChannels};
use super::report::{DeliveryError, DeliveryReport};
use crate::domain::audience::{AudienceSpec, Role};
use crate::domain::payload::DeliveryPayload;
use crate::metrics::DispatchMetrics;

/// Drives one delivery across broadcast, roles, tags and users.
///
/// Steps run in that order and each runs regardless of earlier failures.
pub struct DeliveryFanOut {
    channels: Arc<dyn DeliveryChannels>,
}

impl DeliveryFanOut {
    pub fn new(channels: Arc<dyn DeliveryChannels>) -> Self {
        Self { channels }
    }

    pub fn channels(&self) -> &Arc<dyn DeliveryChannels> {
        &self.channels
    }

    /// Deliver `payload` to `audience`.
    ///
    /// Returns one report per attempted step. Fails only when at least one
    /// step ran and every step failed.
    #[tracing::instrument(
        name = "fan_out",
        skip_all,
        fields(backend = self.channels.backend_name(), tenant_id = ?tenant_id)
    )]
    pub async fn deliver(
        &self,
        audience: &AudienceSpec,
        payload: &DeliveryPayload,
        tenant_id: Option<&str>,
    ) -> Result<Vec<DeliveryReport>, DeliveryError> {
        let mut reports = Vec::new();
        let mut roles = audience.roles.clone();

        if audience.has_broadcast() {
            let report = match tenant_id {
                Some(tenant) => {
                    let result = self
                        .channels
                        .deliver_to_roles(&Role::FIXED, payload, Some(tenant))
                        .await;
                    let mut report = DeliveryReport::from_result(
                        DeliveryChannel::Broadcast,
                        vec![Role::All.to_string()],
                        Some(tenant),
                        result,
                    );
                    report.tenant_scoped = true;
                    report
                }
                None => DeliveryReport::from_result(
                    DeliveryChannel::Broadcast,
                    vec![Role::All.to_string()],
                    None,
                    self.channels.deliver_broadcast(payload).await,
                ),
            };
            reports.push(record(report));

            // The broadcast covered every fixed role
            roles.clear();
        }

        if !roles.is_empty() {
            let result = self
                .channels
                .deliver_to_roles(&roles, payload, tenant_id)
                .await;
            let targets = roles.iter().map(Role::to_string).collect();
            reports.push(record(DeliveryReport::from_result(
                DeliveryChannel::Roles,
                targets,
                tenant_id,
                result,
            )));
        }

        if !audience.tags.is_empty() {
            let result = self.channels.deliver_to_tags(&audience.tags, payload).await;
            reports.push(record(DeliveryReport::from_result(
                DeliveryChannel::Tags,
                audience.tags.clone(),
                None,
                result,
            )));
        }

        if !audience.user_ids.is_empty() {
            let result = self
                .channels
                .deliver_to_users(&audience.user_ids, payload)
                .await;
            reports.push(record(DeliveryReport::from_result(
                DeliveryChannel::Users,
                audience.user_ids.clone(),
                None,
                result,
            )));
        }

        if reports.is_empty() {
            tracing::warn!(
                template_type = payload.template_type().unwrap_or_default(),
                "Audience resolved to no targets, nothing delivered"
            );
            return Ok(reports);
        }

        if reports.iter().all(|r| !r.is_success()) {
            return Err(DeliveryError::AllChannelsFailed { reports });
        }

        Ok(reports)
    }
}

fn record(report: DeliveryReport) -> DeliveryReport {
    let channel = report.channel.as_str();
    match &report.error {
        None => {
            DispatchMetrics::record_channel_delivered(channel, report.count);
            tracing::debug!(channel, count = report.count, "Channel delivered");
        }
        Some(error) => {
            DispatchMetrics::record_channel_failed(channel);
            tracing::warn!(channel, error = %error, "Channel delivery failed");
        }
    }
    report
}
