//! Channels that log instead of delivering

use async_trait::async_trait;

use super::channels::{ChannelError, DeliveryChannels, DeliveryCount};
use crate::domain::audience::Role;
use crate::domain::payload::DeliveryPayload;

/// Delivery channels that reach nobody.
///
/// Used when no push gateway is configured so the rest of the pipeline
/// (rendering, audience resolution, scheduling) stays observable.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopChannels;

#[async_trait]
impl DeliveryChannels for NoopChannels {
    async fn deliver_broadcast(
        &self,
        payload: &DeliveryPayload,
    ) -> Result<DeliveryCount, ChannelError> {
        tracing::info!(title = %payload.title, "noop broadcast");
        Ok(0)
    }

    async fn deliver_to_roles(
        &self,
        roles: &[Role],
        payload: &DeliveryPayload,
        tenant_id: Option<&str>,
    ) -> Result<DeliveryCount, ChannelError> {
        tracing::info!(title = %payload.title, ?roles, ?tenant_id, "noop role delivery");
        Ok(0)
    }

    async fn deliver_to_tags(
        &self,
        tags: &[String],
        payload: &DeliveryPayload,
    ) -> Result<DeliveryCount, ChannelError> {
        tracing::info!(title = %payload.title, ?tags, "noop tag delivery");
        Ok(0)
    }

    async fn deliver_to_users(
        &self,
        user_ids: &[String],
        payload: &DeliveryPayload,
    ) -> Result<DeliveryCount, ChannelError> {
        tracing::info!(title = %payload.title, users = user_ids.len(), "noop user delivery");
        Ok(0)
    }

    fn backend_name(&self) -> &'static str {
        "noop"
    }
}
