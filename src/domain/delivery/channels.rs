//! Delivery channel abstraction.
//!
//! A `DeliveryChannels` implementation owns subscription lookup and transport
//! for the four audience kinds. The dispatcher only sees per-call counts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::audience::Role;
use crate::domain::payload::DeliveryPayload;

/// Number of recipients a channel call reached
pub type DeliveryCount = usize;

/// Errors returned by a single channel call
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway rejected {channel} delivery with status {status}")]
    Rejected { channel: String, status: u16 },

    #[error("Channel unavailable: {0}")]
    Unavailable(String),

    #[error("Delivery failed: {0}")]
    Failed(String),
}

/// Which step of the fan-out produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryChannel {
    Broadcast,
    Roles,
    Tags,
    Users,
    DryRun,
}

impl DeliveryChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryChannel::Broadcast => "broadcast",
            DeliveryChannel::Roles => "roles",
            DeliveryChannel::Tags => "tags",
            DeliveryChannel::Users => "users",
            DeliveryChannel::DryRun => "dry_run",
        }
    }
}

impl std::fmt::Display for DeliveryChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport primitives the fan-out engine drives
#[async_trait]
pub trait DeliveryChannels: Send + Sync {
    /// Deliver to every subscriber
    async fn deliver_broadcast(
        &self,
        payload: &DeliveryPayload,
    ) -> Result<DeliveryCount, ChannelError>;

    /// Deliver to subscribers holding any of `roles`, within `tenant_id` when given
    async fn deliver_to_roles(
        &self,
        roles: &[Role],
        payload: &DeliveryPayload,
        tenant_id: Option<&str>,
    ) -> Result<DeliveryCount, ChannelError>;

    /// Deliver to subscribers carrying any of `tags`
    async fn deliver_to_tags(
        &self,
        tags: &[String],
        payload: &DeliveryPayload,
    ) -> Result<DeliveryCount, ChannelError>;

    /// Deliver to the given user IDs
    async fn deliver_to_users(
        &self,
        user_ids: &[String],
        payload: &DeliveryPayload,
    ) -> Result<DeliveryCount, ChannelError>;

    /// Backend name for logs and health output
    fn backend_name(&self) -> &'static str;
}
