//! HTTP push gateway channels.
//!
//! Each channel call is one `POST {base_url}/{channel}` with body
//! `{"channel", "targets", "tenantId", "payload"}`. The gateway answers
//! `{"delivered": n}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::channels::{ChannelError, DeliveryChannels, DeliveryCount};
use crate::domain::audience::Role;
use crate::domain::payload::DeliveryPayload;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GatewayRequest<'a> {
    channel: &'a str,
    targets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tenant_id: Option<&'a str>,
    payload: &'a DeliveryPayload,
}

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    #[serde(default)]
    delivered: DeliveryCount,
}

/// Delivery channels backed by an HTTP push gateway
pub struct HttpPushGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPushGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post(
        &self,
        channel: &str,
        targets: Vec<String>,
        tenant_id: Option<&str>,
        payload: &DeliveryPayload,
    ) -> Result<DeliveryCount, ChannelError> {
        let url = format!("{}/{}", self.base_url, channel);
        let body = GatewayRequest {
            channel,
            targets,
            tenant_id,
            payload,
        };

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChannelError::Rejected {
                channel: channel.to_string(),
                status: status.as_u16(),
            });
        }

        let parsed: GatewayResponse = response.json().await?;

        tracing::debug!(channel, url = %url, delivered = parsed.delivered, "Push gateway accepted delivery");

        Ok(parsed.delivered)
    }
}

#[async_trait]
impl DeliveryChannels for HttpPushGateway {
    async fn deliver_broadcast(
        &self,
        payload: &DeliveryPayload,
    ) -> Result<DeliveryCount, ChannelError> {
        self.post("broadcast", Vec::new(), None, payload).await
    }

    async fn deliver_to_roles(
        &self,
        roles: &[Role],
        payload: &DeliveryPayload,
        tenant_id: Option<&str>,
    ) -> Result<DeliveryCount, ChannelError> {
        let targets = roles.iter().map(Role::to_string).collect();
        self.post("roles", targets, tenant_id, payload).await
    }

    async fn deliver_to_tags(
        &self,
        tags: &[String],
        payload: &DeliveryPayload,
    ) -> Result<DeliveryCount, ChannelError> {
        self.post("tags", tags.to_vec(), None, payload).await
    }

    async fn deliver_to_users(
        &self,
        user_ids: &[String],
        payload: &DeliveryPayload,
    ) -> Result<DeliveryCount, ChannelError> {
        self.post("users", user_ids.to_vec(), None, payload).await
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let gateway =
            HttpPushGateway::with_client("http://push.local/api/", reqwest::Client::new());
        assert_eq!(gateway.base_url(), "http://push.local/api");
    }

    #[test]
    fn test_request_body_shape() {
        let payload = DeliveryPayload {
            title: "Order 1".into(),
            body: "".into(),
            icon: None,
            badge: None,
            image: None,
            url: None,
            tag: None,
            renotify: None,
            require_interaction: Some(true),
            data: Map::new(),
        };
        let body = GatewayRequest {
            channel: "roles",
            targets: vec!["admin".into()],
            tenant_id: Some("T1"),
            payload: &payload,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["tenantId"], "T1");
        assert_eq!(json["targets"], json!(["admin"]));
        assert_eq!(json["payload"]["requireInteraction"], true);
    }

    #[test]
    fn test_response_defaults_to_zero() {
        let parsed: GatewayResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(parsed.delivered, 0);
    }
}
