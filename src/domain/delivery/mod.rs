//! Delivery fan-out.
//!
//! - `DeliveryChannels`: transport primitives (broadcast, roles, tags, users)
//! - `DeliveryFanOut`: drives the primitives for one resolved audience
//! - `NoopChannels` / `HttpPushGateway`: the shipped channel backends
//!
//! Use `create_delivery_channels()` to pick a backend from configuration.

mod channels;
mod fanout;
mod http_gateway;
mod noop;
mod report;

use std::sync::Arc;
use std::time::Duration;

pub use channels::{ChannelError, DeliveryChannel, DeliveryChannels, DeliveryCount};
pub use fanout::DeliveryFanOut;
pub use http_gateway::HttpPushGateway;
pub use noop::NoopChannels;
pub use report::{DeliveryError, DeliveryReport};

use crate::config::DispatchConfig;

/// Create the delivery channels named by `dispatch.channel_backend`.
///
/// Falls back to `NoopChannels` when the HTTP backend is selected without a
/// gateway URL or the client cannot be built.
pub fn create_delivery_channels(config: &DispatchConfig) -> Arc<dyn DeliveryChannels> {
    match config.channel_backend.as_str() {
        "http" => {
            let Some(url) = config.gateway_url.as_deref().filter(|u| !u.is_empty()) else {
                tracing::warn!("HTTP channel backend selected but dispatch.gateway_url is unset, falling back to noop");
                return Arc::new(NoopChannels);
            };

            match HttpPushGateway::new(url, Duration::from_secs(config.gateway_timeout_seconds)) {
                Ok(gateway) => {
                    tracing::info!(gateway_url = %url, "Using HTTP push gateway channels");
                    Arc::new(gateway)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to build push gateway client, falling back to noop");
                    Arc::new(NoopChannels)
                }
            }
        }
        "noop" => {
            tracing::info!("Using noop delivery channels");
            Arc::new(NoopChannels)
        }
        other => {
            tracing::warn!(backend = %other, "Unknown channel backend, falling back to noop");
            Arc::new(NoopChannels)
        }
    }
}
