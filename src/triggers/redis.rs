use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::broadcast;

use super::backoff::ReconnectBackoff;
use crate::config::RedisConfig;
use crate::metrics::TriggerMetrics;
use crate::notification::{NotificationDispatcher, SendByTemplateRequest};

/// Channel subscribed to when none are configured
pub const DEFAULT_TRIGGER_CHANNEL: &str = "notification:dispatch";

/// Redis Pub/Sub subscriber.
///
/// Each message is a JSON `SendByTemplateRequest` and is dispatched the same
/// way as `POST /notifications/send`.
pub struct RedisSubscriber {
    config: RedisConfig,
    dispatcher: Arc<NotificationDispatcher>,
    shutdown: broadcast::Sender<()>,
}

impl RedisSubscriber {
    pub fn new(
        config: RedisConfig,
        dispatcher: Arc<NotificationDispatcher>,
        shutdown: broadcast::Sender<()>,
    ) -> Self {
        Self {
            config,
            dispatcher,
            shutdown,
        }
    }

    /// Run until shutdown, reconnecting with backoff after connection errors
    pub async fn start(&self) -> anyhow::Result<()> {
        let channels = self.channels();
        tracing::info!(channels = ?channels, "Starting Redis trigger subscriber");

        let mut backoff = ReconnectBackoff::default();
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            match self.run_subscription_loop(&channels, &mut backoff).await {
                Ok(()) => {
                    tracing::info!("Redis trigger subscriber stopped");
                    break;
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    tracing::error!(
                        error = %e,
                        attempt = backoff.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        "Redis subscription error, reconnecting"
                    );

                    tokio::select! {
                        _ = shutdown_rx.recv() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        Ok(())
    }

    fn channels(&self) -> Vec<String> {
        if self.config.channels.is_empty() {
            vec![DEFAULT_TRIGGER_CHANNEL.to_string()]
        } else {
            self.config.channels.clone()
        }
    }

    async fn run_subscription_loop(
        &self,
        channels: &[String],
        backoff: &mut ReconnectBackoff,
    ) -> anyhow::Result<()> {
        let client = redis::Client::open(self.config.url.as_str())?;
        let mut pubsub = client.get_async_pubsub().await?;

        for channel in channels {
            if channel.contains(['*', '?', '[']) {
                pubsub.psubscribe(channel).await?;
            } else {
                pubsub.subscribe(channel).await?;
            }
        }

        tracing::info!("Redis subscription established");
        backoff.reset();

        let mut messages = pubsub.on_message();
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Redis subscriber received shutdown signal");
                    return Ok(());
                }
                msg = messages.next() => {
                    let Some(msg) = msg else {
                        anyhow::bail!("Redis message stream ended");
                    };

                    let channel = msg.get_channel_name().to_string();
                    match msg.get_payload::<String>() {
                        Ok(payload) => self.handle_message(&channel, &payload).await,
                        Err(e) => {
                            tracing::warn!(channel = %channel, error = %e, "Unreadable Redis payload");
                            TriggerMetrics::record("redis", "invalid");
                        }
                    }
                }
            }
        }
    }

    async fn handle_message(&self, channel: &str, payload: &str) {
        let Some(request) = parse_message(channel, payload) else {
            TriggerMetrics::record("redis", "invalid");
            return;
        };

        match self.dispatcher.send_by_template(request).await {
            Ok(outcome) => {
                TriggerMetrics::record("redis", "dispatched");
                tracing::debug!(
                    channel = %channel,
                    template_type = %outcome.template_type,
                    deliveries = outcome.deliveries.len(),
                    "Dispatched notification from Redis"
                );
            }
            Err(e) => {
                TriggerMetrics::record("redis", "failed");
                tracing::warn!(
                    channel = %channel,
                    code = e.code(),
                    error = %e,
                    "Redis-triggered dispatch failed"
                );
            }
        }
    }
}

fn parse_message(channel: &str, payload: &str) -> Option<SendByTemplateRequest> {
    match serde_json::from_str::<SendByTemplateRequest>(payload) {
        Ok(request) => Some(request.with_source(format!("redis:{}", channel))),
        Err(e) => {
            tracing::warn!(
                channel = %channel,
                error = %e,
                "Failed to parse Redis trigger message"
            );
            None
        }
    }
}
