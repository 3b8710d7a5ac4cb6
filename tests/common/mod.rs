//! Shared fakes for the integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use push_dispatch_service::domain::audience::Role;
use push_dispatch_service::domain::delivery::{ChannelError, DeliveryChannels, DeliveryCount};
use push_dispatch_service::domain::payload::DeliveryPayload;
use push_dispatch_service::domain::template::{MemoryTemplateStore, NotificationTemplate};

/// One recorded channel invocation
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelCall {
    Broadcast {
        title: String,
    },
    Roles {
        roles: Vec<Role>,
        tenant_id: Option<String>,
        title: String,
    },
    Tags {
        tags: Vec<String>,
    },
    Users {
        user_ids: Vec<String>,
    },
}

/// Records every call and answers with a fixed count per recipient key
#[derive(Default)]
pub struct RecordingChannels {
    calls: Mutex<Vec<ChannelCall>>,
    pub per_target: DeliveryCount,
    pub fail_everything: bool,
}

impl RecordingChannels {
    pub fn new(per_target: DeliveryCount) -> Arc<Self> {
        Arc::new(Self {
            per_target,
            ..Default::default()
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_everything: true,
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<ChannelCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: ChannelCall, targets: usize) -> Result<DeliveryCount, ChannelError> {
        self.calls.lock().unwrap().push(call);
        if self.fail_everything {
            Err(ChannelError::Unavailable("gateway offline".into()))
        } else {
            Ok(targets * self.per_target)
        }
    }
}

#[async_trait]
impl DeliveryChannels for RecordingChannels {
    async fn deliver_broadcast(
        &self,
        payload: &DeliveryPayload,
    ) -> Result<DeliveryCount, ChannelError> {
        self.record(
            ChannelCall::Broadcast {
                title: payload.title.clone(),
            },
            1,
        )
    }

    async fn deliver_to_roles(
        &self,
        roles: &[Role],
        payload: &DeliveryPayload,
        tenant_id: Option<&str>,
    ) -> Result<DeliveryCount, ChannelError> {
        self.record(
            ChannelCall::Roles {
                roles: roles.to_vec(),
                tenant_id: tenant_id.map(str::to_string),
                title: payload.title.clone(),
            },
            roles.len(),
        )
    }

    async fn deliver_to_tags(
        &self,
        tags: &[String],
        _payload: &DeliveryPayload,
    ) -> Result<DeliveryCount, ChannelError> {
        self.record(
            ChannelCall::Tags {
                tags: tags.to_vec(),
            },
            tags.len(),
        )
    }

    async fn deliver_to_users(
        &self,
        user_ids: &[String],
        _payload: &DeliveryPayload,
    ) -> Result<DeliveryCount, ChannelError> {
        self.record(
            ChannelCall::Users {
                user_ids: user_ids.to_vec(),
            },
            user_ids.len(),
        )
    }

    fn backend_name(&self) -> &'static str {
        "recording"
    }
}

/// Default catalog with `order_new` overridden to a placeholder title
pub fn template_store() -> Arc<MemoryTemplateStore> {
    let store = MemoryTemplateStore::with_default_templates();
    store
        .upsert(
            NotificationTemplate::new("order_new", "Order {{order_id}}", "Amount {{total}}")
                .with_audience(Vec::<String>::new()),
        )
        .unwrap();
    store
        .upsert(NotificationTemplate::new("maintenance_notice", "Down", "Soon").disabled())
        .unwrap();
    Arc::new(store)
}
