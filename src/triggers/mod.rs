//! Inbound triggers other than the HTTP API

mod backoff;
mod redis;

pub use backoff::ReconnectBackoff;
pub use redis::{RedisSubscriber, DEFAULT_TRIGGER_CHANNEL};
