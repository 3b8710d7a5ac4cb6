//! Domain layer modules
//!
//! This module contains business domain logic:
//! - `template`: Notification templates, rendering and template stores
//! - `audience`: Role/tag/user audience resolution
//! - `payload`: Delivery payload construction
//! - `delivery`: Channel abstraction and audience fan-out
//! - `schedule`: Scheduled notifications and schedule stores
//! - `log`: Notification log entries and sinks

pub mod audience;
pub mod delivery;
pub mod log;
pub mod payload;
pub mod schedule;
pub mod storage;
pub mod template;
