//! Webhook 模块 - 出站投递、重试与投递记录

pub mod delivery;
pub mod payload;
pub mod record;
pub mod retry;
pub mod subscriber;

pub use delivery::{WebhookDeliveryService, HEADER_AGENT_KIND, HEADER_CORRELATION_ID};
pub use payload::WebhookPayload;
pub use record::{DeliveryRecord, DeliveryStatus};
pub use retry::RetryPolicy;
pub use subscriber::{LogSubscriber, WebhookSubscriber};
