//! 总线订阅方 - webhook 分发与日志
//!
//! `WebhookSubscriber` 把发布的事件转成一次后台 broadcast，
//! 不阻塞发布调用；投递结果写入投递历史。
//! `LogSubscriber` 只记录日志，用作最轻量的观测 handler。

use anyhow::Result;
use tracing::{info, warn};

use crate::event::{Event, EventHandler};

use super::delivery::WebhookDeliveryService;
use super::payload::WebhookPayload;

/// webhook 分发订阅方
pub struct WebhookSubscriber {
    service: WebhookDeliveryService,
}

impl WebhookSubscriber {
    pub fn new(service: WebhookDeliveryService) -> Self {
        Self { service }
    }
}

impl EventHandler for WebhookSubscriber {
    fn name(&self) -> &str {
        "webhook-dispatcher"
    }

    fn handle(&self, event: &Event) -> Result<()> {
        let payload = WebhookPayload::from_event(event);
        let service = self.service.clone();

        // 发布路径保持同步串行；投递在后台任务中进行
        tokio::spawn(async move {
            match service.broadcast(&payload).await {
                Ok(records) => {
                    let failed = records
                        .iter()
                        .filter(|r| r.status == crate::webhook::DeliveryStatus::Failed)
                        .count();
                    info!(
                        kind = %payload.event,
                        targets = records.len(),
                        failed,
                        "webhook broadcast finished"
                    );
                }
                Err(e) => warn!(kind = %payload.event, error = %e, "webhook broadcast failed"),
            }
        });

        Ok(())
    }
}

/// 日志订阅方
pub struct LogSubscriber;

impl EventHandler for LogSubscriber {
    fn name(&self) -> &str {
        "event-log"
    }

    fn handle(&self, event: &Event) -> Result<()> {
        info!(
            kind = %event.kind,
            source = %event.metadata.source,
            priority = %event.metadata.priority,
            "event published"
        );
        Ok(())
    }
}
