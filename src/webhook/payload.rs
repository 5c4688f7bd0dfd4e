//! 出站 webhook 载荷
//!
//! 投递给 agent 注册地址的 HTTP body:
//! `{event, timestamp (ISO-8601), data, metadata}`。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{Event, EventKind, EventMetadata};

/// 出站载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// 事件类型
    pub event: EventKind,
    /// 投递时间（ISO-8601）
    pub timestamp: DateTime<Utc>,
    /// 事件数据
    pub data: Value,
    /// 事件元数据
    pub metadata: EventMetadata,
}

impl WebhookPayload {
    /// 由总线事件构造载荷
    pub fn from_event(event: &Event) -> Self {
        Self {
            event: event.kind.clone(),
            timestamp: Utc::now(),
            data: event.data.clone(),
            metadata: event.metadata.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Priority;

    #[test]
    fn test_from_event() {
        let event = Event::task_assigned("a1", "t-9").with_priority(Priority::High);
        let payload = WebhookPayload::from_event(&event);
        assert_eq!(payload.event, EventKind::TaskAssigned);
        assert_eq!(payload.data["task_id"], "t-9");
        assert_eq!(payload.metadata.priority, Priority::High);
    }

    #[test]
    fn test_wire_shape() {
        let payload = WebhookPayload::from_event(&Event::task_completed("a1", "t-1"));
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["event"], "task.completed");
        assert!(json["timestamp"].is_string());
        assert!(json["data"].is_object());
        assert_eq!(json["metadata"]["source"], "task-store");
    }
}
