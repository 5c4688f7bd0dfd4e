//! 投递记录
//!
//! 每个投递目标对应一条记录；状态只会从 pending 走到
//! success 或 failed，完成后不再变更。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::event::EventKind;

/// 全局计数器，确保投递 ID 唯一（即使在同一毫秒内）
static DELIVERY_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// 投递状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Success,
    Failed,
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryStatus::Pending => write!(f, "pending"),
            DeliveryStatus::Success => write!(f, "success"),
            DeliveryStatus::Failed => write!(f, "failed"),
        }
    }
}

/// 投递记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub id: String,
    pub agent_id: String,
    /// 投递的事件类型
    pub event: EventKind,
    pub status: DeliveryStatus,
    /// 已发起的尝试次数
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl DeliveryRecord {
    /// 创建 pending 记录
    pub fn new(agent_id: impl Into<String>, event: EventKind) -> Self {
        Self {
            id: generate_delivery_id(),
            agent_id: agent_id.into(),
            event,
            status: DeliveryStatus::Pending,
            attempts: 0,
            last_error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// 标记成功（终态）
    pub fn complete_success(&mut self) {
        self.status = DeliveryStatus::Success;
        self.completed_at = Some(Utc::now());
    }

    /// 标记失败（终态），记录最后错误
    pub fn complete_failure(&mut self, error: impl Into<String>) {
        self.status = DeliveryStatus::Failed;
        self.last_error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }

    pub fn is_terminal(&self) -> bool {
        self.status != DeliveryStatus::Pending
    }
}

/// 生成投递 ID: dlv-{毫秒时间戳}-{计数}
fn generate_delivery_id() -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let counter = DELIVERY_ID_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("dlv-{}-{}", timestamp, counter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_pending() {
        let record = DeliveryRecord::new("a1", EventKind::TaskAssigned);
        assert!(record.id.starts_with("dlv-"));
        assert_eq!(record.status, DeliveryStatus::Pending);
        assert_eq!(record.attempts, 0);
        assert!(!record.is_terminal());
    }

    #[test]
    fn test_unique_ids() {
        let a = DeliveryRecord::new("a1", EventKind::TaskAssigned);
        let b = DeliveryRecord::new("a1", EventKind::TaskAssigned);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_success_transition() {
        let mut record = DeliveryRecord::new("a1", EventKind::TaskAssigned);
        record.attempts = 1;
        record.complete_success();
        assert_eq!(record.status, DeliveryStatus::Success);
        assert!(record.completed_at.is_some());
        assert!(record.is_terminal());
    }

    #[test]
    fn test_failure_records_last_error() {
        let mut record = DeliveryRecord::new("a1", EventKind::TaskAssigned);
        record.attempts = 3;
        record.complete_failure("connection refused");
        assert_eq!(record.status, DeliveryStatus::Failed);
        assert_eq!(record.last_error.as_deref(), Some("connection refused"));
        assert!(record.completed_at.is_some());
    }

    #[test]
    fn test_status_serde_lowercase() {
        let json = serde_json::to_string(&DeliveryStatus::Failed).unwrap();
        assert_eq!(json, "\"failed\"");
    }
}
