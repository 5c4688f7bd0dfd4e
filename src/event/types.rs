//! 统一事件结构
//!
//! 总线上流转的事件数据结构，发布后不可变。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::kind::EventKind;

/// 事件优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

/// 事件元数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// 来源（发布方标识）
    pub source: String,
    /// 优先级
    #[serde(default)]
    pub priority: Priority,
    /// 时间戳
    pub timestamp: DateTime<Utc>,
}

/// 系统事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// 事件类型
    #[serde(rename = "event")]
    pub kind: EventKind,
    /// 事件数据（JSON object）
    pub data: Value,
    /// 元数据
    pub metadata: EventMetadata,
}

impl Event {
    /// 创建新事件（默认优先级 medium，时间戳取当前时间）
    pub fn new(kind: EventKind, data: Value, source: impl Into<String>) -> Self {
        Self {
            kind,
            data,
            metadata: EventMetadata {
                source: source.into(),
                priority: Priority::Medium,
                timestamp: Utc::now(),
            },
        }
    }

    /// 设置优先级（链式调用）
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.metadata.priority = priority;
        self
    }

    /// 设置时间戳（链式调用，主要用于测试）
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.metadata.timestamp = timestamp;
        self
    }

    /// 创建任务分配事件
    pub fn task_assigned(agent_id: impl Into<String>, task_id: impl Into<String>) -> Self {
        Self::new(
            EventKind::TaskAssigned,
            serde_json::json!({ "agent_id": agent_id.into(), "task_id": task_id.into() }),
            "task-store",
        )
    }

    /// 创建任务完成事件
    pub fn task_completed(agent_id: impl Into<String>, task_id: impl Into<String>) -> Self {
        Self::new(
            EventKind::TaskCompleted,
            serde_json::json!({ "agent_id": agent_id.into(), "task_id": task_id.into() }),
            "task-store",
        )
    }

    /// 创建 agent 心跳事件
    pub fn agent_heartbeat(agent_id: impl Into<String>) -> Self {
        Self::new(
            EventKind::AgentHeartbeat,
            serde_json::json!({ "agent_id": agent_id.into() }),
            "registry",
        )
    }
}
