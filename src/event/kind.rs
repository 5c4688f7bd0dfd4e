//! 事件类型枚举
//!
//! 已知的事件类型使用封闭枚举表示，便于 handler 穷举匹配；
//! 未知类型通过 `Other` 保留原始字符串，总线不做封闭校验。

use serde::{Deserialize, Serialize};

/// 事件类型
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    TaskCreated,
    TaskAssigned,
    TaskStarted,
    TaskCompleted,
    TaskFailed,
    AgentRegistered,
    AgentHeartbeat,
    AgentOffline,
    /// 未知类型（保留原始字符串）
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::TaskCreated => "task.created",
            EventKind::TaskAssigned => "task.assigned",
            EventKind::TaskStarted => "task.started",
            EventKind::TaskCompleted => "task.completed",
            EventKind::TaskFailed => "task.failed",
            EventKind::AgentRegistered => "agent.registered",
            EventKind::AgentHeartbeat => "agent.heartbeat",
            EventKind::AgentOffline => "agent.offline",
            EventKind::Other(s) => s,
        }
    }

    /// 是否为空类型（发布时会被拒绝）
    pub fn is_empty(&self) -> bool {
        self.as_str().trim().is_empty()
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for EventKind {
    fn from(s: &str) -> Self {
        match s {
            "task.created" => EventKind::TaskCreated,
            "task.assigned" => EventKind::TaskAssigned,
            "task.started" => EventKind::TaskStarted,
            "task.completed" => EventKind::TaskCompleted,
            "task.failed" => EventKind::TaskFailed,
            "agent.registered" => EventKind::AgentRegistered,
            "agent.heartbeat" => EventKind::AgentHeartbeat,
            "agent.offline" => EventKind::AgentOffline,
            other => EventKind::Other(other.to_string()),
        }
    }
}

impl From<String> for EventKind {
    fn from(s: String) -> Self {
        EventKind::from(s.as_str())
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_kind_round_trip() {
        let kind = EventKind::from("task.assigned");
        assert_eq!(kind, EventKind::TaskAssigned);
        assert_eq!(kind.as_str(), "task.assigned");
    }

    #[test]
    fn test_unknown_kind_preserved() {
        let kind = EventKind::from("deploy.requested");
        assert_eq!(kind, EventKind::Other("deploy.requested".to_string()));
        assert_eq!(kind.as_str(), "deploy.requested");
    }

    #[test]
    fn test_empty_kind() {
        assert!(EventKind::from("").is_empty());
        assert!(EventKind::from("   ").is_empty());
        assert!(!EventKind::TaskCreated.is_empty());
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&EventKind::TaskCompleted).unwrap();
        assert_eq!(json, "\"task.completed\"");

        let parsed: EventKind = serde_json::from_str("\"something.else\"").unwrap();
        assert_eq!(parsed, EventKind::Other("something.else".to_string()));
    }
}
