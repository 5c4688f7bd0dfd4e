//! Agent 注册表 - webhook 配置与心跳的边界
//!
//! 事件核心只读取注册表；写入（注册、心跳）属于协作方。
//! 提供内存实现（测试/嵌入）和文件实现（CLI 共享状态）。

pub mod file;
pub mod memory;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::EventKind;

pub use file::FileRegistry;
pub use memory::MemoryRegistry;

/// Agent 类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Coder,
    Reviewer,
    Tester,
    Planner,
    Generic,
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentKind::Coder => write!(f, "coder"),
            AgentKind::Reviewer => write!(f, "reviewer"),
            AgentKind::Tester => write!(f, "tester"),
            AgentKind::Planner => write!(f, "planner"),
            AgentKind::Generic => write!(f, "generic"),
        }
    }
}

impl std::str::FromStr for AgentKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "coder" => Ok(AgentKind::Coder),
            "reviewer" => Ok(AgentKind::Reviewer),
            "tester" => Ok(AgentKind::Tester),
            "planner" => Ok(AgentKind::Planner),
            "generic" => Ok(AgentKind::Generic),
            _ => Err(anyhow::anyhow!("unknown agent kind: {}", s)),
        }
    }
}

/// Agent 配置记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub agent_id: String,
    pub agent_name: String,
    pub agent_kind: AgentKind,
    /// webhook 接收地址
    pub webhook_url: String,
    /// 是否启用投递
    pub enabled: bool,
    /// 订阅的事件类型；空列表表示订阅全部
    #[serde(default)]
    pub event_kinds: Vec<EventKind>,
    /// 最近一次心跳时间
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_heartbeat: Option<DateTime<Utc>>,
}

impl AgentProfile {
    /// 创建新配置（默认启用、订阅全部事件、无心跳）
    pub fn new(
        agent_id: impl Into<String>,
        agent_name: impl Into<String>,
        agent_kind: AgentKind,
        webhook_url: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
            agent_kind,
            webhook_url: webhook_url.into(),
            enabled: true,
            event_kinds: Vec::new(),
            last_heartbeat: None,
        }
    }

    /// 限定订阅的事件类型（链式调用）
    pub fn with_event_kinds(mut self, kinds: Vec<EventKind>) -> Self {
        self.event_kinds = kinds;
        self
    }

    /// 设置心跳时间（链式调用，测试用）
    pub fn with_heartbeat(mut self, at: DateTime<Utc>) -> Self {
        self.last_heartbeat = Some(at);
        self
    }

    /// 是否订阅指定事件类型（空过滤表示全部）
    pub fn accepts(&self, kind: &EventKind) -> bool {
        self.event_kinds.is_empty() || self.event_kinds.contains(kind)
    }
}

/// Agent 注册表读取边界
pub trait AgentRegistry: Send + Sync {
    /// 查询单个 agent 配置
    fn get(&self, agent_id: &str) -> Result<Option<AgentProfile>>;

    /// 列出所有 agent 配置
    fn list(&self) -> Result<Vec<AgentProfile>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_empty_filter_means_all() {
        let profile = AgentProfile::new("a1", "Agent One", AgentKind::Coder, "http://x/hook");
        assert!(profile.accepts(&EventKind::TaskAssigned));
        assert!(profile.accepts(&EventKind::Other("anything".into())));
    }

    #[test]
    fn test_accepts_filtered() {
        let profile = AgentProfile::new("a1", "Agent One", AgentKind::Coder, "http://x/hook")
            .with_event_kinds(vec![EventKind::TaskAssigned, EventKind::TaskFailed]);
        assert!(profile.accepts(&EventKind::TaskAssigned));
        assert!(!profile.accepts(&EventKind::TaskCompleted));
    }

    #[test]
    fn test_agent_kind_round_trip() {
        let kind: AgentKind = "reviewer".parse().unwrap();
        assert_eq!(kind, AgentKind::Reviewer);
        assert_eq!(kind.to_string(), "reviewer");
        assert!("robot".parse::<AgentKind>().is_err());
    }

    #[test]
    fn test_profile_serialization() {
        let profile = AgentProfile::new("a1", "Agent One", AgentKind::Tester, "http://x/hook")
            .with_event_kinds(vec![EventKind::TaskCompleted]);
        let json = serde_json::to_string(&profile).unwrap();
        let parsed: AgentProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.agent_id, "a1");
        assert_eq!(parsed.agent_kind, AgentKind::Tester);
        assert!(parsed.last_heartbeat.is_none());
        assert_eq!(parsed.event_kinds, vec![EventKind::TaskCompleted]);
    }
}
