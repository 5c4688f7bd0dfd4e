//! 内存注册表 - 用于测试和库内嵌场景

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use super::{AgentProfile, AgentRegistry};

/// 内存实现，插入顺序不保证；list 按 agent_id 排序保证稳定输出
#[derive(Default)]
pub struct MemoryRegistry {
    agents: Mutex<HashMap<String, AgentProfile>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入或覆盖一个 agent 配置
    pub fn insert(&self, profile: AgentProfile) {
        self.agents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(profile.agent_id.clone(), profile);
    }

    /// 记录心跳
    pub fn record_heartbeat(&self, agent_id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut agents = self.agents.lock().unwrap_or_else(|e| e.into_inner());
        let profile = agents
            .get_mut(agent_id)
            .ok_or_else(|| anyhow::anyhow!("agent {} not registered", agent_id))?;
        profile.last_heartbeat = Some(at);
        Ok(())
    }

    /// 启用/禁用投递
    pub fn set_enabled(&self, agent_id: &str, enabled: bool) -> Result<()> {
        let mut agents = self.agents.lock().unwrap_or_else(|e| e.into_inner());
        let profile = agents
            .get_mut(agent_id)
            .ok_or_else(|| anyhow::anyhow!("agent {} not registered", agent_id))?;
        profile.enabled = enabled;
        Ok(())
    }
}

impl AgentRegistry for MemoryRegistry {
    fn get(&self, agent_id: &str) -> Result<Option<AgentProfile>> {
        Ok(self
            .agents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(agent_id)
            .cloned())
    }

    fn list(&self) -> Result<Vec<AgentProfile>> {
        let mut profiles: Vec<AgentProfile> = self
            .agents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        profiles.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        Ok(profiles)
    }
}
