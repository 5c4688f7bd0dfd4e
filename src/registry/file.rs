//! 文件注册表 - agents.json 读写
//!
//! CLI 各子命令之间通过 `~/.config/agent-hub/agents.json` 共享
//! agent 配置，跨进程读写用文件锁保护。

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{AgentProfile, AgentRegistry};

/// 测试目录计数器，保证同一进程内目录唯一
static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// agents.json 结构
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct AgentsFile {
    agents: Vec<AgentProfile>,
}

/// 文件注册表
pub struct FileRegistry {
    data_dir: PathBuf,
}

impl FileRegistry {
    pub fn new() -> Self {
        let data_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config/agent-hub");

        // 确保目录存在
        let _ = fs::create_dir_all(&data_dir);

        Self { data_dir }
    }

    /// 指定数据目录（测试和自定义部署用）
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        let _ = fs::create_dir_all(&data_dir);
        Self { data_dir }
    }

    /// 创建用于测试的注册表（每次调用创建独立的数据目录）
    pub fn new_for_test() -> Self {
        let counter = TEST_DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
        let data_dir =
            std::env::temp_dir().join(format!("ahub-test-{}-{}", std::process::id(), counter));
        Self::with_data_dir(data_dir)
    }

    fn agents_file_path(&self) -> PathBuf {
        self.data_dir.join("agents.json")
    }

    fn lock_file_path(&self) -> PathBuf {
        self.data_dir.join("agents.json.lock")
    }

    fn read_agents_file_internal(&self) -> Result<AgentsFile> {
        let path = self.agents_file_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(AgentsFile::default())
        }
    }

    fn write_agents_file_internal(&self, file: &AgentsFile) -> Result<()> {
        let path = self.agents_file_path();
        let content = serde_json::to_string_pretty(file)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 在文件锁保护下执行 agents.json 的读-改-写操作
    fn with_locked_agents_file<F, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce(&mut AgentsFile) -> Result<T>,
    {
        let lock_path = self.lock_file_path();
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&lock_path)?;

        // 排他锁（阻塞等待）
        lock_file.lock_exclusive()?;

        let result = (|| {
            let mut file = self.read_agents_file_internal()?;
            let result = operation(&mut file)?;
            self.write_agents_file_internal(&file)?;
            Ok(result)
        })();

        let _ = lock_file.unlock();

        result
    }

    /// 在文件锁保护下只读 agents.json
    fn with_locked_agents_file_read<F, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce(&AgentsFile) -> Result<T>,
    {
        let lock_path = self.lock_file_path();
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&lock_path)?;

        // 共享锁（允许多个读者）
        lock_file.lock_shared()?;

        let result = (|| {
            let file = self.read_agents_file_internal()?;
            operation(&file)
        })();

        let _ = lock_file.unlock();

        result
    }

    /// 注册或更新 agent 配置
    pub fn register(&self, profile: AgentProfile) -> Result<()> {
        self.with_locked_agents_file(|file| {
            file.agents.retain(|a| a.agent_id != profile.agent_id);
            file.agents.push(profile);
            Ok(())
        })
    }

    /// 移除 agent 配置；返回是否存在
    pub fn remove(&self, agent_id: &str) -> Result<bool> {
        self.with_locked_agents_file(|file| {
            let before = file.agents.len();
            file.agents.retain(|a| a.agent_id != agent_id);
            Ok(file.agents.len() != before)
        })
    }

    /// 记录心跳
    pub fn record_heartbeat(&self, agent_id: &str, at: DateTime<Utc>) -> Result<()> {
        self.with_locked_agents_file(|file| {
            let agent = file
                .agents
                .iter_mut()
                .find(|a| a.agent_id == agent_id)
                .ok_or_else(|| anyhow!("agent {} not registered", agent_id))?;
            agent.last_heartbeat = Some(at);
            Ok(())
        })
    }

    /// 启用/禁用投递
    pub fn set_enabled(&self, agent_id: &str, enabled: bool) -> Result<()> {
        self.with_locked_agents_file(|file| {
            let agent = file
                .agents
                .iter_mut()
                .find(|a| a.agent_id == agent_id)
                .ok_or_else(|| anyhow!("agent {} not registered", agent_id))?;
            agent.enabled = enabled;
            Ok(())
        })
    }
}

impl Default for FileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentRegistry for FileRegistry {
    fn get(&self, agent_id: &str) -> Result<Option<AgentProfile>> {
        self.with_locked_agents_file_read(|file| {
            Ok(file.agents.iter().find(|a| a.agent_id == agent_id).cloned())
        })
    }

    fn list(&self) -> Result<Vec<AgentProfile>> {
        self.with_locked_agents_file_read(|file| Ok(file.agents.clone()))
    }
}
