//! 任务存储边界 - 按 agent 读取任务列表
//!
//! 事件核心只读取任务；任务的 CRUD 属于协作方。
//! 读取被视为最终一致的快照，允许底层并发变更。

pub mod file;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

pub use file::FileTaskStore;

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Blocked,
    Completed,
    Failed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Todo => write!(f, "todo"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Blocked => write!(f, "blocked"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// 任务
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub subject: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(id: impl Into<String>, subject: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            status,
            started_at: None,
            completed_at: None,
        }
    }

    /// 设置开始时间（链式调用）
    pub fn started(mut self, at: DateTime<Utc>) -> Self {
        self.started_at = Some(at);
        self
    }

    /// 设置完成时间（链式调用）
    pub fn completed(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }

    /// 任务耗时（需要开始和完成时间都存在）
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

/// 任务存储读取边界
pub trait TaskStore: Send + Sync {
    /// 列出指定 agent 的任务
    fn list_by_agent(&self, agent_id: &str) -> Result<Vec<Task>>;
}

/// 内存任务存储 - 测试和库内嵌场景
#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: Mutex<HashMap<String, Vec<Task>>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 给指定 agent 追加一个任务
    pub fn push_task(&self, agent_id: &str, task: Task) {
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(agent_id.to_string())
            .or_default()
            .push(task);
    }
}

impl TaskStore for MemoryTaskStore {
    fn list_by_agent(&self, agent_id: &str) -> Result<Vec<Task>> {
        Ok(self
            .tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(agent_id)
            .cloned()
            .unwrap_or_default())
    }
}
