//! 文件任务存储 - 读取每个 agent 的任务目录
//!
//! 任务存储在 `~/.config/agent-hub/tasks/{agent-id}/` 目录，
//! 每个任务是一个独立的 JSON 文件: `{task-id}.json`。

use anyhow::Result;
use std::path::PathBuf;

use super::{Task, TaskStore};

/// 文件任务存储
pub struct FileTaskStore {
    root: PathBuf,
}

impl FileTaskStore {
    pub fn new() -> Self {
        let root = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config/agent-hub/tasks");
        Self { root }
    }

    /// 指定任务根目录（测试用）
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    fn agent_tasks_dir(&self, agent_id: &str) -> PathBuf {
        self.root.join(agent_id)
    }

    /// 写入一个任务文件（协作方写路径，测试和演示用）
    pub fn put_task(&self, agent_id: &str, task: &Task) -> Result<()> {
        let dir = self.agent_tasks_dir(agent_id);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.json", task.id));
        std::fs::write(path, serde_json::to_string_pretty(task)?)?;
        Ok(())
    }
}

impl Default for FileTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore for FileTaskStore {
    fn list_by_agent(&self, agent_id: &str) -> Result<Vec<Task>> {
        let tasks_dir = self.agent_tasks_dir(agent_id);

        if !tasks_dir.exists() {
            return Ok(Vec::new());
        }

        let mut tasks = Vec::new();

        for entry in std::fs::read_dir(&tasks_dir)?.flatten() {
            let path = entry.path();
            if !path.is_file() || path.extension().map_or(true, |e| e != "json") {
                continue;
            }
            // 跳过隐藏文件（如 .lock）
            if path
                .file_name()
                .is_some_and(|n| n.to_str().is_some_and(|s| s.starts_with('.')))
            {
                continue;
            }
            if let Ok(content) = std::fs::read_to_string(&path) {
                if let Ok(task) = serde_json::from_str::<Task>(&content) {
                    tasks.push(task);
                }
            }
        }

        // 按 ID 排序（数字 ID 在前）
        tasks.sort_by(|a, b| {
            let a_num: i64 = a.id.parse().unwrap_or(i64::MAX);
            let b_num: i64 = b.id.parse().unwrap_or(i64::MAX);
            a_num.cmp(&b_num).then_with(|| a.id.cmp(&b.id))
        });

        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taskstore::TaskStatus;

    #[test]
    fn test_list_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTaskStore::with_root(dir.path().to_path_buf());
        assert!(store.list_by_agent("a1").unwrap().is_empty());
    }

    #[test]
    fn test_put_and_list_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTaskStore::with_root(dir.path().to_path_buf());

        store
            .put_task("a1", &Task::new("10", "later", TaskStatus::Todo))
            .unwrap();
        store
            .put_task("a1", &Task::new("2", "earlier", TaskStatus::InProgress))
            .unwrap();

        let tasks = store.list_by_agent("a1").unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, "2");
        assert_eq!(tasks[1].id, "10");
    }

    #[test]
    fn test_malformed_file_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTaskStore::with_root(dir.path().to_path_buf());
        store
            .put_task("a1", &Task::new("1", "ok", TaskStatus::Todo))
            .unwrap();

        let agent_dir = dir.path().join("a1");
        std::fs::write(agent_dir.join("2.json"), "not json").unwrap();
        std::fs::write(agent_dir.join(".lock"), "").unwrap();
        std::fs::write(agent_dir.join("notes.txt"), "ignore").unwrap();

        let tasks = store.list_by_agent("a1").unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "1");
    }
}
