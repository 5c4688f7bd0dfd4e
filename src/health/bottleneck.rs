//! 瓶颈检测 - 队列深度启发式
//!
//! 纯只读启发式：todo 积压或并发 in-progress 超阈值时给出
//! 建议动作，从不修改 agent 或任务状态。

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::registry::{AgentKind, AgentProfile, AgentRegistry};
use crate::taskstore::{TaskStatus, TaskStore};

/// 瓶颈严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BottleneckSeverity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for BottleneckSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BottleneckSeverity::Low => write!(f, "low"),
            BottleneckSeverity::Medium => write!(f, "medium"),
            BottleneckSeverity::High => write!(f, "high"),
        }
    }
}

/// 瓶颈发现（仅供参考，不持久化）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BottleneckFinding {
    pub agent_id: String,
    pub agent_kind: AgentKind,
    pub severity: BottleneckSeverity,
    pub issue: String,
    pub recommended_action: String,
}

/// 检测阈值
#[derive(Debug, Clone)]
pub struct BottleneckThresholds {
    /// todo 超过该值视为积压
    pub max_todo: usize,
    /// in-progress 超过该值视为过载
    pub max_in_progress: usize,
    /// todo 超过该值升级为 high
    pub high_todo: usize,
}

impl Default for BottleneckThresholds {
    fn default() -> Self {
        Self {
            max_todo: 5,
            max_in_progress: 3,
            high_todo: 10,
        }
    }
}

/// 瓶颈检测器
pub struct BottleneckDetector {
    registry: Arc<dyn AgentRegistry>,
    tasks: Arc<dyn TaskStore>,
    thresholds: BottleneckThresholds,
}

impl BottleneckDetector {
    pub fn new(registry: Arc<dyn AgentRegistry>, tasks: Arc<dyn TaskStore>) -> Self {
        Self::with_thresholds(registry, tasks, BottleneckThresholds::default())
    }

    pub fn with_thresholds(
        registry: Arc<dyn AgentRegistry>,
        tasks: Arc<dyn TaskStore>,
        thresholds: BottleneckThresholds,
    ) -> Self {
        Self {
            registry,
            tasks,
            thresholds,
        }
    }

    /// 按队列深度判定；未超阈值返回 None
    pub fn classify(&self, todo: usize, in_progress: usize) -> Option<(BottleneckSeverity, String)> {
        if todo <= self.thresholds.max_todo && in_progress <= self.thresholds.max_in_progress {
            return None;
        }

        let severity = if todo > self.thresholds.high_todo {
            BottleneckSeverity::High
        } else if todo > self.thresholds.max_todo {
            BottleneckSeverity::Medium
        } else {
            BottleneckSeverity::Low
        };

        let issue = format!("{} tasks queued, {} in progress", todo, in_progress);
        Some((severity, issue))
    }

    /// 检查单个 agent
    pub fn inspect_agent(&self, profile: &AgentProfile) -> Result<Option<BottleneckFinding>> {
        let tasks = self.tasks.list_by_agent(&profile.agent_id)?;
        let todo = tasks.iter().filter(|t| t.status == TaskStatus::Todo).count();
        let in_progress = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::InProgress)
            .count();

        Ok(self.classify(todo, in_progress).map(|(severity, issue)| {
            BottleneckFinding {
                agent_id: profile.agent_id.clone(),
                agent_kind: profile.agent_kind.clone(),
                severity,
                issue,
                recommended_action: recommended_action(severity, &profile.agent_kind),
            }
        }))
    }

    /// 扫描注册表里的所有 agent；单个 agent 的读取失败跳过并告警
    pub fn scan(&self) -> Result<Vec<BottleneckFinding>> {
        let mut findings = Vec::new();
        for profile in self.registry.list()? {
            match self.inspect_agent(&profile) {
                Ok(Some(finding)) => findings.push(finding),
                Ok(None) => {}
                Err(e) => {
                    warn!(agent = %profile.agent_id, error = %e, "bottleneck inspection failed")
                }
            }
        }
        Ok(findings)
    }
}

/// 按严重程度给出固定的建议动作
fn recommended_action(severity: BottleneckSeverity, kind: &AgentKind) -> String {
    match severity {
        BottleneckSeverity::High => format!("spawn an additional {} agent", kind),
        BottleneckSeverity::Medium => "redistribute queued tasks to idle agents".to_string(),
        BottleneckSeverity::Low => "monitor queue depth".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MemoryRegistry;
    use crate::taskstore::{MemoryTaskStore, Task};

    fn detector() -> BottleneckDetector {
        BottleneckDetector::new(
            Arc::new(MemoryRegistry::new()),
            Arc::new(MemoryTaskStore::new()),
        )
    }

    #[test]
    fn test_under_thresholds_not_flagged() {
        let detector = detector();
        assert!(detector.classify(5, 3).is_none());
        assert!(detector.classify(0, 0).is_none());
    }

    #[test]
    fn test_todo_six_is_medium() {
        let detector = detector();
        let (severity, _) = detector.classify(6, 0).unwrap();
        assert_eq!(severity, BottleneckSeverity::Medium);
    }

    #[test]
    fn test_todo_eleven_is_high() {
        let detector = detector();
        let (severity, _) = detector.classify(11, 0).unwrap();
        assert_eq!(severity, BottleneckSeverity::High);
    }

    #[test]
    fn test_in_progress_overload_is_low() {
        // todo 未积压但并发过载时只给 low
        let detector = detector();
        let (severity, issue) = detector.classify(0, 4).unwrap();
        assert_eq!(severity, BottleneckSeverity::Low);
        assert!(issue.contains("4 in progress"));
    }

    #[test]
    fn test_recommended_actions() {
        assert!(
            recommended_action(BottleneckSeverity::High, &AgentKind::Coder).contains("coder")
        );
        assert!(recommended_action(BottleneckSeverity::Medium, &AgentKind::Coder)
            .contains("redistribute"));
    }

    #[test]
    fn test_scan_flags_overloaded_agent() {
        let registry = Arc::new(MemoryRegistry::new());
        let tasks = Arc::new(MemoryTaskStore::new());

        registry.insert(AgentProfile::new(
            "swamped",
            "S",
            AgentKind::Tester,
            "http://localhost:1/hook",
        ));
        registry.insert(AgentProfile::new(
            "calm",
            "C",
            AgentKind::Coder,
            "http://localhost:1/hook",
        ));
        for i in 0..12 {
            tasks.push_task("swamped", Task::new(format!("{}", i), "t", TaskStatus::Todo));
        }

        let detector = BottleneckDetector::new(registry, tasks);
        let findings = detector.scan().unwrap();

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].agent_id, "swamped");
        assert_eq!(findings[0].severity, BottleneckSeverity::High);
        assert!(findings[0].recommended_action.contains("tester"));
    }
}
