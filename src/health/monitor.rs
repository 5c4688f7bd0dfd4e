//! 健康监控 - 按需推断 agent 存活状态与健康评分
//!
//! 状态不持久化：每次检查都基于注册表和任务存储的实时快照
//! 重新计算。判定优先级 offline > stuck > active > idle。

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::registry::{AgentProfile, AgentRegistry};
use crate::taskstore::{Task, TaskStatus, TaskStore};

use super::score;

/// 存活状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    Active,
    Idle,
    Stuck,
    Offline,
}

impl std::fmt::Display for Liveness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Liveness::Active => write!(f, "active"),
            Liveness::Idle => write!(f, "idle"),
            Liveness::Stuck => write!(f, "stuck"),
            Liveness::Offline => write!(f, "offline"),
        }
    }
}

/// 健康检查阈值
#[derive(Debug, Clone)]
pub struct HealthThresholds {
    /// 心跳超过该时长视为 offline
    pub offline_after: Duration,
    /// in-progress 任务超过该时长视为 stuck
    pub stuck_after: Duration,
    /// 任务的期望耗时（speed 因子的基准）
    pub expected_task_duration: Duration,
    /// 低于该分数计入 critical
    pub critical_score: u8,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            offline_after: Duration::minutes(5),
            stuck_after: Duration::hours(2),
            expected_task_duration: Duration::minutes(30),
            critical_score: 40,
        }
    }
}

/// 单个 agent 的健康快照（纯计算结果，不持久化）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentHealthSnapshot {
    pub agent_id: String,
    pub status: Liveness,
    /// 综合健康评分 [0,100]
    pub health_score: u8,
    /// 各负面因素的可读描述
    pub issues: Vec<String>,
}

/// 全量健康检查结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub total: usize,
    /// active + idle
    pub healthy: usize,
    pub stuck: usize,
    pub offline: usize,
    pub snapshots: Vec<AgentHealthSnapshot>,
    /// 评分低于阈值的 agent
    pub critical: Vec<AgentHealthSnapshot>,
}

/// 健康监控器
pub struct HealthMonitor {
    registry: Arc<dyn AgentRegistry>,
    tasks: Arc<dyn TaskStore>,
    thresholds: HealthThresholds,
}

impl HealthMonitor {
    pub fn new(registry: Arc<dyn AgentRegistry>, tasks: Arc<dyn TaskStore>) -> Self {
        Self::with_thresholds(registry, tasks, HealthThresholds::default())
    }

    pub fn with_thresholds(
        registry: Arc<dyn AgentRegistry>,
        tasks: Arc<dyn TaskStore>,
        thresholds: HealthThresholds,
    ) -> Self {
        Self {
            registry,
            tasks,
            thresholds,
        }
    }

    /// 计算单个 agent 的健康快照
    pub fn check_agent(&self, profile: &AgentProfile) -> AgentHealthSnapshot {
        self.check_agent_at(profile, Utc::now())
    }

    /// 计算健康快照（指定当前时间，测试用）
    pub fn check_agent_at(&self, profile: &AgentProfile, now: DateTime<Utc>) -> AgentHealthSnapshot {
        let tasks = match self.tasks.list_by_agent(&profile.agent_id) {
            Ok(tasks) => tasks,
            Err(e) => {
                // 单个依赖不可达时降级，不影响其他 agent 的检查
                warn!(agent = %profile.agent_id, error = %e, "task store read failed, degrading");
                return AgentHealthSnapshot {
                    agent_id: profile.agent_id.clone(),
                    status: Liveness::Offline,
                    health_score: 0,
                    issues: vec![format!("task store unreachable: {}", e)],
                };
            }
        };

        let heartbeat_age = profile.last_heartbeat.map(|hb| now - hb);
        let status = self.classify(&tasks, heartbeat_age, now);

        let mut issues = Vec::new();
        match heartbeat_age {
            None => issues.push("no heartbeat recorded".to_string()),
            Some(age) if age > self.thresholds.offline_after => {
                issues.push(format!("no heartbeat in {} minutes", age.num_minutes()));
            }
            _ => {}
        }

        let stuck_count = self.stuck_tasks(&tasks, now).len();
        if stuck_count > 0 {
            issues.push(format!(
                "{} tasks in progress longer than {} hours",
                stuck_count,
                self.thresholds.stuck_after.num_hours()
            ));
        }

        let blocked = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Blocked)
            .count();
        if blocked > 0 {
            issues.push(format!("{} tasks blocked", blocked));
        }

        let failed = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Failed)
            .count();
        if failed > 0 {
            issues.push(format!("{} tasks failed", failed));
        }

        let success = score::success_rate(&tasks);
        let speed = score::speed_factor(&tasks, self.thresholds.expected_task_duration);
        let uptime = score::uptime_factor(heartbeat_age, self.thresholds.offline_after);
        let health_score = score::composite(success, speed, uptime);

        debug!(
            agent = %profile.agent_id,
            status = %status,
            score = health_score,
            "health snapshot computed"
        );

        AgentHealthSnapshot {
            agent_id: profile.agent_id.clone(),
            status,
            health_score,
            issues,
        }
    }

    /// 对注册表里的所有 agent 执行健康检查并聚合
    pub fn run_health_check(&self) -> Result<HealthReport> {
        self.run_health_check_at(Utc::now())
    }

    /// 全量健康检查（指定当前时间，测试用）
    pub fn run_health_check_at(&self, now: DateTime<Utc>) -> Result<HealthReport> {
        let profiles = self
            .registry
            .list()
            .context("failed to read agent registry")?;

        let snapshots: Vec<AgentHealthSnapshot> = profiles
            .iter()
            .map(|p| self.check_agent_at(p, now))
            .collect();

        let healthy = snapshots
            .iter()
            .filter(|s| matches!(s.status, Liveness::Active | Liveness::Idle))
            .count();
        let stuck = snapshots
            .iter()
            .filter(|s| s.status == Liveness::Stuck)
            .count();
        let offline = snapshots
            .iter()
            .filter(|s| s.status == Liveness::Offline)
            .count();

        let critical: Vec<AgentHealthSnapshot> = snapshots
            .iter()
            .filter(|s| s.health_score < self.thresholds.critical_score)
            .cloned()
            .collect();

        Ok(HealthReport {
            total: snapshots.len(),
            healthy,
            stuck,
            offline,
            snapshots,
            critical,
        })
    }

    /// 状态判定；offline 优先于其他一切状态
    fn classify(
        &self,
        tasks: &[Task],
        heartbeat_age: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Liveness {
        let offline = match heartbeat_age {
            None => true,
            Some(age) => age > self.thresholds.offline_after,
        };
        if offline {
            return Liveness::Offline;
        }

        if !self.stuck_tasks(tasks, now).is_empty() {
            return Liveness::Stuck;
        }

        if tasks.iter().any(|t| t.status == TaskStatus::InProgress) {
            Liveness::Active
        } else {
            Liveness::Idle
        }
    }

    fn stuck_tasks<'a>(&self, tasks: &'a [Task], now: DateTime<Utc>) -> Vec<&'a Task> {
        tasks
            .iter()
            .filter(|t| t.status == TaskStatus::InProgress)
            .filter(|t| {
                t.started_at
                    .map(|start| now - start > self.thresholds.stuck_after)
                    .unwrap_or(false)
            })
            .collect()
    }
}
