//! Agent Hub CLI
//!
//! 管理 agent 注册表、发布事件并触发 webhook 投递、
//! 查看健康检查和瓶颈报告。

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use agent_hub::{
    AgentKind, AgentProfile, AgentRegistry, BottleneckDetector, Event, EventBus, EventKind,
    FileRegistry, FileTaskStore, HealthMonitor, LogSubscriber, Priority, Selector,
    WebhookDeliveryService, WebhookPayload,
};

#[derive(Parser)]
#[command(name = "ahub")]
#[command(about = "Agent Hub - 事件分发与 agent 健康监控")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 列出已注册的 agent
    Agents {
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
    /// 注册或更新一个 agent 的 webhook 配置
    Register {
        /// Agent ID
        agent_id: String,
        /// Agent 名称
        #[arg(long, short)]
        name: Option<String>,
        /// Agent 类型 (coder/reviewer/tester/planner/generic)
        #[arg(long, short, default_value = "generic")]
        kind: String,
        /// Webhook 接收地址
        #[arg(long, short)]
        url: String,
        /// 订阅的事件类型（可重复；不指定则订阅全部）
        #[arg(long = "event")]
        events: Vec<String>,
    },
    /// 移除一个 agent 的注册
    Remove {
        /// Agent ID
        agent_id: String,
    },
    /// 启用或禁用 agent 的投递
    Enable {
        /// Agent ID
        agent_id: String,
        /// 禁用而非启用
        #[arg(long)]
        off: bool,
    },
    /// 记录一次 agent 心跳
    Heartbeat {
        /// Agent ID
        agent_id: String,
    },
    /// 发布事件并向匹配的 agent 广播 webhook
    Publish {
        /// 事件类型 (如 task.assigned)
        event: String,
        /// 事件来源
        #[arg(long, short, default_value = "cli")]
        source: String,
        /// 优先级 (low/medium/high)
        #[arg(long, short, default_value = "medium")]
        priority: String,
        /// 事件数据 (JSON object)
        #[arg(long, short, default_value = "{}")]
        data: String,
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
    /// 执行健康检查
    Health {
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
    /// 扫描瓶颈 agent
    Bottlenecks {
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化 tracing 日志系统，通过 RUST_LOG 控制级别
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("agent_hub=info,ahub=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();
    let registry = Arc::new(FileRegistry::new());
    let tasks = Arc::new(FileTaskStore::new());

    match cli.command {
        Commands::Agents { json } => {
            let agents = registry.list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&agents)?);
            } else if agents.is_empty() {
                println!("没有已注册的 agent");
            } else {
                println!("已注册 {} 个 agent:\n", agents.len());
                for agent in agents {
                    let state = if agent.enabled { "enabled" } else { "disabled" };
                    let heartbeat = agent
                        .last_heartbeat
                        .map(|hb| hb.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string());
                    println!(
                        "  {} [{}] {} -> {} (last heartbeat: {})",
                        agent.agent_id, agent.agent_kind, state, agent.webhook_url, heartbeat
                    );
                }
            }
        }
        Commands::Register {
            agent_id,
            name,
            kind,
            url,
            events,
        } => {
            let kind: AgentKind = kind.parse()?;
            let name = name.unwrap_or_else(|| agent_id.clone());
            let event_kinds: Vec<EventKind> =
                events.iter().map(|e| EventKind::from(e.as_str())).collect();
            let profile =
                AgentProfile::new(&agent_id, name, kind, url).with_event_kinds(event_kinds);
            registry.register(profile)?;
            println!("已注册 agent: {}", agent_id);
        }
        Commands::Remove { agent_id } => {
            if registry.remove(&agent_id)? {
                println!("已移除 agent: {}", agent_id);
            } else {
                println!("agent {} 未注册", agent_id);
            }
        }
        Commands::Enable { agent_id, off } => {
            registry.set_enabled(&agent_id, !off)?;
            println!(
                "agent {} 已{}",
                agent_id,
                if off { "禁用" } else { "启用" }
            );
        }
        Commands::Heartbeat { agent_id } => {
            registry.record_heartbeat(&agent_id, chrono::Utc::now())?;
            println!("已记录 {} 的心跳", agent_id);
        }
        Commands::Publish {
            event,
            source,
            priority,
            data,
            json,
        } => {
            let kind = EventKind::from(event.as_str());
            let data: serde_json::Value = serde_json::from_str(&data)?;
            let priority = match priority.to_lowercase().as_str() {
                "low" => Priority::Low,
                "high" => Priority::High,
                _ => Priority::Medium,
            };

            let event = Event::new(kind, data, source).with_priority(priority);

            // 总线记录发布本身；投递同步等待以便打印结果
            let bus = EventBus::new();
            bus.subscribe(Selector::All, Arc::new(LogSubscriber));
            bus.publish(event.clone())?;

            let service = WebhookDeliveryService::new(registry.clone())?;
            let payload = WebhookPayload::from_event(&event);
            let records = service.broadcast(&payload).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("没有匹配的投递目标");
            } else {
                println!("已投递 {} 个目标:\n", records.len());
                for record in records {
                    println!(
                        "  {} -> {} ({} attempts){}",
                        record.agent_id,
                        record.status,
                        record.attempts,
                        record
                            .last_error
                            .map(|e| format!(" last error: {}", e))
                            .unwrap_or_default()
                    );
                }
            }
        }
        Commands::Health { json } => {
            let monitor = HealthMonitor::new(registry.clone(), tasks.clone());
            let report = monitor.run_health_check()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "总计 {} | healthy {} | stuck {} | offline {}\n",
                    report.total, report.healthy, report.stuck, report.offline
                );
                for snapshot in &report.snapshots {
                    println!(
                        "  {} [{}] score {}",
                        snapshot.agent_id, snapshot.status, snapshot.health_score
                    );
                    for issue in &snapshot.issues {
                        println!("    - {}", issue);
                    }
                }
                if !report.critical.is_empty() {
                    println!("\n严重问题 ({}):", report.critical.len());
                    for snapshot in &report.critical {
                        println!("  {} score {}", snapshot.agent_id, snapshot.health_score);
                    }
                }
            }
        }
        Commands::Bottlenecks { json } => {
            let detector = BottleneckDetector::new(registry.clone(), tasks.clone());
            let findings = detector.scan()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&findings)?);
            } else if findings.is_empty() {
                println!("未发现瓶颈");
            } else {
                println!("发现 {} 个瓶颈:\n", findings.len());
                for finding in findings {
                    println!(
                        "  {} [{}] {} - {}\n    建议: {}",
                        finding.agent_id,
                        finding.agent_kind,
                        finding.severity,
                        finding.issue,
                        finding.recommended_action
                    );
                }
            }
        }
    }

    Ok(())
}
