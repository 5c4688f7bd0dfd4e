//! Agent Hub - agent 看板的事件/通知核心
//!
//! 进程内事件总线 + webhook 投递（带重试和投递记录）+
//! 基于心跳和任务时长的健康/瓶颈监控。

pub mod event;
pub mod health;
pub mod registry;
pub mod taskstore;
pub mod webhook;

pub use event::{
    Event, EventBus, EventHandler, EventKind, EventMetadata, HistoryFilter, Priority,
    PublishOutcome, Selector,
};
pub use health::{
    AgentHealthSnapshot, BottleneckDetector, BottleneckFinding, BottleneckSeverity, HealthMonitor,
    HealthReport, HealthThresholds, Liveness,
};
pub use registry::{AgentKind, AgentProfile, AgentRegistry, FileRegistry, MemoryRegistry};
pub use taskstore::{FileTaskStore, MemoryTaskStore, Task, TaskStatus, TaskStore};
pub use webhook::{
    DeliveryRecord, DeliveryStatus, LogSubscriber, RetryPolicy, WebhookDeliveryService,
    WebhookPayload, WebhookSubscriber,
};
