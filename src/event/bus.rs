//! 进程内事件总线
//!
//! 解耦事件生产方和消费方（webhook 分发、日志等）。
//! handler 按注册顺序同步调用；单个 handler 失败被隔离记录，
//! 不会中断其余 handler，也不会向发布方抛出。

use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use super::history::{FailedEvent, HistoryEntry, RingBuffer};
use super::kind::EventKind;
use super::types::Event;

/// 默认事件历史容量
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;
/// 默认失败记录容量
pub const DEFAULT_FAILED_CAPACITY: usize = 50;
/// 历史查询默认条数
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// 事件 handler trait
pub trait EventHandler: Send + Sync {
    /// handler 名称（用于日志和失败记录）
    fn name(&self) -> &str;

    /// 处理事件；返回 Err 表示处理失败（由总线记录，不向外传播）
    fn handle(&self, event: &Event) -> Result<()>;
}

/// 订阅选择器
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// 只匹配指定类型
    Kind(EventKind),
    /// 通配：匹配所有事件
    All,
}

impl Selector {
    fn matches(&self, kind: &EventKind) -> bool {
        match self {
            Selector::Kind(k) => k == kind,
            Selector::All => true,
        }
    }
}

/// 订阅 ID（用于退订）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    selector: Selector,
    handler: Arc<dyn EventHandler>,
}

/// 单个 handler 的失败信息（随发布结果返回）
#[derive(Debug, Clone)]
pub struct HandlerFailure {
    pub handler: String,
    pub error: String,
}

/// 一次发布的结果
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    /// 被调用的 handler 数量
    pub handlers_invoked: usize,
    /// 失败的 handler 列表（作为数据返回，不抛出）
    pub failures: Vec<HandlerFailure>,
}

/// 总线统计
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct BusStats {
    /// 已发布事件总数
    pub total_published: u64,
    /// handler 失败总数
    pub total_handler_failures: u64,
    /// 按事件类型计数
    pub by_kind: HashMap<String, u64>,
    /// 按来源计数
    pub by_source: HashMap<String, u64>,
}

/// 历史查询过滤器
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub kind: Option<EventKind>,
    pub source: Option<String>,
    pub limit: Option<usize>,
}

struct BusInner {
    next_id: u64,
    subscriptions: Vec<Subscription>,
    history: RingBuffer<HistoryEntry>,
    failed: RingBuffer<FailedEvent>,
    stats: BusStats,
}

/// 事件总线
///
/// 内部状态由单个互斥锁保护：发布与订阅变更可以并发调用，
/// 每次发布整体串行执行，历史追加顺序与逻辑事件顺序一致。
pub struct EventBus {
    inner: Mutex<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY, DEFAULT_FAILED_CAPACITY)
    }

    /// 指定历史容量（测试用）
    pub fn with_capacity(history_capacity: usize, failed_capacity: usize) -> Self {
        Self {
            inner: Mutex::new(BusInner {
                next_id: 0,
                subscriptions: Vec::new(),
                history: RingBuffer::new(history_capacity),
                failed: RingBuffer::new(failed_capacity),
                stats: BusStats::default(),
            }),
        }
    }

    /// 订阅事件，返回订阅 ID
    pub fn subscribe(&self, selector: Selector, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = SubscriptionId(inner.next_id);
        debug!(handler = handler.name(), "registering event subscription");
        inner.subscriptions.push(Subscription {
            id,
            selector,
            handler,
        });
        id
    }

    /// 退订；返回是否找到对应订阅
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.lock();
        let before = inner.subscriptions.len();
        inner.subscriptions.retain(|s| s.id != id);
        inner.subscriptions.len() != before
    }

    /// 发布事件
    ///
    /// 空事件类型被同步拒绝；handler 失败被收集进返回值并记入
    /// 失败历史，发布调用本身总是正常返回。
    pub fn publish(&self, event: Event) -> Result<PublishOutcome> {
        if event.kind.is_empty() {
            bail!("cannot publish event with empty kind");
        }

        let mut inner = self.lock();

        // 按注册顺序调用匹配的 handler
        let handlers: Vec<Arc<dyn EventHandler>> = inner
            .subscriptions
            .iter()
            .filter(|s| s.selector.matches(&event.kind))
            .map(|s| s.handler.clone())
            .collect();

        let mut failures = Vec::new();
        for handler in &handlers {
            if let Err(e) = handler.handle(&event) {
                warn!(
                    handler = handler.name(),
                    kind = %event.kind,
                    error = %e,
                    "event handler failed"
                );
                failures.push(HandlerFailure {
                    handler: handler.name().to_string(),
                    error: e.to_string(),
                });
                inner.failed.push(FailedEvent {
                    event: event.clone(),
                    handler: handler.name().to_string(),
                    error: e.to_string(),
                    recorded_at: chrono::Utc::now(),
                });
            }
        }

        inner.history.push(HistoryEntry {
            event: event.clone(),
            handlers_invoked: handlers.len(),
            handler_failures: failures.len(),
            recorded_at: chrono::Utc::now(),
        });

        inner.stats.total_published += 1;
        inner.stats.total_handler_failures += failures.len() as u64;
        *inner
            .stats
            .by_kind
            .entry(event.kind.as_str().to_string())
            .or_insert(0) += 1;
        *inner
            .stats
            .by_source
            .entry(event.metadata.source.clone())
            .or_insert(0) += 1;

        Ok(PublishOutcome {
            handlers_invoked: handlers.len(),
            failures,
        })
    }

    /// 当前统计快照
    pub fn stats(&self) -> BusStats {
        self.lock().stats.clone()
    }

    /// 查询历史（最新在前）
    pub fn history(&self, filter: HistoryFilter) -> Vec<HistoryEntry> {
        let inner = self.lock();
        let limit = filter.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        inner
            .history
            .iter_newest_first()
            .filter(|entry| {
                filter
                    .kind
                    .as_ref()
                    .map_or(true, |k| &entry.event.kind == k)
            })
            .filter(|entry| {
                filter
                    .source
                    .as_ref()
                    .map_or(true, |s| &entry.event.metadata.source == s)
            })
            .take(limit)
            .cloned()
            .collect()
    }

    /// 最近的 handler 失败记录（最新在前）
    pub fn failed_events(&self, limit: usize) -> Vec<FailedEvent> {
        self.lock().failed.recent(limit)
    }

    /// 当前订阅数量
    pub fn subscription_count(&self) -> usize {
        self.lock().subscriptions.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BusInner> {
        // 锁内代码不 panic，中毒锁直接取回内部状态
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
