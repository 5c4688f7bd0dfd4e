//! 有界历史环形缓冲区
//!
//! 固定容量的 FIFO 环，装满后最老的条目先被淘汰。
//! 只用于排查和观测，不提供重放保证。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::types::Event;

/// 固定容量 FIFO 环
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// 追加条目，超出容量时淘汰最老的
    pub fn push(&mut self, entry: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 从最新到最旧迭代
    pub fn iter_newest_first(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().rev()
    }

    /// 返回最近 N 条（最新在前）
    pub fn recent(&self, limit: usize) -> Vec<T>
    where
        T: Clone,
    {
        self.iter_newest_first().take(limit).cloned().collect()
    }
}

/// 已发布事件的历史条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// 事件本体
    pub event: Event,
    /// 被调用的 handler 数量
    pub handlers_invoked: usize,
    /// 失败的 handler 数量
    pub handler_failures: usize,
    /// 记录时间
    pub recorded_at: DateTime<Utc>,
}

/// handler 执行失败记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedEvent {
    /// 出错的事件
    pub event: Event,
    /// handler 名称
    pub handler: String,
    /// 错误信息
    pub error: String,
    /// 记录时间
    pub recorded_at: DateTime<Utc>,
}
