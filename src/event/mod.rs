//! 事件模块 - 事件类型、总线与历史

pub mod bus;
pub mod history;
pub mod kind;
pub mod types;

pub use bus::{
    BusStats, EventBus, EventHandler, HandlerFailure, HistoryFilter, PublishOutcome, Selector,
    SubscriptionId,
};
pub use history::{FailedEvent, HistoryEntry, RingBuffer};
pub use kind::EventKind;
pub use types::{Event, EventMetadata, Priority};
