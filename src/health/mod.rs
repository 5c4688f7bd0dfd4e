//! 健康模块 - 存活状态、健康评分与瓶颈检测

pub mod bottleneck;
pub mod monitor;
pub mod score;

pub use bottleneck::{
    BottleneckDetector, BottleneckFinding, BottleneckSeverity, BottleneckThresholds,
};
pub use monitor::{AgentHealthSnapshot, HealthMonitor, HealthReport, HealthThresholds, Liveness};
