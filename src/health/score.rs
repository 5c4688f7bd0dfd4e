//! Health score factors - normalized sub-scores and weighted composite
//!
//! Each factor lives in [0, 100]; the composite is
//! `0.6 * success_rate + 0.2 * speed_factor + 0.2 * uptime_factor`,
//! clamped to [0, 100] regardless of inputs.

use chrono::Duration;

use crate::taskstore::{Task, TaskStatus};

/// Clamp an arbitrary float into the [0, 100] score range
pub fn clamp_score(value: f64) -> u8 {
    value.clamp(0.0, 100.0).round() as u8
}

/// Completed vs failed ratio, 0..100. No finished tasks counts as 100.
pub fn success_rate(tasks: &[Task]) -> f64 {
    let completed = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();
    let failed = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Failed)
        .count();
    let finished = completed + failed;
    if finished == 0 {
        100.0
    } else {
        completed as f64 / finished as f64 * 100.0
    }
}

/// Mean completed-task duration against the expected duration, 0..100.
///
/// Faster than expected is 100; slower decays proportionally.
/// No measurable durations counts as 100.
pub fn speed_factor(tasks: &[Task], expected: Duration) -> f64 {
    let durations: Vec<Duration> = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .filter_map(|t| t.duration())
        .collect();
    if durations.is_empty() {
        return 100.0;
    }

    let total_secs: i64 = durations.iter().map(|d| d.num_seconds().max(0)).sum();
    let mean_secs = total_secs as f64 / durations.len() as f64;
    let expected_secs = expected.num_seconds().max(1) as f64;

    if mean_secs <= expected_secs {
        100.0
    } else {
        expected_secs / mean_secs * 100.0
    }
}

/// Heartbeat recency, 0..100.
///
/// No heartbeat is 0; a fresh heartbeat is 100, decaying linearly to 0
/// at the offline threshold.
pub fn uptime_factor(heartbeat_age: Option<Duration>, offline_after: Duration) -> f64 {
    let age = match heartbeat_age {
        Some(a) => a,
        None => return 0.0,
    };
    let age_secs = age.num_seconds().max(0) as f64;
    let window_secs = offline_after.num_seconds().max(1) as f64;
    if age_secs >= window_secs {
        0.0
    } else {
        (1.0 - age_secs / window_secs) * 100.0
    }
}

/// Weighted composite, clamped to [0, 100]
pub fn composite(success: f64, speed: f64, uptime: f64) -> u8 {
    clamp_score(0.6 * success + 0.2 * speed + 0.2 * uptime)
}
