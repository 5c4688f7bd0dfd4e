//! Retry policy for webhook delivery
//!
//! Retry behavior is a first-class value passed into the delivery
//! service, so backoff schedules are testable instead of living as
//! magic numbers inside the send loop.

use std::time::Duration;

/// Bounded exponential backoff policy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum delivery attempts (including the first one)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Backoff multiplier (e.g. 2.0 for exponential)
    pub backoff_multiplier: f64,
    /// Cap applied to every computed delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Fast policy for tests: tiny delays, same attempt bound
    pub fn fast_for_test() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(50),
        }
    }

    /// Delay to sleep after `failed_attempts` attempts have failed.
    ///
    /// failed_attempts = 1 -> base, 2 -> base*m, 3 -> base*m^2, capped.
    pub fn delay_after(&self, failed_attempts: u32) -> Duration {
        let exp = failed_attempts.saturating_sub(1);
        let factor = self.backoff_multiplier.max(1.0).powi(exp as i32);
        let millis = self.base_delay.as_millis() as f64 * factor;
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let policy = RetryPolicy::default();
        // 1s, 2s, 4s...
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
        // 800ms would exceed the cap
        assert_eq!(policy.delay_after(4), Duration::from_millis(500));
        assert_eq!(policy.delay_after(9), Duration::from_millis(500));
    }

    #[test]
    fn test_multiplier_below_one_treated_as_constant() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            backoff_multiplier: 0.5,
            max_delay: Duration::from_secs(1),
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(100));
    }
}
