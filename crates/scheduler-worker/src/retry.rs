//! Backoff schedule applied to retryable adapter failures.

/// Exponential backoff: `base_delay_secs * 2^attempt`, capped at
/// `max_delay_secs`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub base_delay_secs: i64,
    pub max_delay_secs: i64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_secs: 5,
            max_delay_secs: 3600,
        }
    }
}

impl RetryPolicy {
    pub fn new(base_delay_secs: i64, max_delay_secs: i64) -> Self {
        Self {
            base_delay_secs,
            max_delay_secs,
        }
    }

    /// Delay before the `attempt`-th retry (0-indexed, i.e. the value
    /// of `task.retry_count` at the moment of failure).
    pub fn delay_for(&self, attempt: i32) -> i64 {
        let exponent = attempt.clamp(0, 20) as u32;
        let delay = self.base_delay_secs.saturating_mul(2i64.saturating_pow(exponent));
        delay.min(self.max_delay_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_exponentially_then_caps() {
        let policy = RetryPolicy::default();
        let delays: Vec<i64> = (0..5).map(|a| policy.delay_for(a)).collect();
        assert_eq!(delays, vec![5, 10, 20, 40, 80]);
        assert_eq!(policy.delay_for(100), 3600);
    }

    #[test]
    fn custom_policy_respects_its_own_cap() {
        let policy = RetryPolicy::new(10, 45);
        assert_eq!(policy.delay_for(0), 10);
        assert_eq!(policy.delay_for(1), 20);
        assert_eq!(policy.delay_for(2), 40);
        assert_eq!(policy.delay_for(3), 45);
    }
}
