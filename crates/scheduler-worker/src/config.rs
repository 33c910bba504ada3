//! Tuning knobs for the worker pool's background loops.

use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// How often a worker updates its in-memory heartbeat.
    pub heartbeat_interval_secs: u64,
    /// How often the delayed-promoter sweeps `queue:delayed`.
    pub promote_interval_secs: u64,
    /// How often the reaper sweeps `queue:processing`.
    pub reap_interval_secs: u64,
    /// How often the health sweep compares live vs. desired worker counts.
    pub health_sweep_interval_secs: u64,
    /// How long `shutdown` waits for in-flight tasks before giving up.
    pub graceful_shutdown_timeout_secs: u64,
    /// How long an idle worker sleeps between empty `dequeue` polls.
    pub idle_poll_interval_ms: u64,
    pub retry_policy: RetryPolicy,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 30,
            promote_interval_secs: 10,
            reap_interval_secs: 60,
            health_sweep_interval_secs: 30,
            graceful_shutdown_timeout_secs: 30,
            idle_poll_interval_ms: 200,
            retry_policy: RetryPolicy::default(),
        }
    }
}
