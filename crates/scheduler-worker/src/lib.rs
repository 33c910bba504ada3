//! The worker and the worker pool manager: one task per
//! `(worker_id, model_id)` pair, and the component that sizes,
//! spins up/down, and sweeps that population.

pub mod config;
pub mod pool;
pub mod retry;
pub mod worker;

pub use config::WorkerPoolConfig;
pub use pool::WorkerPoolManager;
pub use retry::RetryPolicy;
pub use worker::{WorkerHandle, WorkerState, WorkerStatus};
