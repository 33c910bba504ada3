//! The worker pool manager: sizes the worker population per model,
//! owns the live worker registry, and runs the reaper and
//! delayed-promoter background loops. The health sweep logs drift
//! between live and desired worker counts for an online model, and
//! drains any model found offline while still holding live workers; it
//! does not respawn an exited worker on its own.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use scheduler_adapter::AdapterRegistry;
use scheduler_core::model::ModelId;
use scheduler_core::Result;
use scheduler_lifecycle::{ModelRegistryService, TaskLifecycleService};
use scheduler_queue::QueueManager;
use scheduler_store::ModelStore;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::WorkerPoolConfig;
use crate::worker::{self, WorkerHandle, WorkerStatus};

/// One spawned worker: its status handle plus the join handle for its
/// background task, so shutdown can wait for it to actually exit.
struct WorkerSlot {
    handle: Arc<WorkerHandle>,
    join: JoinHandle<()>,
}

/// Owns the set of live workers, grouped per model, and the
/// delayed-promoter/reaper/health-sweep background loops.
pub struct WorkerPoolManager {
    config: WorkerPoolConfig,
    lifecycle: Arc<TaskLifecycleService>,
    model_registry: Arc<ModelRegistryService>,
    model_store: Arc<ModelStore>,
    queue: Arc<QueueManager>,
    adapters: Arc<AdapterRegistry>,
    workers: Arc<DashMap<ModelId, Vec<WorkerSlot>>>,
    /// One shutdown channel per model, so draining `model_id`'s workers
    /// (e.g. on a transition away from `online`) never signals any
    /// other model's workers.
    worker_shutdown: Arc<DashMap<ModelId, broadcast::Sender<()>>>,
    /// Shutdown signal for the pool-wide background loops only
    /// (promoter/reaper/health-sweep), unrelated to any one model's
    /// worker population.
    background_shutdown_tx: broadcast::Sender<()>,
    background: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPoolManager {
    pub fn new(
        config: WorkerPoolConfig,
        lifecycle: Arc<TaskLifecycleService>,
        model_registry: Arc<ModelRegistryService>,
        model_store: Arc<ModelStore>,
        queue: Arc<QueueManager>,
        adapters: Arc<AdapterRegistry>,
    ) -> Self {
        let (background_shutdown_tx, _) = broadcast::channel(16);
        Self {
            config,
            lifecycle,
            model_registry,
            model_store,
            queue,
            adapters,
            workers: Arc::new(DashMap::new()),
            worker_shutdown: Arc::new(DashMap::new()),
            background_shutdown_tx,
            background: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Spin up `max_workers` workers for every currently-`online` model,
    /// then start the delayed-promoter, reaper, and health-sweep loops.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        for model in self.model_registry.list_online().await? {
            self.spin_up(model.id, model.max_workers as usize).await?;
        }

        self.spawn_promoter();
        self.spawn_reaper();
        self.spawn_health_sweep();
        Ok(())
    }

    fn shutdown_sender(&self, model_id: ModelId) -> broadcast::Sender<()> {
        self.worker_shutdown
            .entry(model_id)
            .or_insert_with(|| broadcast::channel(16).0)
            .clone()
    }

    /// Create `count` workers bound to `model_id`, incrementing the
    /// model's `current_workers` counter once per successful spawn.
    pub async fn spin_up(&self, model_id: ModelId, count: usize) -> Result<()> {
        let shutdown_tx = self.shutdown_sender(model_id);
        let mut slots = Vec::with_capacity(count);
        for i in 0..count {
            if !self.model_registry.increment_worker_count(model_id).await? {
                warn!(model_id, "refusing to spin up worker past max_workers cap");
                break;
            }

            let worker_id = format!("model-{model_id}-worker-{i}");
            let (handle, join) = worker::spawn(
                worker_id,
                model_id,
                self.lifecycle.clone(),
                self.model_store.clone(),
                self.queue.clone(),
                self.adapters.clone(),
                self.config.retry_policy.clone(),
                Duration::from_millis(self.config.idle_poll_interval_ms),
                shutdown_tx.subscribe(),
            );
            slots.push(WorkerSlot { handle, join });
        }

        let spawned = slots.len();
        self.workers.entry(model_id).or_default().extend(slots);
        info!(model_id, spawned, "spun up workers");
        Ok(())
    }

    /// Stop every worker bound to `model_id` and wait (bounded to
    /// `graceful_shutdown_timeout_secs`) for them to exit, decrementing
    /// the model's `current_workers` counter per exit. Workers only
    /// observe the cancellation signal between tasks, never mid-invocation.
    /// Only `model_id`'s own channel is signalled, so other models' live
    /// workers are unaffected.
    pub async fn spin_down(&self, model_id: ModelId) -> Result<()> {
        let Some((_, slots)) = self.workers.remove(&model_id) else {
            return Ok(());
        };

        if let Some((_, tx)) = self.worker_shutdown.remove(&model_id) {
            let _ = tx.send(());
        }
        let timeout = Duration::from_secs(self.config.graceful_shutdown_timeout_secs);

        for slot in slots {
            if tokio::time::timeout(timeout, slot.join).await.is_err() {
                warn!(model_id, worker_id = %slot.handle.worker_id, "worker did not exit within shutdown timeout");
            }
            self.model_registry.decrement_worker_count(model_id).await?;
        }

        info!(model_id, "spun down workers");
        Ok(())
    }

    /// Stop every worker across every model. Called on process shutdown.
    pub async fn shutdown_all(&self) -> Result<()> {
        let model_ids: Vec<ModelId> = self.workers.iter().map(|e| *e.key()).collect();
        for model_id in model_ids {
            self.spin_down(model_id).await?;
        }

        let _ = self.background_shutdown_tx.send(());
        for join in self.background.lock().expect("background loop lock").drain(..) {
            join.abort();
        }
        Ok(())
    }

    /// Dashboard-facing snapshot of every live worker.
    pub fn worker_statuses(&self) -> Vec<WorkerStatus> {
        self.workers
            .iter()
            .flat_map(|entry| entry.value().iter().map(|slot| slot.handle.status()).collect::<Vec<_>>())
            .collect()
    }

    /// Live worker count for one model, as observed by this process --
    /// the quantity `current_workers` in the model row is supposed to
    /// track.
    pub fn live_count(&self, model_id: ModelId) -> usize {
        self.workers.get(&model_id).map(|s| s.value().len()).unwrap_or(0)
    }

    fn spawn_promoter(&self) {
        let queue = self.queue.clone();
        let interval = Duration::from_secs(self.config.promote_interval_secs);
        let mut shutdown_rx = self.background_shutdown_tx.subscribe();

        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = shutdown_rx.recv() => break,
                }
                let now = chrono::Utc::now().timestamp();
                match queue.promote_delayed(now) {
                    Ok(0) => {}
                    Ok(n) => info!(count = n, "promoted delayed entries"),
                    Err(e) => warn!(error = %e, "delayed-promoter sweep failed"),
                }
            }
        });
        self.background.lock().expect("background loop lock").push(join);
    }

    /// Repatriates in-flight entries whose lease has expired. Reaping
    /// does not consume a retry slot: `TaskLifecycleService::reap` only
    /// resets `started_at`/status, leaving `retry_count` untouched.
    fn spawn_reaper(&self) {
        let queue = self.queue.clone();
        let lifecycle = self.lifecycle.clone();
        let interval = Duration::from_secs(self.config.reap_interval_secs);
        let mut shutdown_rx = self.background_shutdown_tx.subscribe();

        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = shutdown_rx.recv() => break,
                }
                let now = chrono::Utc::now().timestamp();
                match queue.reap_expired(now) {
                    Ok(entries) if entries.is_empty() => {}
                    Ok(entries) => {
                        warn!(count = entries.len(), "reaping expired in-flight entries");
                        for entry in entries {
                            if let Err(e) = lifecycle.reap(entry.task_id).await {
                                warn!(task_id = entry.task_id, error = %e, "failed to reset reaped task row");
                            }
                        }
                    }
                    Err(e) => warn!(error = %e, "reaper sweep failed"),
                }
            }
        });
        self.background.lock().expect("background loop lock").push(join);
    }

    /// Compares the live worker count against every model's desired
    /// count. For an `online` model this just logs drift (restart
    /// policy is best-effort: this does not respawn a worker whose task
    /// panicked). For a model that is no longer `online` but still has
    /// live workers -- e.g. its status changed underneath the pool
    /// manager by a route other than `set_model_status` -- this is the
    /// sweep's one corrective action: it drains that model's workers via
    /// `spin_down`, closing the gap a drift-only sweep would otherwise
    /// leave open indefinitely.
    fn spawn_health_sweep(self: &Arc<Self>) {
        let this = self.clone();
        let interval = Duration::from_secs(self.config.health_sweep_interval_secs);
        let mut shutdown_rx = self.background_shutdown_tx.subscribe();

        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = shutdown_rx.recv() => break,
                }
                match this.model_registry.list().await {
                    Ok(models) => {
                        for model in models {
                            let live = this.live_count(model.id);
                            if model.status == scheduler_core::model::ModelStatus::Online {
                                if live != model.max_workers as usize {
                                    warn!(
                                        model_id = model.id,
                                        live,
                                        desired = model.max_workers,
                                        "worker count drift detected"
                                    );
                                }
                            } else if live > 0 {
                                warn!(model_id = model.id, live, status = ?model.status, "model offline with live workers, draining");
                                if let Err(e) = this.spin_down(model.id).await {
                                    warn!(model_id = model.id, error = %e, "health sweep failed to drain offline model");
                                }
                            }
                        }
                    }
                    Err(e) => warn!(error = %e, "health sweep failed to list models"),
                }
            }
        });
        self.background.lock().expect("background loop lock").push(join);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scheduler_core::model::{Model, ModelStatus, ModelType};
    use scheduler_store::{connect, ModelStore, StoreConfig, TaskLogStore, TaskStore};
    use tempfile::TempDir;

    async fn setup() -> (Arc<WorkerPoolManager>, Arc<TaskLifecycleService>, ModelId, TempDir) {
        let pool = connect(&StoreConfig::default()).await.unwrap();
        let models = ModelStore::new(pool.clone());
        let tasks = TaskStore::new(pool.clone());
        let logs = TaskLogStore::new(pool);

        let mut model = Model::new("gpt".into(), ModelType::Openai, 2);
        model.status = ModelStatus::Online;
        let model = models.create(&model).await.unwrap();

        let dir = TempDir::new().unwrap();
        let queue_config = scheduler_queue::QueueConfig::default()
            .with_db_path(dir.path().to_str().unwrap().to_string());
        let queue = Arc::new(QueueManager::open(queue_config).unwrap());

        let model_store = Arc::new(models.clone());
        let model_registry = Arc::new(ModelRegistryService::new(models, tasks.clone()));
        let lifecycle = Arc::new(TaskLifecycleService::new(tasks, model_store.as_ref().clone(), logs, queue.clone()));
        let adapters = Arc::new(AdapterRegistry::new());

        let manager = Arc::new(WorkerPoolManager::new(
            WorkerPoolConfig {
                idle_poll_interval_ms: 10,
                ..WorkerPoolConfig::default()
            },
            lifecycle.clone(),
            model_registry,
            model_store,
            queue,
            adapters,
        ));

        (manager, lifecycle, model.id, dir)
    }

    #[tokio::test]
    async fn spin_up_bumps_current_workers_up_to_the_cap() {
        let (manager, _lifecycle, model_id, _dir) = setup().await;
        manager.spin_up(model_id, 2).await.unwrap();
        assert_eq!(manager.live_count(model_id), 2);

        // A third request is refused by the store-level cap.
        manager.spin_up(model_id, 1).await.unwrap();
        assert_eq!(manager.live_count(model_id), 2);
    }

    #[tokio::test]
    async fn spin_down_waits_for_workers_to_exit() {
        let (manager, _lifecycle, model_id, _dir) = setup().await;
        manager.spin_up(model_id, 1).await.unwrap();
        manager.spin_down(model_id).await.unwrap();
        assert_eq!(manager.live_count(model_id), 0);
    }

    #[tokio::test]
    async fn spin_down_of_one_model_leaves_other_models_workers_running() {
        let (manager, _lifecycle, model_a, _dir) = setup().await;
        let mut model_b = Model::new("claude".into(), ModelType::Openai, 2);
        model_b.status = ModelStatus::Online;
        let model_b = manager.model_registry.create(model_b).await.unwrap();

        manager.spin_up(model_a, 1).await.unwrap();
        manager.spin_up(model_b.id, 1).await.unwrap();

        manager.spin_down(model_a).await.unwrap();
        assert_eq!(manager.live_count(model_a), 0);
        assert_eq!(manager.live_count(model_b.id), 1, "model B's workers must survive model A's spin_down");
    }

    #[tokio::test]
    async fn echo_adapter_completes_a_submitted_task_end_to_end() {
        let (manager, lifecycle, model_id, _dir) = setup().await;
        manager.spin_up(model_id, 1).await.unwrap();

        let task = lifecycle
            .create(model_id, "text-generation".into(), "hello".into(), None)
            .await
            .unwrap();

        let mut completed = None;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let reloaded = lifecycle.get(task.id).await.unwrap().unwrap();
            if reloaded.status.is_terminal() {
                completed = Some(reloaded);
                break;
            }
        }

        let completed = completed.expect("task should complete within the poll window");
        assert_eq!(completed.status, scheduler_core::task::TaskStatus::Completed);
        assert_eq!(completed.output.as_deref(), Some("hello"));

        manager.spin_down(model_id).await.unwrap();
    }
}
