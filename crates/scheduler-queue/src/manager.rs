//! The priority queue manager: five named structures backed by column
//! families in a single RocksDB instance -- three FIFO priority lanes,
//! an in-flight processing set, and a delayed set, plus a secondary
//! index for O(1) acknowledgement.

use chrono::Utc;
use rocksdb::{ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use scheduler_core::error::SchedulerError;
use scheduler_core::model::ModelId;
use scheduler_core::task::{Priority, TaskId};
use scheduler_core::Result;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::QueueConfig;
use crate::entry::QueueEntry;
use crate::keys::{decode_score, encode_score_key, encode_seq};

const CF_HIGH: &str = "queue_high";
const CF_MEDIUM: &str = "queue_medium";
const CF_LOW: &str = "queue_low";
const CF_PROCESSING: &str = "queue_processing";
const CF_DELAYED: &str = "queue_delayed";
const CF_INDEX: &str = "queue_index";

const ALL_CFS: [&str; 6] = [CF_HIGH, CF_MEDIUM, CF_LOW, CF_PROCESSING, CF_DELAYED, CF_INDEX];

/// Cardinalities of the five named queue structures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct QueueStatus {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub processing: usize,
    pub delayed: usize,
}

fn lane_cf(priority: Priority) -> &'static str {
    match priority {
        Priority::High => CF_HIGH,
        Priority::Medium => CF_MEDIUM,
        Priority::Low => CF_LOW,
    }
}

/// Per-lane monotonic append counters, recovered from the max existing
/// key at open time so restarts don't reuse sequence numbers.
struct LaneCounters {
    high: AtomicI64,
    medium: AtomicI64,
    low: AtomicI64,
}

impl LaneCounters {
    fn counter(&self, priority: Priority) -> &AtomicI64 {
        match priority {
            Priority::High => &self.high,
            Priority::Medium => &self.medium,
            Priority::Low => &self.low,
        }
    }
}

pub struct QueueManager {
    db: Arc<DB>,
    config: QueueConfig,
    counters: LaneCounters,
}

impl QueueManager {
    pub fn open(config: QueueConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.db_path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&db_opts, &config.db_path, cf_descriptors)?;
        let db = Arc::new(db);

        let high = Self::recover_counter(&db, CF_HIGH)?;
        let medium = Self::recover_counter(&db, CF_MEDIUM)?;
        let low = Self::recover_counter(&db, CF_LOW)?;

        info!(path = %config.db_path, "opened queue store");

        Ok(Self {
            db,
            config,
            counters: LaneCounters {
                high: AtomicI64::new(high),
                medium: AtomicI64::new(medium),
                low: AtomicI64::new(low),
            },
        })
    }

    fn recover_counter(db: &DB, cf_name: &str) -> Result<i64> {
        let cf = db
            .cf_handle(cf_name)
            .ok_or_else(|| SchedulerError::StoreError(format!("missing cf {cf_name}")))?;
        let mut iter = db.iterator_cf(cf, IteratorMode::End);
        match iter.next() {
            Some(Ok((key, _))) => Ok(crate::keys::decode_seq(&key) + 1),
            _ => Ok(0),
        }
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| SchedulerError::StoreError(format!("missing cf {name}")))
    }

    fn total_pending(&self) -> Result<usize> {
        Ok(self.cf_len(CF_HIGH)? + self.cf_len(CF_MEDIUM)? + self.cf_len(CF_LOW)? + self.cf_len(CF_DELAYED)?)
    }

    fn cf_len(&self, name: &str) -> Result<usize> {
        let cf = self.cf(name)?;
        Ok(self.db.iterator_cf(cf, IteratorMode::Start).count())
    }

    /// Append to the lane matching `entry.priority`. Pure list-append;
    /// no dedup.
    pub fn enqueue(&self, entry: &QueueEntry) -> Result<()> {
        if self.total_pending()? >= self.config.max_queue_size {
            return Err(SchedulerError::QueueFull(format!(
                "queue at capacity ({})",
                self.config.max_queue_size
            )));
        }
        self.push_back(entry)
    }

    fn push_back(&self, entry: &QueueEntry) -> Result<()> {
        let cf_name = lane_cf(entry.priority);
        let cf = self.cf(cf_name)?;
        let seq = self.counters.counter(entry.priority).fetch_add(1, Ordering::SeqCst);
        let value = serde_json::to_vec(entry)?;
        self.db.put_cf(cf, encode_seq(seq), value)?;
        debug!(task_id = entry.task_id, lane = cf_name, "enqueued");
        Ok(())
    }

    /// The central admission step for workers.
    ///
    /// Scans `high -> medium -> low`. Within a lane, entries are visited
    /// oldest-first over a snapshot taken at call entry, so the scan is
    /// bounded to the lane's size at that instant and never spins.
    /// A non-matching entry is left untouched -- which is
    /// observationally identical to popping it, inspecting it, and
    /// pushing it back to the exact same head position, without the
    /// extra write.
    pub fn dequeue(&self, model_id: ModelId) -> Result<Option<QueueEntry>> {
        for cf_name in [CF_HIGH, CF_MEDIUM, CF_LOW] {
            if let Some(entry) = self.try_claim_from_lane(cf_name, model_id)? {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    fn try_claim_from_lane(&self, cf_name: &str, model_id: ModelId) -> Result<Option<QueueEntry>> {
        let cf = self.cf(cf_name)?;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            let entry: QueueEntry = serde_json::from_slice(&value)?;
            if entry.model_id != model_id {
                continue;
            }

            let deadline = Utc::now().timestamp() + self.config.task_timeout_secs;
            let processing_key = encode_score_key(deadline, entry.task_id);

            let mut batch = WriteBatch::default();
            batch.delete_cf(cf, &key);
            batch.put_cf(self.cf(CF_PROCESSING)?, &processing_key, &value);
            batch.put_cf(self.cf(CF_INDEX)?, encode_seq(entry.task_id), &processing_key);
            self.db.write(batch)?;

            debug!(task_id = entry.task_id, lane = cf_name, "claimed");
            return Ok(Some(entry));
        }
        Ok(None)
    }

    /// Remove the matching entry from `queue:processing`. O(1) via the
    /// `queue:index` secondary index rather than a linear scan of the
    /// processing set.
    pub fn ack(&self, task_id: TaskId) -> Result<bool> {
        let index_cf = self.cf(CF_INDEX)?;
        let index_key = encode_seq(task_id);
        let Some(processing_key) = self.db.get_cf(index_cf, &index_key)? else {
            warn!(task_id, "ack called with no matching in-flight entry");
            return Ok(false);
        };

        let mut batch = WriteBatch::default();
        batch.delete_cf(self.cf(CF_PROCESSING)?, &processing_key);
        batch.delete_cf(index_cf, &index_key);
        self.db.write(batch)?;
        debug!(task_id, "acked");
        Ok(true)
    }

    /// `delay > 0` -> `queue:delayed` scored `now + delay`; otherwise a
    /// fresh append to the matching priority lane. Used by the lifecycle
    /// service's retry path and by the reaper.
    pub fn requeue(&self, entry: &QueueEntry, delay_secs: i64) -> Result<()> {
        if delay_secs > 0 {
            let score = Utc::now().timestamp() + delay_secs;
            let key = encode_score_key(score, entry.task_id);
            let value = serde_json::to_vec(entry)?;
            self.db.put_cf(self.cf(CF_DELAYED)?, key, value)?;
            debug!(task_id = entry.task_id, delay_secs, "requeued to delayed set");
            Ok(())
        } else {
            self.push_back(entry)
        }
    }

    /// Move all `queue:delayed` members with score <= now back into
    /// their priority lane.
    pub fn promote_delayed(&self, now: i64) -> Result<usize> {
        let cf = self.cf(CF_DELAYED)?;
        let mut ripe = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            if decode_score(&key) > now {
                break;
            }
            ripe.push((key.to_vec(), value.to_vec()));
        }

        for (key, value) in &ripe {
            let entry: QueueEntry = serde_json::from_slice(value)?;
            let mut batch = WriteBatch::default();
            batch.delete_cf(cf, key);
            self.db.write(batch)?;
            self.push_back(&entry)?;
        }

        if !ripe.is_empty() {
            debug!(count = ripe.len(), "promoted delayed entries");
        }
        Ok(ripe.len())
    }

    /// Pop all `queue:processing` members with score <= now and requeue
    /// them via the delayed set with the configured retry delay. Does
    /// not consume a retry slot -- that accounting lives in
    /// `scheduler-store`, which the caller coordinates separately.
    pub fn reap_expired(&self, now: i64) -> Result<Vec<QueueEntry>> {
        let cf = self.cf(CF_PROCESSING)?;
        let mut expired = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            if decode_score(&key) > now {
                break;
            }
            expired.push((key.to_vec(), value.to_vec()));
        }

        let mut reaped = Vec::new();
        for (key, value) in &expired {
            let entry: QueueEntry = serde_json::from_slice(value)?;
            let mut batch = WriteBatch::default();
            batch.delete_cf(cf, key);
            batch.delete_cf(self.cf(CF_INDEX)?, encode_seq(entry.task_id));
            self.db.write(batch)?;
            self.requeue(&entry, self.config.reap_retry_delay_secs)?;
            reaped.push(entry);
        }

        if !reaped.is_empty() {
            warn!(count = reaped.len(), "reaped expired in-flight entries");
        }
        Ok(reaped)
    }

    /// Remove `task_id`'s entry from wherever it sits among the three
    /// lanes and the delayed set -- used when a still-pending task is
    /// cancelled, so a terminal row never leaves a queue entry behind.
    /// Not on the hot path (dequeue/ack are), so a linear scan per CF
    /// is an acceptable cost here.
    pub fn remove_pending(&self, task_id: TaskId) -> Result<bool> {
        for cf_name in [CF_HIGH, CF_MEDIUM, CF_LOW, CF_DELAYED] {
            let cf = self.cf(cf_name)?;
            for item in self.db.iterator_cf(cf, IteratorMode::Start) {
                let (key, value) = item?;
                let entry: QueueEntry = serde_json::from_slice(&value)?;
                if entry.task_id == task_id {
                    self.db.delete_cf(cf, &key)?;
                    debug!(task_id, lane = cf_name, "removed pending entry on cancel");
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    pub fn status(&self) -> Result<QueueStatus> {
        Ok(QueueStatus {
            high: self.cf_len(CF_HIGH)?,
            medium: self.cf_len(CF_MEDIUM)?,
            low: self.cf_len(CF_LOW)?,
            processing: self.cf_len(CF_PROCESSING)?,
            delayed: self.cf_len(CF_DELAYED)?,
        })
    }
}
