//! RocksDB-backed priority queue for pending and in-flight tasks.

pub mod config;
pub mod entry;
pub mod keys;
pub mod manager;

pub use config::QueueConfig;
pub use entry::QueueEntry;
pub use manager::{QueueManager, QueueStatus};

#[cfg(test)]
mod tests {
    use super::*;
    use scheduler_core::task::Priority;
    use tempfile::TempDir;

    fn open_test() -> (QueueManager, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = QueueConfig::default().with_db_path(dir.path().to_str().unwrap().to_string());
        (QueueManager::open(config).unwrap(), dir)
    }

    #[test]
    fn reopening_an_existing_store_resumes_sequence_numbers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_str().unwrap().to_string();

        {
            let config = QueueConfig::default().with_db_path(path.clone());
            let q = QueueManager::open(config).unwrap();
            q.enqueue(&QueueEntry::new(1, 10, Priority::High)).unwrap();
            q.enqueue(&QueueEntry::new(2, 10, Priority::High)).unwrap();
        }

        let config = QueueConfig::default().with_db_path(path);
        let q = QueueManager::open(config).unwrap();
        q.enqueue(&QueueEntry::new(3, 10, Priority::High)).unwrap();

        let order: Vec<_> = (0..3).map(|_| q.dequeue(10).unwrap().unwrap().task_id).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn end_to_end_lifecycle_enqueue_dequeue_ack() {
        let (q, _dir) = open_test();
        let entry = QueueEntry::new(1, 42, Priority::Medium);
        q.enqueue(&entry).unwrap();

        let claimed = q.dequeue(42).unwrap().expect("should claim the entry");
        assert_eq!(claimed.task_id, 1);

        let status = q.status().unwrap();
        assert_eq!(status.medium, 0);
        assert_eq!(status.processing, 1);

        assert!(q.ack(1).unwrap());
        let status = q.status().unwrap();
        assert_eq!(status.processing, 0);
    }

    #[test]
    fn end_to_end_failure_path_requeues_with_backoff() {
        let (q, _dir) = open_test();
        let entry = QueueEntry::new(1, 42, Priority::Low);
        q.enqueue(&entry).unwrap();
        let claimed = q.dequeue(42).unwrap().unwrap();
        q.ack(1).unwrap();

        q.requeue(&claimed, 30).unwrap();
        assert_eq!(q.status().unwrap().delayed, 1);
        assert_eq!(q.status().unwrap().low, 0);
    }
}
