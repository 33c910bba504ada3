// Integration tests over the plain data model (no store/queue wiring here).

use scheduler_core::{
    model::{Model, ModelStatus, ModelType},
    task::{Priority, Task, TaskStatus},
    task_log::{LogLevel, TaskLog},
};

#[test]
fn test_task_default_fields() {
    let task = Task::new(1, "text-generation".to_string(), "hello".to_string(), Priority::High);

    assert_eq!(task.model_id, 1);
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.priority, Priority::High);
    assert_eq!(task.max_retries, 3);
    assert_eq!(task.retry_count, 0);
    assert!(task.started_at.is_none());
    assert!(task.completed_at.is_none());
    assert!(task.output.is_none());
}

#[test]
fn test_task_state_machine_happy_path() {
    let mut task = Task::new(1, "text-generation".to_string(), "hi".to_string(), Priority::Medium);
    assert!(!task.status.is_terminal());

    task.status = TaskStatus::Running;
    task.started_at = Some(chrono::Utc::now());
    assert!(!task.status.is_terminal());

    task.status = TaskStatus::Completed;
    task.completed_at = Some(chrono::Utc::now());
    task.output = Some("result".to_string());
    assert!(task.status.is_terminal());
    assert!(task.started_at.is_some());
    assert!(task.completed_at.is_some());
}

#[test]
fn test_task_retry_path_increments_before_limit() {
    let mut task = Task::new(1, "text-generation".to_string(), "hi".to_string(), Priority::Low);
    task.status = TaskStatus::Failed;
    task.error_message = Some("boom".to_string());

    assert!(task.can_retry());
    task.retry_count += 1;
    task.status = TaskStatus::Pending;
    assert_eq!(task.retry_count, 1);

    task.retry_count = task.max_retries;
    task.status = TaskStatus::Failed;
    assert!(!task.can_retry());
}

#[test]
fn test_priority_tiers_map_to_tinyint_values() {
    assert_eq!(Priority::Low as i16, 1);
    assert_eq!(Priority::Medium as i16, 2);
    assert_eq!(Priority::High as i16, 3);
    assert_eq!(Priority::from_i16(3), Some(Priority::High));
    assert_eq!(Priority::from_i16(0), None);
}

#[test]
fn test_priority_ordering_for_dequeue_scans() {
    let mut priorities = vec![Priority::Low, Priority::High, Priority::Medium];
    priorities.sort();
    assert_eq!(priorities, vec![Priority::Low, Priority::Medium, Priority::High]);
    // Queue manager scans high -> medium -> low, i.e. reverse of natural Ord.
    priorities.reverse();
    assert_eq!(priorities, Priority::ALL_DESCENDING.to_vec());
}

#[test]
fn test_model_worker_capacity_gate() {
    let mut model = Model::new("gpt-local".to_string(), ModelType::Local, 2);
    model.status = ModelStatus::Online;
    assert!(model.has_worker_capacity());

    model.current_workers = 2;
    assert!(!model.has_worker_capacity());
}

#[test]
fn test_model_success_never_exceeds_total() {
    let mut model = Model::new("gpt".to_string(), ModelType::Openai, 1);
    model.total_requests = 5;
    model.success_requests = 3;
    assert!(model.success_requests <= model.total_requests);
}

#[test]
fn test_task_log_levels_round_trip_through_json() {
    let log = TaskLog::new(42, LogLevel::Warn, "retrying").with_payload(serde_json::json!({"attempt": 1}));
    let bytes = serde_json::to_vec(&log).unwrap();
    let decoded: TaskLog = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(decoded.task_id, 42);
    assert_eq!(decoded.level, LogLevel::Warn);
    assert_eq!(decoded.payload.unwrap()["attempt"], 1);
}
