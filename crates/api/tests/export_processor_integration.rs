//! Integration tests for the export processor.
//!
//! The processor runs against an in-memory job store, so these tests need
//! no database.
//!
//! Run with: cargo test --test export_processor_integration

mod common;

use common::{
    application, applications_only, test_processor, test_settings, wait_for_terminal, wait_until,
    MemoryStorage,
};
use domain::models::{DataTypes, ExportFormat, ExportJobStatus};
use serde_json::json;
use std::time::Duration;
use training_portal_api::jobs::ExportProcessor;
use training_portal_api::services::ExportProcessingError;

fn q1_filters() -> serde_json::Value {
    json!({
        "dateRange": "custom",
        "startDate": "2024-01-01",
        "endDate": "2024-03-31"
    })
}

// ============================================================================
// Job lifecycle
// ============================================================================

#[tokio::test]
async fn test_csv_export_completes() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = MemoryStorage::new();
    storage.set_applications(vec![application("Sara"), application("Omar")]);
    let id = storage.insert_job("Q1", applications_only(), q1_filters(), ExportFormat::Csv);

    let processor = test_processor(&storage, tmp.path());
    assert_eq!(processor.poll_once().await.unwrap(), 1);

    let job = wait_for_terminal(&storage, id).await;
    assert_eq!(job.status, ExportJobStatus::Completed);
    assert_eq!(job.progress, 100);
    assert!(job.completed_at.is_some());
    assert!(job.error_message.is_none());

    let path = job.file_path.expect("completed job has a file path");
    assert!(path.ends_with(".csv"));
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(job.file_size, Some(contents.len() as i64));

    let contents = contents.strip_prefix('\u{FEFF}').expect("csv starts with a BOM");
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Type,ID,Name"));
    assert!(lines[1].starts_with("Application,"));
    assert!(lines[1].contains("Sara"));
}

#[tokio::test]
async fn test_progress_only_moves_forward() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = MemoryStorage::new();
    storage.set_applications(vec![application("Sara")]);
    let id = storage.insert_job("Q1", applications_only(), q1_filters(), ExportFormat::Json);

    let processor = test_processor(&storage, tmp.path());
    processor.poll_once().await.unwrap();
    wait_for_terminal(&storage, id).await;

    assert_eq!(storage.progress_history(id), vec![0, 75, 90, 100]);
}

#[tokio::test]
async fn test_every_format_renders() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = MemoryStorage::new();
    storage.set_applications(vec![application("Sara")]);

    let ids: Vec<_> = [
        ExportFormat::Excel,
        ExportFormat::Csv,
        ExportFormat::Pdf,
        ExportFormat::Json,
    ]
    .into_iter()
    .map(|format| {
        let id = storage.insert_job("All formats", applications_only(), json!({}), format);
        (id, format)
    })
    .collect();

    let processor = test_processor(&storage, tmp.path());
    assert_eq!(processor.poll_once().await.unwrap(), 4);

    for (id, format) in ids {
        let job = wait_for_terminal(&storage, id).await;
        assert_eq!(job.status, ExportJobStatus::Completed, "{:?}", job.error_message);
        let path = job.file_path.unwrap();
        assert!(path.ends_with(&format!(".{}", format.extension())));
        assert!(job.file_size.unwrap() > 0);
    }
}

#[tokio::test]
async fn test_jobs_with_same_name_get_distinct_files() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = MemoryStorage::new();
    let first = storage.insert_job("Report", applications_only(), json!({}), ExportFormat::Csv);
    let second = storage.insert_job("Report", applications_only(), json!({}), ExportFormat::Csv);

    let processor = test_processor(&storage, tmp.path());
    processor.poll_once().await.unwrap();

    let first = wait_for_terminal(&storage, first).await;
    let second = wait_for_terminal(&storage, second).await;
    assert_ne!(first.file_path, second.file_path);
}

#[tokio::test]
async fn test_longest_accepted_name_completes() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = MemoryStorage::new();
    storage.set_applications(vec![application("Sara")]);
    let name = "A".repeat(255);

    let ids: Vec<_> = [ExportFormat::Excel, ExportFormat::Pdf]
        .into_iter()
        .map(|format| storage.insert_job(&name, applications_only(), json!({}), format))
        .collect();

    let processor = test_processor(&storage, tmp.path());
    processor.poll_once().await.unwrap();

    for id in ids {
        let job = wait_for_terminal(&storage, id).await;
        assert_eq!(job.status, ExportJobStatus::Completed, "{:?}", job.error_message);
        let path = std::path::PathBuf::from(job.file_path.unwrap());
        let file_name = path.file_name().unwrap().to_str().unwrap();
        assert!(file_name.len() < 255);
        assert!(file_name.contains(&id.to_string()));
    }
}

#[tokio::test]
async fn test_training_only_job_produces_empty_export() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = MemoryStorage::new();
    let data_types = DataTypes {
        training: true,
        ..Default::default()
    };
    let id = storage.insert_job("Training", data_types, json!({}), ExportFormat::Json);

    let processor = test_processor(&storage, tmp.path());
    processor.poll_once().await.unwrap();

    let job = wait_for_terminal(&storage, id).await;
    assert_eq!(job.status, ExportJobStatus::Completed);

    let document: serde_json::Value =
        serde_json::from_slice(&std::fs::read(job.file_path.unwrap()).unwrap()).unwrap();
    assert_eq!(document["data"], json!({}));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_collection_timeout_fails_job() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = MemoryStorage::new();
    storage.set_collect_delay(Duration::from_secs(2));
    let id = storage.insert_job("Slow", applications_only(), json!({}), ExportFormat::Csv);

    let mut settings = test_settings(tmp.path());
    settings.collection_timeout = Duration::from_millis(100);
    let processor = ExportProcessor::new(storage.clone(), settings);
    processor.poll_once().await.unwrap();

    let job = wait_for_terminal(&storage, id).await;
    assert_eq!(job.status, ExportJobStatus::Failed);
    assert_eq!(job.error_message.as_deref(), Some("Data collection timeout"));
    assert!(job.file_path.is_none());
}

#[tokio::test]
async fn test_all_collectors_failing_fails_job() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = MemoryStorage::new();
    storage.set_fail_applications(true);
    let id = storage.insert_job("Broken", applications_only(), json!({}), ExportFormat::Csv);

    let processor = test_processor(&storage, tmp.path());
    processor.poll_once().await.unwrap();

    let job = wait_for_terminal(&storage, id).await;
    assert_eq!(job.status, ExportJobStatus::Failed);
    let message = job.error_message.unwrap();
    assert!(message.starts_with("Data collection failed:"), "{}", message);
    assert!(message.contains("applications query failed"));
}

#[tokio::test]
async fn test_partial_collection_failure_still_completes() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = MemoryStorage::new();
    storage.set_fail_applications(true);
    let data_types = DataTypes {
        applications: true,
        courses: true,
        ..Default::default()
    };
    let id = storage.insert_job("Partial", data_types, json!({}), ExportFormat::Json);

    let processor = test_processor(&storage, tmp.path());
    processor.poll_once().await.unwrap();

    let job = wait_for_terminal(&storage, id).await;
    assert_eq!(job.status, ExportJobStatus::Completed);

    let document: serde_json::Value =
        serde_json::from_slice(&std::fs::read(job.file_path.unwrap()).unwrap()).unwrap();
    assert!(document["data"].get("applications").is_none());
    assert_eq!(document["data"]["courses"], json!([]));
}

#[tokio::test]
async fn test_invalid_stored_filters_fail_job() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = MemoryStorage::new();
    let id = storage.insert_job(
        "Bad range",
        applications_only(),
        json!({ "dateRange": "custom" }),
        ExportFormat::Csv,
    );

    let processor = test_processor(&storage, tmp.path());
    processor.poll_once().await.unwrap();

    let job = wait_for_terminal(&storage, id).await;
    assert_eq!(job.status, ExportJobStatus::Failed);
    assert!(job
        .error_message
        .unwrap()
        .contains("startDate and endDate are required"));
}

#[tokio::test]
async fn test_job_claimed_by_another_worker_is_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = MemoryStorage::new();
    let id = storage.insert_job("Raced", applications_only(), json!({}), ExportFormat::Csv);
    storage.claim_elsewhere(id);

    let processor = test_processor(&storage, tmp.path());
    assert_eq!(processor.poll_once().await.unwrap(), 1);
    wait_until(|| processor.in_flight_count() == 0).await;

    let job = storage.job(id).unwrap();
    assert_eq!(job.status, ExportJobStatus::Processing);
    assert_eq!(job.progress, 0);
    assert!(job.file_path.is_none());
    assert!(storage.progress_history(id).is_empty());
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_job_removed_mid_run_is_abandoned() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = MemoryStorage::new();
    storage.set_collect_delay(Duration::from_millis(200));
    let id = storage.insert_job("Gone", applications_only(), json!({}), ExportFormat::Csv);

    let processor = test_processor(&storage, tmp.path());
    processor.poll_once().await.unwrap();
    wait_until(|| storage.job(id).map(|j| j.status) == Some(ExportJobStatus::Processing)).await;

    storage.remove_job(id);
    wait_until(|| processor.in_flight_count() == 0).await;
    assert!(storage.job(id).is_none());
}

// ============================================================================
// Connection retry
// ============================================================================

#[tokio::test]
async fn test_poll_retries_connection_then_succeeds() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = MemoryStorage::new();
    storage.fail_next_acquires(2);
    let id = storage.insert_job("Retry", applications_only(), json!({}), ExportFormat::Csv);

    let processor = test_processor(&storage, tmp.path());
    assert_eq!(processor.poll_once().await.unwrap(), 1);
    assert!(storage.acquire_attempts() >= 3);

    let job = wait_for_terminal(&storage, id).await;
    assert_eq!(job.status, ExportJobStatus::Completed);
}

#[tokio::test]
async fn test_poll_gives_up_after_max_attempts() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = MemoryStorage::new();
    storage.fail_next_acquires(10);
    let id = storage.insert_job("Outage", applications_only(), json!({}), ExportFormat::Csv);

    let processor = test_processor(&storage, tmp.path());
    let err = processor.poll_once().await.unwrap_err();

    assert!(matches!(
        err,
        ExportProcessingError::ConnectionExhausted { attempts: 3, .. }
    ));
    assert_eq!(storage.acquire_attempts(), 3);
    assert_eq!(storage.job(id).unwrap().status, ExportJobStatus::Pending);
}

// ============================================================================
// Dispatch and shutdown
// ============================================================================

#[tokio::test]
async fn test_in_flight_job_is_not_dispatched_twice() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = MemoryStorage::new();
    storage.set_collect_delay(Duration::from_millis(200));
    let id = storage.insert_job("Once", applications_only(), json!({}), ExportFormat::Csv);

    let processor = test_processor(&storage, tmp.path());
    assert_eq!(processor.poll_once().await.unwrap(), 1);
    assert_eq!(processor.poll_once().await.unwrap(), 0);

    wait_for_terminal(&storage, id).await;
    wait_until(|| processor.in_flight_count() == 0).await;
}

#[tokio::test]
async fn test_batch_size_limits_dispatch() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = MemoryStorage::new();
    for i in 0..7 {
        storage.insert_job(&format!("Job {}", i), applications_only(), json!({}), ExportFormat::Csv);
    }

    let processor = test_processor(&storage, tmp.path());
    assert_eq!(processor.poll_once().await.unwrap(), 5);
}

#[tokio::test]
async fn test_stop_drains_in_flight_jobs() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = MemoryStorage::new();
    storage.set_collect_delay(Duration::from_millis(300));
    let id = storage.insert_job("Drain", applications_only(), json!({}), ExportFormat::Csv);

    let processor = test_processor(&storage, tmp.path());
    processor.start();
    assert!(processor.is_running());
    wait_until(|| processor.in_flight_count() == 1).await;

    processor.stop().await;

    assert!(!processor.is_running());
    assert_eq!(processor.in_flight_count(), 0);
    assert_eq!(storage.job(id).unwrap().status, ExportJobStatus::Completed);
}

#[tokio::test]
async fn test_start_is_idempotent_and_polls() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = MemoryStorage::new();
    let processor = test_processor(&storage, tmp.path());

    processor.start();
    processor.start();

    let id = storage.insert_job("Later", applications_only(), json!({}), ExportFormat::Csv);
    let job = wait_for_terminal(&storage, id).await;
    assert_eq!(job.status, ExportJobStatus::Completed);

    processor.stop().await;
    assert!(!processor.is_running());
}

#[tokio::test]
async fn test_stop_without_start_returns() {
    let tmp = tempfile::tempdir().unwrap();
    let storage = MemoryStorage::new();
    let processor = test_processor(&storage, tmp.path());

    processor.stop().await;
    assert!(!processor.is_running());
}
