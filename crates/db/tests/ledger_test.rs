//! Integration tests for the job ledger against a file-backed database.

use std::time::Duration;

use dbt_jobs_core::{JobStatus, OperationKind};
use dbt_jobs_db::Database;

const HOUR: Duration = Duration::from_secs(3600);

#[tokio::test]
async fn test_ledger_survives_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("ledger.db");

    let job_id = {
        let db = Database::new(&path).await.unwrap();
        let job_id = db.create_job("wine_list", OperationKind::Run).await.unwrap();
        assert!(db.set_job_status(&job_id, JobStatus::Failed).await.unwrap());
        db.close().await;
        job_id
    };

    let db = Database::new(&path).await.unwrap();
    assert_eq!(db.get_job_status(&job_id).await.unwrap(), Some(JobStatus::Failed));

    let recent = db
        .find_recent_job("wine_list", OperationKind::Run, HOUR)
        .await
        .unwrap()
        .expect("job should still be inside the window");
    assert_eq!(recent.job_id, job_id);
    assert_eq!(recent.status, JobStatus::Failed);
}

#[tokio::test]
async fn test_concurrent_creates_all_land() {
    let tmp = tempfile::tempdir().unwrap();
    let db = Database::new(&tmp.path().join("ledger.db")).await.unwrap();

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let db = db.clone();
            tokio::spawn(async move {
                let op = if i % 2 == 0 { OperationKind::Run } else { OperationKind::Test };
                db.create_job(&format!("model_{}", i % 4), op).await
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 16);

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM dbt_jobs")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(count.0, 16);
}

#[tokio::test]
async fn test_record_serializes_lowercase_enums() {
    let db = Database::new_in_memory().await.unwrap();
    let job_id = db.create_job("orders", OperationKind::Test).await.unwrap();
    let job = db.get_job(&job_id).await.unwrap().unwrap();

    let json = serde_json::to_value(&job).unwrap();
    assert_eq!(json["operation"], "test");
    assert_eq!(json["status"], "started");
    assert_eq!(json["model_name"], "orders");
}
