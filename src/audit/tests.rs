use super::*;
use serde_json::json;
use tempfile::TempDir;

async fn open_log(dir: &TempDir) -> AuditLog {
    AuditLog::new(dir.path().join("audit.db"))
        .await
        .expect("audit log should open")
}

#[tokio::test]
async fn records_and_reads_back_entries() {
    let dir = TempDir::new().expect("tempdir");
    let log = open_log(&dir).await;

    log.record("admin", "UPLOAD_INGEST", &json!({"module": "billing"}))
        .await;
    log.record("admin", "DELETE_MODULE", &json!({"module": "shipping"}))
        .await;

    let records = log.recent(10).await.expect("recent should succeed");
    assert_eq!(records.len(), 2);

    // Newest first.
    assert_eq!(records[0].action, "DELETE_MODULE");
    assert_eq!(records[1].action, "UPLOAD_INGEST");
    assert_eq!(records[1].actor, "admin");
    assert!(records[1].detail.contains("billing"));
}

#[tokio::test]
async fn limit_caps_returned_rows() {
    let dir = TempDir::new().expect("tempdir");
    let log = open_log(&dir).await;

    for i in 0..5 {
        log.record("cli", "QUERY", &json!({"n": i})).await;
    }

    let records = log.recent(3).await.expect("recent should succeed");
    assert_eq!(records.len(), 3);
    assert!(records[0].detail.contains('4'));
}

#[tokio::test]
async fn reopening_keeps_existing_rows() {
    let dir = TempDir::new().expect("tempdir");

    {
        let log = open_log(&dir).await;
        log.record("cli", "QUERY", &json!({})).await;
    }

    let log = open_log(&dir).await;
    let records = log.recent(10).await.expect("recent should succeed");
    assert_eq!(records.len(), 1);
}
