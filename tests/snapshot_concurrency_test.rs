use curlcheck::capture::{CapturedResponse, Metrics};
use curlcheck::compare::ComparisonRules;
use curlcheck::snapshot::{CheckStatus, SnapshotFile, SnapshotStorage, SnapshotStore, UpdatePolicy};
use serde_json::json;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn create_response(id: &str) -> CapturedResponse {
    let mut metrics = Metrics::new();
    metrics.insert("response_code", json!(200));
    CapturedResponse {
        body: json!({"id": id}).to_string(),
        metrics,
        headers: Default::default(),
    }
}

#[test]
fn test_concurrent_snapshot_writes() {
    let temp_dir = TempDir::new().unwrap();
    let dir = Arc::new(temp_dir.path().to_path_buf());

    let mut handles = vec![];
    let thread_count = 8;
    let entries_per_thread = 20;

    for i in 0..thread_count {
        let dir = dir.clone();
        handles.push(thread::spawn(move || {
            // 每个线程各自创建 store，模拟多个进程写同一个文件
            let store = SnapshotStore::for_suite(dir.as_path(), "shared");
            for j in 0..entries_per_thread {
                let name = format!("{}-{}", i, j);
                let check = store
                    .check(
                        &name,
                        &create_response(&name),
                        &ComparisonRules::default(),
                        UpdatePolicy::default(),
                    )
                    .unwrap();
                assert_eq!(check.status, CheckStatus::Created);
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    // Verify
    let storage = SnapshotStorage::for_suite(dir.as_path(), "shared");
    let file: SnapshotFile = storage.load().unwrap();
    assert_eq!(file.snapshots.len(), thread_count * entries_per_thread);
    assert_eq!(file.snapshots["3-7"].body, Some(json!({"id": "3-7"})));
}

#[test]
fn test_suites_use_separate_files() {
    let temp_dir = TempDir::new().unwrap();
    let a = SnapshotStore::for_suite(temp_dir.path(), "a");
    let b = SnapshotStore::for_suite(temp_dir.path(), "b");
    let rules = ComparisonRules::default();

    a.check("x", &create_response("1"), &rules, UpdatePolicy::default())
        .unwrap();
    let other = b
        .check("x", &create_response("2"), &rules, UpdatePolicy::default())
        .unwrap();
    assert_eq!(other.status, CheckStatus::Created);
    assert_ne!(a.storage().path(), b.storage().path());
}
