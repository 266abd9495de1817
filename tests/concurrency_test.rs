//! Concurrency tests for FCI.
//!
//! These tests run competing mutations against a file-backed database with
//! several pooled connections.

use std::sync::Arc;

use fci::resource::validator::NAME_TAKEN;
use fci::resource::{CreateResource, ResourceChanges, ResourceRepository, ResourceService};
use fci::{Database, FciError};
use tempfile::TempDir;

/// Open a file-backed database with a root directory.
async fn setup_test_db(dir: &TempDir) -> Arc<Database> {
    let db = Database::open(dir.path().join("fci.db")).await.unwrap();
    ResourceRepository::new(db.pool()).ensure_root().await.unwrap();
    Arc::new(db)
}

/// Concurrent creation of the same name under one parent.
///
/// Exactly one request wins; every other one is reported as a name
/// validation failure rather than a server error.
#[tokio::test]
async fn test_concurrent_create_same_name() {
    let dir = TempDir::new().unwrap();
    let db = setup_test_db(&dir).await;

    const NUM_REQUESTS: usize = 8;

    let mut handles = Vec::new();
    for _ in 0..NUM_REQUESTS {
        let db = Arc::clone(&db);
        handles.push(tokio::spawn(async move {
            ResourceService::new(&db)
                .create("", CreateResource::directory("shared"))
                .await
        }));
    }

    let mut success_count = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => success_count += 1,
            Err(FciError::Validation(errors)) => {
                assert_eq!(errors.get("name").unwrap(), &[NAME_TAKEN.to_string()]);
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(success_count, 1, "Exactly one create should win");

    let root = ResourceService::new(&db).retrieve("").await.unwrap();
    assert_eq!(root.descendants.unwrap().len(), 1);
}

/// Concurrent creation of distinct names all succeed.
#[tokio::test]
async fn test_concurrent_create_distinct_names() {
    let dir = TempDir::new().unwrap();
    let db = setup_test_db(&dir).await;

    const NUM_REQUESTS: usize = 10;

    let mut handles = Vec::new();
    for i in 0..NUM_REQUESTS {
        let db = Arc::clone(&db);
        handles.push(tokio::spawn(async move {
            ResourceService::new(&db)
                .create("", CreateResource::file(format!("file-{i}")).with_size(i as i64))
                .await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let root = ResourceService::new(&db).retrieve("").await.unwrap();
    assert_eq!(root.descendants.unwrap().len(), NUM_REQUESTS);
}

/// Concurrent renames to the same target name.
#[tokio::test]
async fn test_concurrent_rename_same_target() {
    let dir = TempDir::new().unwrap();
    let db = setup_test_db(&dir).await;

    let service = ResourceService::new(&db);
    for name in ["a", "b", "c"] {
        service.create("", CreateResource::file(name)).await.unwrap();
    }

    let mut handles = Vec::new();
    for name in ["a", "b", "c"] {
        let db = Arc::clone(&db);
        handles.push(tokio::spawn(async move {
            let changes = ResourceChanges {
                name: Some("target".to_string()),
                ..Default::default()
            };
            ResourceService::new(&db).update(name, changes).await
        }));
    }

    let mut success_count = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => success_count += 1,
            Err(FciError::Validation(errors)) => assert!(errors.get("name").is_some()),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(success_count, 1);

    let root = ResourceService::new(&db).retrieve("").await.unwrap();
    let names: Vec<String> = root
        .descendants
        .unwrap()
        .into_iter()
        .map(|view| view.resource.name)
        .collect();
    assert_eq!(names.iter().filter(|n| *n == "target").count(), 1);
    assert_eq!(names.len(), 3);
}
