use treewright::adapters::{LocalAdapter, MemoryObjectClient, S3Adapter, StorageAdapter};
use treewright::types::CleanupReport;
use treewright::{ApiError, CreateOptions, TreeSpec};

use crate::helpers::{engine, s, RecordingAdapter};

fn spec() -> TreeSpec {
    TreeSpec::new()
        .dir("a", TreeSpec::new().dir("b", TreeSpec::new()).empty_file("c.txt"))
        .empty_file("d.txt")
}

#[test]
fn unconfirmed_cleanup_lists_without_deleting() {
    let (api, _) = engine();
    let td = tempfile::tempdir().unwrap();
    let base = s(td.path());
    let adapter = RecordingAdapter::new(LocalAdapter::new());
    api.create_tree(&base, &spec(), &adapter, CreateOptions::default())
        .unwrap();
    adapter.calls.lock().unwrap().clear();

    match api.cleanup(&base, &spec(), &adapter, false).unwrap() {
        CleanupReport::WouldDelete(paths) => {
            let p = |n: &str| s(&td.path().join(n));
            assert_eq!(paths, vec![p("d.txt"), p("a/c.txt"), p("a/b"), p("a")]);
        }
        other => panic!("expected WouldDelete, got {other:?}"),
    }
    assert!(!adapter.call_names().contains(&"delete_recursive"));
    assert!(td.path().join("a/b").is_dir());
}

#[test]
fn confirmed_cleanup_keeps_base_and_unrelated_files() {
    let (api, facts) = engine();
    let td = tempfile::tempdir().unwrap();
    let base = s(td.path());
    api.create_tree(&base, &spec(), &LocalAdapter::new(), CreateOptions::default())
        .unwrap();
    std::fs::write(td.path().join("keep.me"), b"").unwrap();

    match api.cleanup(&base, &spec(), &LocalAdapter::new(), true).unwrap() {
        CleanupReport::Deleted {
            deleted,
            kept,
            failed,
        } => {
            assert!(failed.is_empty());
            assert!(kept.is_empty());
            assert_eq!(deleted.len(), 4);
        }
        other => panic!("expected Deleted, got {other:?}"),
    }
    assert!(td.path().is_dir());
    assert!(td.path().join("keep.me").is_file());
    assert!(!td.path().join("a").exists());
    assert_eq!(facts.of("cleanup.result").len(), 2);
}

#[test]
fn cleanup_of_traversal_spec_fails_before_deleting() {
    let (api, _) = engine();
    let td = tempfile::tempdir().unwrap();
    std::fs::create_dir(td.path().join("inner")).unwrap();
    let adapter = RecordingAdapter::new(LocalAdapter::new());
    let spec = TreeSpec::new().dir("..", TreeSpec::new());
    let err = api
        .cleanup(&s(&td.path().join("inner")), &spec, &adapter, true)
        .unwrap_err();
    assert!(matches!(err, ApiError::PathTraversal(_)));
    assert!(adapter.call_names().is_empty());
    assert!(td.path().join("inner").is_dir());
}

#[test]
fn object_store_cleanup_respects_root_boundary() {
    let (api, _) = engine();
    let client = MemoryObjectClient::new("b");
    let a = S3Adapter::new(client.clone()).with_root("tenant").unwrap();
    api.create_tree("tenant", &spec(), &a, CreateOptions::default())
        .unwrap();
    a.write_file("tenant/other.txt", b"x", false).unwrap();
    match api.cleanup("tenant", &spec(), &a, true).unwrap() {
        CleanupReport::Deleted { failed, .. } => assert!(failed.is_empty()),
        other => panic!("expected Deleted, got {other:?}"),
    }
    let mut keys = client.keys();
    keys.sort();
    assert_eq!(keys, vec!["tenant/".to_string(), "tenant/other.txt".to_string()]);
}

#[test]
fn undeclared_files_survive_confirmed_cleanup() {
    let (api, facts) = engine();
    let td = tempfile::tempdir().unwrap();
    let base = s(td.path());
    let spec = TreeSpec::new().dir("uploads", TreeSpec::new().dir("raw", TreeSpec::new()));
    api.create_tree(&base, &spec, &LocalAdapter::new(), CreateOptions::default())
        .unwrap();
    let user_file = td.path().join("uploads/user_data.csv");
    std::fs::write(&user_file, b"id,name\n1,ada\n").unwrap();

    match api.cleanup(&base, &spec, &LocalAdapter::new(), false).unwrap() {
        CleanupReport::WouldDelete(paths) => assert_eq!(paths, vec![s(&td.path().join("uploads/raw"))]),
        other => panic!("expected WouldDelete, got {other:?}"),
    }

    match api.cleanup(&base, &spec, &LocalAdapter::new(), true).unwrap() {
        CleanupReport::Deleted {
            deleted,
            kept,
            failed,
        } => {
            assert!(failed.is_empty());
            assert_eq!(deleted, vec![s(&td.path().join("uploads/raw"))]);
            assert_eq!(kept, vec![s(&user_file)]);
        }
        other => panic!("expected Deleted, got {other:?}"),
    }
    assert_eq!(std::fs::read(&user_file).unwrap(), b"id,name\n1,ada\n");
    assert!(td.path().join("uploads").is_dir());
    assert!(!td.path().join("uploads/raw").exists());
    let result = facts.of("cleanup.result");
    assert_eq!(result.len(), 2);
    assert_eq!(result[1]["kept"][0], s(&user_file));
    assert_eq!(result[1]["deleted"][0], s(&td.path().join("uploads/raw")));
}

#[test]
fn undeclared_objects_keep_their_prefix() {
    let (api, _) = engine();
    let client = MemoryObjectClient::new("b");
    let a = S3Adapter::new(client.clone());
    api.create_tree("tenant", &spec(), &a, CreateOptions::default())
        .unwrap();
    a.write_file("tenant/a/b/notes.txt", b"mine", false).unwrap();
    match api.cleanup("tenant", &spec(), &a, true).unwrap() {
        CleanupReport::Deleted { kept, failed, .. } => {
            assert!(failed.is_empty());
            assert_eq!(kept, vec!["tenant/a/b/notes.txt".to_string()]);
        }
        other => panic!("expected Deleted, got {other:?}"),
    }
    let mut keys = client.keys();
    keys.sort();
    assert_eq!(
        keys,
        vec![
            "tenant/".to_string(),
            "tenant/a/".to_string(),
            "tenant/a/b/".to_string(),
            "tenant/a/b/notes.txt".to_string(),
        ]
    );
}

#[test]
fn kind_mismatch_is_left_in_place() {
    let (api, _) = engine();
    let td = tempfile::tempdir().unwrap();
    let base = s(td.path());
    std::fs::create_dir(td.path().join("d.txt")).unwrap();
    let spec = TreeSpec::new().empty_file("d.txt");
    match api.cleanup(&base, &spec, &LocalAdapter::new(), true).unwrap() {
        CleanupReport::Deleted { deleted, failed, .. } => {
            assert!(deleted.is_empty());
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].error_id, "E_COLLISION");
        }
        other => panic!("expected Deleted, got {other:?}"),
    }
    assert!(td.path().join("d.txt").is_dir());
}
