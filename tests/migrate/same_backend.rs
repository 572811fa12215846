use treewright::adapters::{LocalAdapter, MemoryObjectClient, S3Adapter, StorageAdapter};
use treewright::types::{MoveMethod, NodeKind};
use treewright::{ApiError, MigrateOptions, TreeSpec};

use crate::helpers::{engine, s, RecordingAdapter};

fn seed(root: &std::path::Path) {
    std::fs::create_dir_all(root.join("old/uploads/raw")).unwrap();
    std::fs::create_dir_all(root.join("old/empty")).unwrap();
    std::fs::write(root.join("old/uploads/raw/a.bin"), [0u8, 1, 2, 255]).unwrap();
    std::fs::write(root.join("old/README.txt"), b"hello").unwrap();
}

#[test]
fn local_move_preserves_structure_and_content() {
    let (api, facts) = engine();
    let td = tempfile::tempdir().unwrap();
    seed(td.path());
    let adapter = LocalAdapter::new();
    let (src, dst) = (s(&td.path().join("old")), s(&td.path().join("new")));

    let r = api
        .migrate(&src, &dst, &adapter, &adapter, MigrateOptions::default())
        .unwrap();
    assert!(r.is_success(), "{:?}", r.failed);
    assert!(r.moved.iter().all(|m| m.method == MoveMethod::Rename));
    assert_eq!(
        std::fs::read(td.path().join("new/uploads/raw/a.bin")).unwrap(),
        vec![0u8, 1, 2, 255]
    );
    assert!(td.path().join("new/empty").is_dir());
    assert!(!td.path().join("old").exists());

    let spec = TreeSpec::new()
        .dir("uploads", TreeSpec::new().dir("raw", TreeSpec::new().bytes("a.bin", vec![0u8, 1, 2, 255])))
        .dir("empty", TreeSpec::new())
        .file("README.txt", "hello");
    assert!(api.validate(&dst, &spec, &adapter).unwrap().is_exact());
    assert_eq!(facts.of("migrate.attempt")[0]["same_instance"], true);
}

#[test]
fn dry_run_migration_touches_nothing() {
    let (api, _) = engine();
    let td = tempfile::tempdir().unwrap();
    seed(td.path());
    let adapter = RecordingAdapter::new(LocalAdapter::new());
    let r = api
        .migrate(
            &s(&td.path().join("old")),
            &s(&td.path().join("new")),
            &adapter,
            &adapter,
            MigrateOptions::default().dry_run(),
        )
        .unwrap();
    assert!(r.moved.iter().all(|m| m.method == MoveMethod::Planned));
    assert_eq!(r.moved.len(), 1 + 5);
    assert!(adapter
        .call_names()
        .iter()
        .all(|n| matches!(*n, "exists" | "list_children")));
    assert!(td.path().join("old/README.txt").is_file());
    assert!(!td.path().join("new").exists());
}

#[test]
fn single_file_is_moved() {
    let (api, _) = engine();
    let td = tempfile::tempdir().unwrap();
    std::fs::write(td.path().join("one.txt"), b"1").unwrap();
    let adapter = LocalAdapter::new();
    let r = api
        .migrate(
            &s(&td.path().join("one.txt")),
            &s(&td.path().join("two.txt")),
            &adapter,
            &adapter,
            MigrateOptions::default(),
        )
        .unwrap();
    assert!(r.is_success());
    assert_eq!(r.moved.len(), 1);
    assert_eq!(r.moved[0].kind, NodeKind::File);
    assert!(!td.path().join("one.txt").exists());
    assert_eq!(std::fs::read(td.path().join("two.txt")).unwrap(), b"1");
}

#[test]
fn missing_source_is_not_found() {
    let (api, _) = engine();
    let td = tempfile::tempdir().unwrap();
    let adapter = LocalAdapter::new();
    let err = api
        .migrate(
            &s(&td.path().join("nope")),
            &s(&td.path().join("new")),
            &adapter,
            &adapter,
            MigrateOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    assert_eq!(err.exit_code(), 31);
}

#[test]
fn destination_inside_source_is_refused() {
    let (api, _) = engine();
    let a = S3Adapter::new(MemoryObjectClient::new("b"));
    a.create_directory("data").unwrap();
    a.write_file("data/f", b"x", false).unwrap();
    let err = api
        .migrate("data", "data/archive", &a, &a, MigrateOptions::default())
        .unwrap_err();
    assert!(matches!(err, ApiError::PathTraversal(_)));
    let err = api.migrate("data", "/data/", &a, &a, MigrateOptions::default()).unwrap_err();
    assert!(matches!(err, ApiError::PathTraversal(_)));
    assert_eq!(a.read_file("data/f").unwrap(), b"x");
}

#[test]
fn destination_inside_source_is_refused_however_spelled() {
    let (api, _) = engine();
    let td = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(td.path().join("data")).unwrap();
    std::fs::write(td.path().join("data/f"), b"x").unwrap();
    std::fs::create_dir(td.path().join("x")).unwrap();
    let root = s(td.path());
    let adapter = RecordingAdapter::new(LocalAdapter::new());
    let err = api
        .migrate(
            &format!("{root}/./data"),
            &format!("{root}/x/../data/archive"),
            &adapter,
            &adapter,
            MigrateOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::PathTraversal(_)));
    assert!(!adapter.call_names().contains(&"move_or_copy"));
    assert!(!td.path().join("data/archive").exists());
    assert_eq!(std::fs::read(td.path().join("data/f")).unwrap(), b"x");
}

#[test]
fn object_store_rename_within_bucket() {
    let (api, _) = engine();
    let client = MemoryObjectClient::new("b");
    let a = S3Adapter::new(client.clone());
    a.create_directory("v1").unwrap();
    a.create_directory("v1/logs").unwrap();
    a.write_file("v1/logs/app.log", b"line", false).unwrap();
    let r = api.migrate("v1", "v2", &a, &a, MigrateOptions::default()).unwrap();
    assert!(r.is_success(), "{:?}", r.failed);
    assert_eq!(a.read_file("v2/logs/app.log").unwrap(), b"line");
    assert!(client.keys().iter().all(|k| !k.starts_with("v1")));
}
