use treewright::adapters::{ClientOp, GcsAdapter, LocalAdapter, MemoryObjectClient, S3Adapter, StorageAdapter};
use treewright::types::{ErrorKind, MoveMethod};
use treewright::MigrateOptions;

use crate::helpers::{engine, s};

#[test]
fn local_to_object_store_round_trip() {
    let (api, facts) = engine();
    let td = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(td.path().join("site/assets")).unwrap();
    std::fs::write(td.path().join("site/index.html"), b"<h1>hi</h1>").unwrap();
    std::fs::write(td.path().join("site/assets/logo.svg"), b"<svg/>").unwrap();
    let local = LocalAdapter::new();
    let s3 = S3Adapter::new(MemoryObjectClient::new("static"));

    let r = api
        .migrate(&s(&td.path().join("site")), "www", &local, &s3, MigrateOptions::default())
        .unwrap();
    assert!(r.is_success(), "{:?}", r.failed);
    assert!(r.moved.iter().all(|m| m.method == MoveMethod::CopyVerifyDelete));
    assert_eq!(s3.read_file("www/assets/logo.svg").unwrap(), b"<svg/>");
    assert!(!td.path().join("site").exists());
    assert_eq!(facts.of("migrate.attempt")[0]["to_backend"], "s3");

    let back = s(&td.path().join("restored"));
    let r = api.migrate("www", &back, &s3, &local, MigrateOptions::default()).unwrap();
    assert!(r.is_success(), "{:?}", r.failed);
    assert_eq!(
        std::fs::read(td.path().join("restored/index.html")).unwrap(),
        b"<h1>hi</h1>"
    );
    assert_eq!(s3.exists("www").unwrap(), treewright::types::EntryKind::Absent);
}

#[test]
fn failed_source_delete_is_a_consistency_error() {
    let (api, _) = engine();
    let client = MemoryObjectClient::new("src");
    let gcs = GcsAdapter::new(client.clone());
    gcs.create_directory("in").unwrap();
    gcs.write_file("in/a.txt", b"a", false).unwrap();
    gcs.write_file("in/b.txt", b"b", false).unwrap();
    client.fail_on(ClientOp::Delete, "a.txt");
    let dst = S3Adapter::new(MemoryObjectClient::new("dst"));

    let r = api.migrate("in", "out", &gcs, &dst, MigrateOptions::default()).unwrap();
    assert_eq!(r.failed.len(), 1);
    assert_eq!(r.failed[0].error.kind, ErrorKind::MigrationConsistency);
    assert_eq!(r.failed[0].error_id, "E_MIGRATION_CONSISTENCY");
    assert!(r.not_attempted.is_empty());
    // Both copies of the inconsistent file exist; the other file moved cleanly.
    assert_eq!(gcs.read_file("in/a.txt").unwrap(), b"a");
    assert_eq!(dst.read_file("out/a.txt").unwrap(), b"a");
    assert_eq!(dst.read_file("out/b.txt").unwrap(), b"b");
    assert_eq!(gcs.exists("in/b.txt").unwrap(), treewright::types::EntryKind::Absent);
}

#[test]
fn copy_failure_keeps_the_source_and_aborts() {
    let (api, _) = engine();
    let src = S3Adapter::new(MemoryObjectClient::new("src"));
    src.create_directory("in").unwrap();
    src.write_file("in/a.txt", b"a", false).unwrap();
    src.write_file("in/b.txt", b"b", false).unwrap();
    let dst_client = MemoryObjectClient::new("dst");
    dst_client.fail_on(ClientOp::Put, "a.txt");
    let dst = S3Adapter::new(dst_client);

    let r = api.migrate("in", "out", &src, &dst, MigrateOptions::default()).unwrap();
    assert_eq!(r.failed.len(), 1);
    assert_eq!(r.failed[0].error.kind, ErrorKind::AdapterIo);
    assert_eq!(r.not_attempted, vec!["in/b.txt".to_string()]);
    assert_eq!(src.read_file("in/a.txt").unwrap(), b"a");
    assert_eq!(src.read_file("in/b.txt").unwrap(), b"b");

    let r = api
        .migrate("in", "out2", &src, &dst, MigrateOptions::default().continue_on_error(true))
        .unwrap();
    assert_eq!(r.failed.len(), 1);
    assert!(r.not_attempted.is_empty());
    assert_eq!(dst.read_file("out2/b.txt").unwrap(), b"b");
}

#[cfg(feature = "object-store")]
#[test]
fn engine_runs_against_the_object_store_client() {
    use treewright::adapters::ObjectStoreClient;
    use treewright::{CreateOptions, TreeSpec};

    let (api, _) = engine();
    let gcs = GcsAdapter::new(ObjectStoreClient::in_memory("media").unwrap());
    let spec = TreeSpec::new()
        .dir("uploads", TreeSpec::new().dir("raw", TreeSpec::new()))
        .file("README.txt", "generated");
    let r = api
        .create_tree("tenant", &spec, &gcs, CreateOptions::default())
        .unwrap();
    assert!(r.is_success(), "{:?}", r.failed);
    assert!(api.validate("tenant", &spec, &gcs).unwrap().is_exact());

    let td = tempfile::tempdir().unwrap();
    let out = s(&td.path().join("tenant"));
    let m = api
        .migrate("tenant", &out, &gcs, &LocalAdapter::new(), MigrateOptions::default())
        .unwrap();
    assert!(m.is_success(), "{:?}", m.failed);
    assert!(td.path().join("tenant/uploads/raw").is_dir());
    assert_eq!(
        std::fs::read(td.path().join("tenant/README.txt")).unwrap(),
        b"generated"
    );
    assert_eq!(gcs.exists("tenant").unwrap(), treewright::types::EntryKind::Absent);
}
