use treewright::adapters::{LocalAdapter, MemoryObjectClient, S3Adapter, StorageAdapter};
use treewright::policy::ConflictPolicy;
use treewright::types::ErrorKind;
use treewright::{CreateOptions, TreeSpec};

use crate::helpers::{engine, s};

fn seeded() -> (tempfile::TempDir, String) {
    let td = tempfile::tempdir().unwrap();
    std::fs::write(td.path().join("app.conf"), b"old").unwrap();
    let base = s(td.path());
    (td, base)
}

#[test]
fn reject_keeps_existing_content() {
    let (api, _) = engine();
    let (td, base) = seeded();
    let spec = TreeSpec::new().file("app.conf", "new");
    let r = api
        .create_tree(&base, &spec, &LocalAdapter::new(), CreateOptions::default())
        .unwrap();
    assert_eq!(r.failed[0].error.kind, ErrorKind::ContentConflict);
    assert_eq!(r.failed[0].error_id, "E_CONFLICT");
    assert_eq!(std::fs::read(td.path().join("app.conf")).unwrap(), b"old");
}

#[test]
fn overwrite_replaces() {
    let (api, _) = engine();
    let (td, base) = seeded();
    let spec = TreeSpec::new().file("app.conf", "new");
    let r = api
        .create_tree(&base, &spec, &LocalAdapter::new(), CreateOptions::default().overwrite(true))
        .unwrap();
    assert!(r.is_success());
    assert_eq!(std::fs::read(td.path().join("app.conf")).unwrap(), b"new");
}

#[test]
fn version_keeps_a_sibling_copy() {
    let (api, facts) = engine();
    let (td, base) = seeded();
    let spec = TreeSpec::new().file("app.conf", "new");
    let r = api
        .create_tree(
            &base,
            &spec,
            &LocalAdapter::new(),
            CreateOptions::default().with_conflict(ConflictPolicy::Version),
        )
        .unwrap();
    assert!(r.is_success(), "{:?}", r.failed);
    assert_eq!(std::fs::read(td.path().join("app.conf")).unwrap(), b"new");
    let kept: Vec<_> = std::fs::read_dir(td.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with(".app.conf.treewright.") && n.ends_with(".bak"))
        .collect();
    assert_eq!(kept.len(), 1);
    assert_eq!(std::fs::read(td.path().join(&kept[0])).unwrap(), b"old");
    assert!(facts
        .of("apply.result")
        .iter()
        .any(|f| f["backup_path"].as_str().is_some_and(|p| p.ends_with(".bak"))));
}

#[test]
fn identical_content_is_already_satisfied_under_any_policy() {
    let (api, _) = engine();
    let client = MemoryObjectClient::new("bucket");
    let adapter = S3Adapter::new(client.clone());
    adapter.write_file("cfg/app.conf", b"same", false).unwrap();
    let spec = TreeSpec::new().file("app.conf", "same");
    for policy in [ConflictPolicy::Reject, ConflictPolicy::Overwrite, ConflictPolicy::Version] {
        let r = api
            .create_tree("cfg", &spec, &adapter, CreateOptions::default().with_conflict(policy))
            .unwrap();
        assert!(r.is_success());
        assert_eq!(r.count(treewright::types::OpOutcome::Applied), 0);
    }
    assert_eq!(client.keys().iter().filter(|k| k.contains(".bak")).count(), 0);
}
