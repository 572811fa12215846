use treewright::adapters::LocalAdapter;
use treewright::types::OpOutcome;
use treewright::{CreateOptions, TreeSpec};

use crate::helpers::{engine, s};

fn spec() -> TreeSpec {
    TreeSpec::new()
        .dir("a", TreeSpec::new().dir("inner", TreeSpec::new()).empty_file("f.txt"))
        .dir("b", TreeSpec::new().empty_file("g.txt"))
}

#[test]
fn abort_leaves_storage_untouched_on_collision() {
    let (api, _) = engine();
    let td = tempfile::tempdir().unwrap();
    std::fs::write(td.path().join("a"), b"blocker").unwrap();
    let r = api
        .create_tree(&s(td.path()), &spec(), &LocalAdapter::new(), CreateOptions::default())
        .unwrap();
    assert!(!r.is_success());
    assert_eq!(r.failed.len(), 1);
    assert_eq!(r.failed[0].path, s(&td.path().join("a")));
    assert_eq!(r.count(OpOutcome::Applied), 0);
    assert_eq!(r.count(OpOutcome::NotAttempted), r.plan.ops.len() - 1);
    assert!(!td.path().join("b").exists());
    assert_eq!(std::fs::read(td.path().join("a")).unwrap(), b"blocker");
}

#[test]
fn continue_on_error_builds_independent_subtrees() {
    let (api, facts) = engine();
    let td = tempfile::tempdir().unwrap();
    std::fs::write(td.path().join("a"), b"blocker").unwrap();
    let r = api
        .create_tree(
            &s(td.path()),
            &spec(),
            &LocalAdapter::new(),
            CreateOptions::default().continue_on_error(true),
        )
        .unwrap();
    assert_eq!(r.failed.len(), 1);
    assert!(r.not_attempted.contains(&s(&td.path().join("a/inner"))));
    assert!(r.not_attempted.contains(&s(&td.path().join("a/f.txt"))));
    assert!(td.path().join("b/g.txt").is_file());
    assert!(r.completed.contains(&s(&td.path().join("b"))));

    let failures: Vec<_> = facts
        .of("apply.result")
        .into_iter()
        .filter(|f| f.get("error_id").is_some())
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0]["error_id"], "E_COLLISION");
}

#[test]
fn failure_after_mutation_stops_under_abort() {
    let (api, _) = engine();
    let td = tempfile::tempdir().unwrap();
    std::fs::create_dir(td.path().join("b")).unwrap();
    std::fs::write(td.path().join("b/g.txt"), b"someone else's").unwrap();
    let spec = TreeSpec::new()
        .dir("a", TreeSpec::new())
        .dir("b", TreeSpec::new().file("g.txt", "ours"))
        .dir("c", TreeSpec::new());
    let r = api
        .create_tree(&s(td.path()), &spec, &LocalAdapter::new(), CreateOptions::default())
        .unwrap();
    assert_eq!(r.failed.len(), 1);
    assert_eq!(r.failed[0].error.kind, treewright::types::ErrorKind::ContentConflict);
    assert!(td.path().join("a").is_dir());
    assert!(!td.path().join("c").exists());
    assert_eq!(r.not_attempted, vec![s(&td.path().join("c"))]);
}
