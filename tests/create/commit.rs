use treewright::adapters::LocalAdapter;
use treewright::types::{OpOutcome, PlannedAction};
use treewright::{CreateOptions, TreeSpec};

use crate::helpers::{engine, s};

fn sample() -> TreeSpec {
    TreeSpec::new()
        .dir(
            "uploads",
            TreeSpec::new()
                .dir("raw", TreeSpec::new())
                .dir("processed", TreeSpec::new().dir("images", TreeSpec::new())),
        )
        .file("README.txt", "generated")
}

#[test]
fn create_then_validate_round_trip() {
    let (api, facts) = engine();
    let td = tempfile::tempdir().unwrap();
    let base = s(&td.path().join("project_data"));
    let adapter = LocalAdapter::new();

    let report = api
        .create_tree(&base, &sample(), &adapter, CreateOptions::default())
        .unwrap();
    assert!(report.is_success(), "{:?}", report.failed);
    assert_eq!(report.plan.ops[0].path, base);
    assert_eq!(report.plan.ops.len(), 6);
    assert!(td.path().join("project_data/uploads/processed/images").is_dir());
    assert_eq!(
        std::fs::read_to_string(td.path().join("project_data/README.txt")).unwrap(),
        "generated"
    );
    assert_eq!(
        report.tree["uploads"]["processed"]["images"].path,
        s(&td.path().join("project_data/uploads/processed/images"))
    );

    let v = api.validate(&base, &sample(), &adapter).unwrap();
    assert!(v.is_exact(), "{v:?}");
    assert_eq!(v.present.len(), 5);

    let summary = facts.of("run.summary");
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0]["completed"], 6);
    assert_eq!(facts.of("validate.result").len(), 1);
}

#[test]
fn second_create_is_a_no_op() {
    let (api, _) = engine();
    let td = tempfile::tempdir().unwrap();
    let base = s(&td.path().join("p"));
    let adapter = LocalAdapter::new();
    api.create_tree(&base, &sample(), &adapter, CreateOptions::default())
        .unwrap();

    let again = api
        .create_tree(&base, &sample(), &adapter, CreateOptions::default())
        .unwrap();
    assert!(again.is_success());
    assert_eq!(again.count(OpOutcome::Applied), 0);
    assert_eq!(again.count(OpOutcome::AlreadySatisfied), again.records.len());
    assert!(again
        .plan
        .ops
        .iter()
        .filter(|op| op.kind == treewright::types::NodeKind::Directory)
        .all(|op| op.action == PlannedAction::Skip));
    let readme = again.plan.ops.iter().position(|op| op.rel == "README.txt").unwrap();
    assert_eq!(again.plan.ops[readme].action, PlannedAction::WriteFile);
    assert_eq!(again.plan.ops[readme].reason, "exists; content compared on write");
    assert_eq!(again.records[readme].outcome, OpOutcome::AlreadySatisfied);
}

#[test]
fn plan_ids_are_deterministic() {
    let (api, _) = engine();
    let td = tempfile::tempdir().unwrap();
    let base = s(&td.path().join("p"));
    let adapter = LocalAdapter::new();
    let a = api
        .create_tree(&base, &sample(), &adapter, CreateOptions::default().dry_run())
        .unwrap();
    let b = api
        .create_tree(&base, &sample(), &adapter, CreateOptions::default().dry_run())
        .unwrap();
    assert_eq!(a.plan_id, b.plan_id);
}

#[test]
fn unresolved_variable_fails_before_any_mutation() {
    let (api, facts) = engine();
    let td = tempfile::tempdir().unwrap();
    let base = s(&td.path().join("p"));
    let spec = TreeSpec::new().dir("logs_${RUN}", TreeSpec::new());
    let err = api
        .create_tree(&base, &spec, &LocalAdapter::new(), CreateOptions::default())
        .unwrap_err();
    assert_eq!(err.error_id(), treewright::ErrorId::E_UNRESOLVED_VAR);
    assert!(!td.path().join("p").exists());
    assert!(facts.events.lock().unwrap().is_empty());
}

#[test]
fn variables_expand_from_the_engine_env() {
    let (api, _) = engine();
    let api = api.with_env(treewright::Env::new().with("RUN", "42"));
    let td = tempfile::tempdir().unwrap();
    let base = s(&td.path().join("p"));
    let spec = TreeSpec::new().dir("logs_${RUN}", TreeSpec::new());
    let r = api
        .create_tree(&base, &spec, &LocalAdapter::new(), CreateOptions::default())
        .unwrap();
    assert!(r.is_success());
    assert!(td.path().join("p/logs_42").is_dir());
}

#[test]
fn traversal_names_are_rejected() {
    let (api, _) = engine();
    let td = tempfile::tempdir().unwrap();
    let spec = TreeSpec::new().dir("..", TreeSpec::new());
    let err = api
        .create_tree(&s(td.path()), &spec, &LocalAdapter::new(), CreateOptions::default())
        .unwrap_err();
    assert!(matches!(err, treewright::ApiError::PathTraversal(_)));
}

#[cfg(unix)]
#[test]
fn perms_metadata_is_applied() {
    use std::os::unix::fs::PermissionsExt;

    let (api, _) = engine();
    let td = tempfile::tempdir().unwrap();
    let base = s(&td.path().join("p"));
    let spec = TreeSpec::from_yaml_str("secrets:\n  _perms: 448\n  key.pem: k\n").unwrap();
    let r = api
        .create_tree(&base, &spec, &LocalAdapter::new(), CreateOptions::default())
        .unwrap();
    assert!(r.is_success(), "{:?}", r.failed);
    let mode = std::fs::metadata(td.path().join("p/secrets")).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o700);
}

#[test]
fn metadata_names_built_in_code_are_not_materialized() {
    let (api, _) = engine();
    let td = tempfile::tempdir().unwrap();
    let base = s(&td.path().join("p"));
    let spec = TreeSpec::new()
        .file("_notes", "x")
        .dir("a", TreeSpec::new().empty_file("b"));
    let r = api
        .create_tree(&base, &spec, &LocalAdapter::new(), CreateOptions::default())
        .unwrap();
    assert!(r.is_success(), "{:?}", r.failed);
    assert!(r.tree.get("_notes").is_none());
    assert!(!td.path().join("p/_notes").exists());
    assert!(td.path().join("p/a/b").is_file());
    assert_eq!(api.summarize(&spec), "a/\n  b");
    assert_eq!(api.flatten(&base, &spec).unwrap().len(), 2);
}
