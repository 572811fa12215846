use treewright::adapters::LocalAdapter;
use treewright::logging::TS_ZERO;
use treewright::types::OpOutcome;
use treewright::{CreateOptions, TreeSpec};

use crate::helpers::{engine, s, RecordingAdapter};

#[test]
fn dry_run_only_checks_existence() {
    let (api, facts) = engine();
    let td = tempfile::tempdir().unwrap();
    let base = s(&td.path().join("p"));
    let spec = TreeSpec::new()
        .dir("a", TreeSpec::new().file("x.txt", "x"))
        .empty_file("b.txt");
    let adapter = RecordingAdapter::new(LocalAdapter::new());

    let r = api
        .create_tree(&base, &spec, &adapter, CreateOptions::default().dry_run())
        .unwrap();
    assert!(r.failed.is_empty());
    assert_eq!(r.count(OpOutcome::Planned), r.plan.ops.len());
    assert!(adapter.call_names().iter().all(|n| *n == "exists"));
    assert!(!td.path().join("p").exists());

    for (_, _, _, f) in facts.events.lock().unwrap().iter() {
        assert_eq!(f["ts"], TS_ZERO);
        assert_eq!(f["dry_run"], true);
        assert!(f.get("duration_ms").is_none());
    }
}

#[test]
fn dry_run_reports_collisions_as_failed() {
    let (api, _) = engine();
    let td = tempfile::tempdir().unwrap();
    std::fs::write(td.path().join("a"), b"file where a dir is declared").unwrap();
    let spec = TreeSpec::new().dir("a", TreeSpec::new()).dir("b", TreeSpec::new());
    let r = api
        .create_tree(&s(td.path()), &spec, &LocalAdapter::new(), CreateOptions::default().dry_run())
        .unwrap();
    assert_eq!(r.failed.len(), 1);
    assert_eq!(r.failed[0].error_id, "E_COLLISION");
    assert_eq!(r.count(OpOutcome::Planned), 2);
}

#[test]
fn plan_emits_redacted_fact_per_op() {
    let (api, facts) = engine();
    let td = tempfile::tempdir().unwrap();
    let spec = TreeSpec::new().dir("a", TreeSpec::new());
    let plan = api.plan(&s(&td.path().join("p")), &spec, &LocalAdapter::new()).unwrap();
    assert_eq!(plan.ops.len(), 2);
    let plan_facts = facts.of("plan");
    assert_eq!(plan_facts.len(), 2);
    assert!(plan_facts.iter().all(|f| f["ts"] == TS_ZERO));
}
