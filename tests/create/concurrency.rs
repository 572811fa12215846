use std::time::Duration;

use treewright::adapters::{LocalAdapter, MemoryObjectClient, S3Adapter};
use treewright::policy::Policy;
use treewright::types::{ErrorKind, OpOutcome};
use treewright::{CancelToken, CreateOptions, TreeSpec};

use crate::helpers::{engine, engine_with, s};

fn wide(n: usize) -> TreeSpec {
    (0..n).fold(TreeSpec::new(), |spec, i| {
        spec.dir(
            format!("part{i:02}"),
            TreeSpec::new()
                .dir("raw", TreeSpec::new())
                .file("meta.json", format!("{{\"part\":{i}}}")),
        )
    })
}

#[test]
fn worker_pool_builds_everything_and_reports_in_plan_order() {
    let mut policy = Policy::default();
    policy.concurrency.workers = 4;
    let (api, facts) = engine_with(policy);
    let td = tempfile::tempdir().unwrap();
    let base = s(&td.path().join("p"));
    let r = api
        .create_tree(&base, &wide(12), &LocalAdapter::new(), CreateOptions::default())
        .unwrap();
    assert!(r.is_success(), "{:?}", r.failed);
    assert_eq!(r.completed.len(), 1 + 12 * 3);
    for i in 0..12 {
        assert!(td.path().join(format!("p/part{i:02}/raw")).is_dir());
    }
    let paths: Vec<String> = facts
        .of("apply.result")
        .iter()
        .map(|f| f["path"].as_str().unwrap().to_string())
        .collect();
    let planned: Vec<String> = r.plan.ops.iter().map(|op| op.path.clone()).collect();
    assert_eq!(paths, planned);
}

#[test]
fn cancelled_before_start_attempts_nothing() {
    let (api, facts) = engine();
    let td = tempfile::tempdir().unwrap();
    let token = CancelToken::new();
    token.cancel();
    let r = api
        .create_tree(
            &s(&td.path().join("p")),
            &wide(3),
            &LocalAdapter::new(),
            CreateOptions::default().with_cancel(token),
        )
        .unwrap();
    assert!(r.cancelled);
    assert!(r.failed.is_empty());
    assert_eq!(r.count(OpOutcome::NotAttempted), r.plan.ops.len());
    assert!(!td.path().join("p").exists());
    assert_eq!(facts.of("run.summary")[0]["cancelled"], true);
}

#[test]
fn adapter_timeouts_fail_calls_without_writing() {
    let (api, _) = engine();
    let client = MemoryObjectClient::new("bucket");
    client.set_latency(Some(Duration::from_millis(30)));
    let adapter = S3Adapter::new(client.clone()).with_timeout(Some(Duration::from_millis(5)));
    let r = api
        .create_tree("data", &wide(1), &adapter, CreateOptions::default())
        .unwrap();
    assert!(!r.failed.is_empty());
    assert!(r.completed.is_empty());
    assert!(r.failed.iter().all(|f| f.error.kind == ErrorKind::Timeout));
    assert_eq!(r.failed[0].error_id, "E_TIMEOUT");
    assert!(client.keys().is_empty(), "{:?}", client.keys());
}

#[test]
fn slow_calls_that_finish_are_reported_as_done() {
    let mut policy = Policy::default();
    policy.timeouts.op_timeout_ms = Some(5);
    let (api, _) = engine_with(policy);
    let client = MemoryObjectClient::new("bucket");
    client.set_latency(Some(Duration::from_millis(20)));
    let r = api
        .create_tree("data", &wide(1), &S3Adapter::new(client.clone()), CreateOptions::default())
        .unwrap();
    assert!(r.is_success(), "{:?}", r.failed);
    assert_eq!(r.count(OpOutcome::Applied), r.plan.ops.len());
    assert!(client.keys().contains(&"data/".to_string()));
}

#[test]
fn policy_timeout_reaches_the_local_adapter() {
    let mut policy = Policy::default();
    policy.timeouts.op_timeout_ms = Some(10_000);
    let (api, _) = engine_with(policy.clone());
    let td = tempfile::tempdir().unwrap();
    let adapter = LocalAdapter::new().with_timeout(policy.op_timeout());
    let r = api
        .create_tree(&s(&td.path().join("p")), &wide(2), &adapter, CreateOptions::default())
        .unwrap();
    assert!(r.is_success(), "{:?}", r.failed);
    assert!(td.path().join("p/part01/meta.json").is_file());
}

#[test]
fn run_timeout_stops_at_the_next_boundary() {
    let mut policy = Policy::default();
    policy.timeouts.run_timeout_ms = Some(0);
    let (api, _) = engine_with(policy);
    let td = tempfile::tempdir().unwrap();
    let base = s(&td.path().join("p"));
    let r = api
        .create_tree(&base, &wide(2), &LocalAdapter::new(), CreateOptions::default())
        .unwrap();
    assert!(!r.cancelled);
    assert_eq!(r.count(OpOutcome::NotAttempted), r.plan.ops.len());
    assert_eq!(r.failed.len(), 1);
    assert_eq!(r.failed[0].path, base);
    assert_eq!(r.failed[0].error.kind, ErrorKind::Timeout);
}
