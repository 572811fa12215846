//! Plan executor.
//!
//! Dry run inspects only; the plan it returns is the one a commit would run. Commit
//! runs the same ops in the same order. Collisions found while planning either stop the
//! run before any mutation (`ErrorPolicy::Abort`) or fail just the colliding node and its
//! descendants (`ErrorPolicy::ContinueOnError`). With more than one worker, top-level
//! subtrees run on a bounded pool once the base directory exists.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use log::Level;
use serde_json::json;

use super::options::{CancelToken, CreateOptions};
use super::TreeEngine;
use crate::adapters::StorageAdapter;
use crate::fs::versioned_name;
use crate::logging::audit::{AuditCtx, AuditMode};
use crate::logging::{ts_for_mode, AuditSink, FactsEmitter, StageLogger};
use crate::policy::{ConflictPolicy, ErrorPolicy, Policy};
use crate::types::errors::{Error, ErrorKind, Result};
use crate::types::ids::{op_id, plan_id};
use crate::types::node::{Outcome, ResolvedTree};
use crate::types::plan::{OperationPlan, PlannedAction};
use crate::types::report::{CreateReport, NodeFailure, OpOutcome, OpRecord};
use crate::types::safepath::PathStyle;

/// Whole-run deadline, slow-call threshold and the cancel switch.
///
/// Per-call limits are enforced by the adapters themselves (`with_timeout`), so a
/// call that returns has really finished and its result stands.
pub(crate) struct RunLimits {
    slow_after: Option<Duration>,
    deadline: Option<Instant>,
    cancel: Option<CancelToken>,
}

impl RunLimits {
    pub(crate) fn new(policy: &Policy, cancel: Option<CancelToken>, t0: Instant) -> Self {
        Self {
            slow_after: policy.op_timeout(),
            deadline: policy
                .timeouts
                .run_timeout_ms
                .map(|ms| t0 + Duration::from_millis(ms)),
            cancel,
        }
    }

    /// Checked at op boundaries only.
    pub(crate) fn interrupted(&self) -> Option<ErrorKind> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Some(ErrorKind::Cancelled);
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => Some(ErrorKind::Timeout),
            _ => None,
        }
    }

    /// Run one adapter call and warn when it outlived the op timeout.
    pub(crate) fn timed<T>(&self, path: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let t = Instant::now();
        let r = f();
        if let Some(limit) = self.slow_after {
            let took = t.elapsed();
            if took > limit {
                log::warn!(
                    "{path}: adapter call took {}ms, over the {}ms op timeout",
                    took.as_millis(),
                    limit.as_millis()
                );
            }
        }
        r
    }
}

/// Recorded when a run stops early.
pub(crate) fn interruption_error(kind: ErrorKind, at: &str) -> Error {
    let msg = match kind {
        ErrorKind::Cancelled => "run cancelled by caller",
        _ => "run timeout exceeded",
    };
    Error::new(kind, msg).at(at)
}

fn versioned_sibling(style: PathStyle, path: &str, tag: &str) -> String {
    match path.rfind(style.separator()) {
        Some(i) => format!("{}{}", &path[..=i], versioned_name(&path[i + 1..], tag)),
        None => versioned_name(path, tag),
    }
}

/// Write honoring the conflict policy. Returns the versioned copy's path when one was made.
pub(crate) fn write_with_policy(
    adapter: &dyn StorageAdapter,
    path: &str,
    content: &[u8],
    conflict: ConflictPolicy,
    tag: &str,
) -> Result<(Outcome, Option<String>)> {
    match conflict {
        ConflictPolicy::Reject => Ok((adapter.write_file(path, content, false)?, None)),
        ConflictPolicy::Overwrite => Ok((adapter.write_file(path, content, true)?, None)),
        ConflictPolicy::Version => match adapter.write_file(path, content, false) {
            Err(e) if e.kind == ErrorKind::ContentConflict => {
                let backup = versioned_sibling(adapter.path_style(), path, tag);
                adapter.move_or_copy(path, &backup)?;
                log::info!("kept previous content of {path} as {backup}");
                Ok((adapter.write_file(path, content, true)?, Some(backup)))
            }
            other => Ok((other?, None)),
        },
    }
}

#[derive(Clone, Debug)]
struct OpResult {
    outcome: OpOutcome,
    error: Option<Error>,
    backup: Option<String>,
    elapsed_ms: u64,
}

impl OpResult {
    fn not_attempted() -> Self {
        Self {
            outcome: OpOutcome::NotAttempted,
            error: None,
            backup: None,
            elapsed_ms: 0,
        }
    }

    fn failed(error: Error) -> Self {
        Self {
            outcome: OpOutcome::Failed,
            error: Some(error),
            backup: None,
            elapsed_ms: 0,
        }
    }

    fn is_ok(&self) -> bool {
        matches!(self.outcome, OpOutcome::Applied | OpOutcome::AlreadySatisfied)
    }
}

fn op_outcome(o: Outcome) -> OpOutcome {
    match o {
        Outcome::Applied => OpOutcome::Applied,
        Outcome::AlreadySatisfied => OpOutcome::AlreadySatisfied,
    }
}

struct Exec<'a> {
    plan: &'a OperationPlan,
    adapter: &'a dyn StorageAdapter,
    opts: &'a CreateOptions,
    limits: &'a RunLimits,
    tag: &'a str,
    abort: AtomicBool,
    interrupt: Mutex<Option<ErrorKind>>,
}

impl Exec<'_> {
    fn perform(&self, idx: usize) -> Result<(Outcome, Option<String>)> {
        let op = &self.plan.ops[idx];
        let path = op.path.as_str();
        let (mut outcome, backup) = match op.action {
            PlannedAction::Skip => (Outcome::AlreadySatisfied, None),
            PlannedAction::CreateDir => (self.limits.timed(path, || self.adapter.create_directory(path))?, None),
            PlannedAction::WriteFile => {
                let content = op.content.as_deref().unwrap_or_default();
                self.limits.timed(path, || {
                    write_with_policy(self.adapter, path, content, self.opts.conflict, self.tag)
                })?
            }
        };
        if let Some(mode) = op.perms {
            if self.limits.timed(path, || self.adapter.set_permissions(path, mode))? == Outcome::Applied {
                outcome = Outcome::Applied;
            }
        }
        Ok((outcome, backup))
    }

    fn run_op(&self, idx: usize, ok: &HashMap<usize, bool>) -> OpResult {
        if self.abort.load(Ordering::SeqCst) {
            return OpResult::not_attempted();
        }
        if let Some(kind) = self.limits.interrupted() {
            let mut slot = self.interrupt.lock().unwrap_or_else(PoisonError::into_inner);
            slot.get_or_insert(kind);
            return OpResult::not_attempted();
        }
        if let Some(p) = self.plan.ops[idx].parent {
            if !ok.get(&p).copied().unwrap_or(false) {
                return OpResult::not_attempted();
            }
        }
        if let Some(c) = self.plan.collisions.iter().find(|c| c.op == idx) {
            self.note_failure();
            return OpResult::failed(c.error.clone());
        }
        let t = Instant::now();
        match self.perform(idx) {
            Ok((outcome, backup)) => OpResult {
                outcome: op_outcome(outcome),
                error: None,
                backup,
                elapsed_ms: t.elapsed().as_millis() as u64,
            },
            Err(e) => {
                self.note_failure();
                OpResult {
                    elapsed_ms: t.elapsed().as_millis() as u64,
                    ..OpResult::failed(e)
                }
            }
        }
    }

    fn note_failure(&self) {
        if self.opts.on_error == ErrorPolicy::Abort {
            self.abort.store(true, Ordering::SeqCst);
        }
    }

    /// Run `group` in order. `seed` holds the status of ops outside the group that
    /// members depend on.
    fn run_group(&self, group: &[usize], seed: &HashMap<usize, bool>) -> Vec<(usize, OpResult)> {
        let mut ok = seed.clone();
        let mut out = Vec::with_capacity(group.len());
        for &idx in group {
            let r = self.run_op(idx, &ok);
            ok.insert(idx, r.is_ok());
            out.push((idx, r));
        }
        out
    }

    fn run_pool(&self, workers: usize) -> Vec<(usize, OpResult)> {
        let mut results = self.run_group(&[0], &HashMap::new());
        let seed: HashMap<usize, bool> = results.iter().map(|(i, r)| (*i, r.is_ok())).collect();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for idx in 1..self.plan.ops.len() {
            if self.plan.subtree_of(idx) == Some(idx) {
                groups.push(Vec::new());
            }
            if let Some(g) = groups.last_mut() {
                g.push(idx);
            }
        }
        let next = AtomicUsize::new(0);
        let collected = Mutex::new(Vec::new());
        std::thread::scope(|s| {
            for _ in 0..workers.min(groups.len()) {
                s.spawn(|| loop {
                    let g = next.fetch_add(1, Ordering::SeqCst);
                    let Some(group) = groups.get(g) else { break };
                    let out = self.run_group(group, &seed);
                    collected
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .extend(out);
                });
            }
        });
        results.extend(collected.into_inner().unwrap_or_else(PoisonError::into_inner));
        results
    }
}

pub(super) fn run<E: FactsEmitter, A: AuditSink>(
    api: &TreeEngine<E, A>,
    tree: ResolvedTree,
    plan: OperationPlan,
    adapter: &dyn StorageAdapter,
    opts: &CreateOptions,
) -> CreateReport {
    let t0 = Instant::now();
    let dry = opts.mode.is_dry_run();
    let pid = plan_id(&plan);
    let tctx = AuditCtx::new(
        &api.facts,
        pid.to_string(),
        ts_for_mode(opts.mode),
        AuditMode {
            dry_run: dry,
            redact: dry,
        },
    );
    let slog = StageLogger::new(&tctx);
    let workers = api.policy.concurrency.workers.max(1);
    slog.apply_attempt()
        .path(plan.base.clone())
        .merge(json!({
            "backend": adapter.backend().as_str(),
            "ops": plan.ops.len(),
            "collisions": plan.collisions.len(),
            "conflict": opts.conflict,
            "on_error": opts.on_error,
            "workers": workers,
        }))
        .emit_success();

    let mut results: Vec<OpResult> = vec![OpResult::not_attempted(); plan.ops.len()];
    let mut interrupted = None;
    if dry {
        for (idx, r) in results.iter_mut().enumerate() {
            *r = match plan.collisions.iter().find(|c| c.op == idx) {
                Some(c) => OpResult::failed(c.error.clone()),
                None => OpResult {
                    outcome: OpOutcome::Planned,
                    ..OpResult::not_attempted()
                },
            };
        }
    } else if !plan.collisions.is_empty() && opts.on_error == ErrorPolicy::Abort {
        for c in &plan.collisions {
            results[c.op] = OpResult::failed(c.error.clone());
        }
    } else {
        let limits = RunLimits::new(&api.policy, opts.cancel.clone(), t0);
        let exec = Exec {
            plan: &plan,
            adapter,
            opts,
            limits: &limits,
            tag: &api.policy.backup.tag,
            abort: AtomicBool::new(false),
            interrupt: Mutex::new(None),
        };
        let done = if workers > 1 && plan.ops.len() > 2 {
            exec.run_pool(workers)
        } else {
            let all: Vec<usize> = (0..plan.ops.len()).collect();
            exec.run_group(&all, &HashMap::new())
        };
        for (idx, r) in done {
            results[idx] = r;
        }
        interrupted = exec.interrupt.into_inner().unwrap_or_else(PoisonError::into_inner);
    }

    let mut records = Vec::with_capacity(plan.ops.len());
    let mut completed = Vec::new();
    let mut failed = Vec::new();
    let mut not_attempted = Vec::new();
    for (idx, (op, r)) in plan.ops.iter().zip(results).enumerate() {
        let ev = slog
            .apply_result()
            .action(op_id(&pid, op, idx).to_string())
            .path(op.path.clone())
            .field("action", json!(op.action))
            .field("outcome", json!(r.outcome))
            .field("duration_ms", json!(r.elapsed_ms));
        let ev = match &r.backup {
            Some(b) => ev.field("backup_path", json!(b)),
            None => ev,
        };
        match r.outcome {
            OpOutcome::Applied | OpOutcome::AlreadySatisfied => {
                completed.push(op.path.clone());
                ev.emit_success();
            }
            OpOutcome::Planned => ev.emit_success(),
            OpOutcome::NotAttempted => {
                not_attempted.push(op.path.clone());
                ev.emit_warn();
            }
            OpOutcome::Failed => {
                let err = r
                    .error
                    .unwrap_or_else(|| Error::new(ErrorKind::AdapterIo, "unknown failure").at(op.path.clone()));
                let f = NodeFailure::new(op.path.clone(), err);
                ev.error(f.error_id, &f.error).emit_failure();
                failed.push(f);
            }
        }
        records.push(OpRecord {
            path: op.path.clone(),
            action: op.action,
            outcome: r.outcome,
        });
    }
    let cancelled = interrupted == Some(ErrorKind::Cancelled);
    if interrupted == Some(ErrorKind::Timeout) {
        failed.push(NodeFailure::new(
            plan.base.clone(),
            interruption_error(ErrorKind::Timeout, &plan.base),
        ));
    }

    let duration_ms = t0.elapsed().as_millis() as u64;
    let summary = slog.run_summary().path(plan.base.clone()).merge(json!({
        "verb": "create_tree",
        "completed": completed.len(),
        "failed": failed.len(),
        "not_attempted": not_attempted.len(),
        "cancelled": cancelled,
        "duration_ms": duration_ms,
    }));
    if failed.is_empty() && !cancelled {
        summary.emit_success();
    } else {
        summary.emit_failure();
    }
    api.audit.log(
        if failed.is_empty() { Level::Info } else { Level::Warn },
        &format!(
            "create_tree {}{}: {} completed, {} failed, {} not attempted",
            plan.base,
            if dry { " (dry run)" } else { "" },
            completed.len(),
            failed.len(),
            not_attempted.len()
        ),
    );

    CreateReport {
        plan_id: pid,
        mode: opts.mode,
        tree,
        plan,
        records,
        completed,
        failed,
        not_attempted,
        cancelled,
        duration_ms,
    }
}
