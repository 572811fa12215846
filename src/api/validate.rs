//! Read-only comparison of a resolved tree with what storage holds.
use std::collections::BTreeSet;

use log::Level;
use serde_json::json;

use super::TreeEngine;
use crate::adapters::StorageAdapter;
use crate::logging::audit::{AuditCtx, AuditMode};
use crate::logging::{now_iso, AuditSink, FactsEmitter, StageLogger};
use crate::types::ids::run_id;
use crate::types::node::{EntryKind, ResolvedNode, ResolvedTree};
use crate::types::report::{NodeFailure, TypeMismatch, ValidationReport};
use crate::types::safepath::PathStyle;

/// Compare `children` (declared under `dir`) with what the adapter lists there.
fn check_drift(
    adapter: &dyn StorageAdapter,
    dir: &str,
    children: &[ResolvedNode],
    style: PathStyle,
    report: &mut ValidationReport,
) {
    match adapter.list_children(dir) {
        Ok(names) => {
            for name in names {
                if !children.iter().any(|c| c.name == name) {
                    report.extra.insert(style.join(dir, &name));
                }
            }
        }
        Err(e) => report.failed.push(NodeFailure::new(dir, e)),
    }
}

pub(crate) fn inspect(tree: &ResolvedTree, adapter: &dyn StorageAdapter) -> ValidationReport {
    let mut report = ValidationReport::default();
    match adapter.exists(&tree.base) {
        Ok(EntryKind::Directory) => check_drift(adapter, &tree.base, &tree.children, tree.style, &mut report),
        Ok(_) => {}
        Err(e) => report.failed.push(NodeFailure::new(tree.base.clone(), e)),
    }
    for (_, node) in tree.pre_order() {
        match adapter.exists(&node.path) {
            Ok(EntryKind::Absent) => {
                report.missing.insert(node.path.clone());
            }
            Ok(found) if found.matches(node.kind) => {
                report.present.insert(node.path.clone());
                if node.is_dir() {
                    check_drift(adapter, &node.path, &node.children, tree.style, &mut report);
                }
            }
            Ok(found) => report.mismatched.push(TypeMismatch {
                path: node.path.clone(),
                expected: node.kind,
                found,
            }),
            Err(e) => report.failed.push(NodeFailure::new(node.path.clone(), e)),
        }
    }
    report
}

pub(super) fn run<E: FactsEmitter, A: AuditSink>(
    api: &TreeEngine<E, A>,
    tree: &ResolvedTree,
    adapter: &dyn StorageAdapter,
) -> ValidationReport {
    let report = inspect(tree, adapter);
    let keys: Vec<String> = tree.pre_order().iter().map(|(_, n)| n.path.clone()).collect();
    let tctx = AuditCtx::new(
        &api.facts,
        run_id("validate", &keys).to_string(),
        now_iso(),
        AuditMode::default(),
    );
    let mismatched: BTreeSet<&str> = report.mismatched.iter().map(|m| m.path.as_str()).collect();
    let ev = StageLogger::new(&tctx)
        .validate_result()
        .path(tree.base.clone())
        .merge(json!({
            "backend": adapter.backend().as_str(),
            "present": report.present.len(),
            "missing": report.missing,
            "mismatched": mismatched,
            "extra": report.extra,
            "failed": report.failed.len(),
        }));
    if report.is_complete() {
        ev.emit_success();
    } else {
        ev.emit_failure();
    }
    api.audit.log(
        if report.is_complete() { Level::Info } else { Level::Warn },
        &format!(
            "validate {}: {} present, {} missing, {} mismatched, {} extra",
            tree.base,
            report.present.len(),
            report.missing.len(),
            report.mismatched.len(),
            report.extra.len()
        ),
    );
    report
}
