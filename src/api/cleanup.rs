//! Tear down a resolved tree.
//!
//! The walk is bottom-up. Declared files are removed; a declared directory is removed
//! only once `list_children` shows nothing left in it that the tree does not declare.
//! Undeclared entries are drift: they are reported as kept and their ancestors stay.
//! Every delete is re-checked to lie strictly below the base, and the base itself is
//! never deleted. Without confirmation the same walk runs read-only and reports what
//! would go.
use log::Level;
use serde_json::json;

use super::TreeEngine;
use crate::adapters::StorageAdapter;
use crate::logging::audit::{AuditCtx, AuditMode};
use crate::logging::{now_iso, AuditSink, FactsEmitter, StageLogger, TS_ZERO};
use crate::types::errors::{Error, ErrorKind};
use crate::types::ids::run_id;
use crate::types::node::{EntryKind, ResolvedNode, ResolvedTree};
use crate::types::report::{CleanupReport, NodeFailure};
use crate::types::safepath::SafePath;

struct Sweep<'a> {
    adapter: &'a dyn StorageAdapter,
    tree: &'a ResolvedTree,
    confirm: bool,
    removed: Vec<String>,
    kept: Vec<String>,
    failed: Vec<NodeFailure>,
}

impl<'a> Sweep<'a> {
    fn new(adapter: &'a dyn StorageAdapter, tree: &'a ResolvedTree, confirm: bool) -> Self {
        Self {
            adapter,
            tree,
            confirm,
            removed: Vec::new(),
            kept: Vec::new(),
            failed: Vec::new(),
        }
    }

    fn fail(&mut self, path: &str, e: Error) -> bool {
        self.failed.push(NodeFailure::new(path.to_string(), e));
        false
    }

    /// True when `node` is gone afterwards (or would be, unconfirmed).
    fn node(&mut self, node: &ResolvedNode) -> bool {
        match self.adapter.exists(&node.path) {
            Err(e) => return self.fail(&node.path, e),
            Ok(EntryKind::Absent) => return true,
            Ok(found) if !found.matches(node.kind) => {
                let e = Error::new(
                    ErrorKind::PathCollision,
                    format!("{}: declared {:?} but found {found:?}", node.path, node.kind),
                )
                .at(&node.path);
                return self.fail(&node.path, e);
            }
            Ok(_) => {}
        }
        let mut clear = true;
        if node.is_dir() {
            for c in node.children.iter().rev() {
                clear &= self.node(c);
            }
            let names = match self.adapter.list_children(&node.path) {
                Ok(names) => names,
                Err(e) => return self.fail(&node.path, e),
            };
            for n in names.iter().filter(|n| node.get(n).is_none()) {
                self.kept.push(self.tree.style.join(&node.path, n));
                clear = false;
            }
        }
        clear && self.remove(node)
    }

    fn remove(&mut self, node: &ResolvedNode) -> bool {
        if !self.confirm {
            self.removed.push(node.path.clone());
            return true;
        }
        let target = match SafePath::from_rooted(&self.tree.base, &node.path, self.tree.style) {
            Ok(p) => p.as_path(),
            Err(e) => return self.fail(&node.path, e),
        };
        // A file, or a directory with nothing undeclared left in it.
        match self.adapter.delete_recursive(&target) {
            Ok(_) => {
                self.removed.push(target);
                true
            }
            Err(e) => self.fail(&target, e),
        }
    }
}

pub(super) fn run<E: FactsEmitter, A: AuditSink>(
    api: &TreeEngine<E, A>,
    tree: &ResolvedTree,
    adapter: &dyn StorageAdapter,
    confirm: bool,
) -> CleanupReport {
    let keys: Vec<String> = tree.pre_order().iter().map(|(_, n)| n.path.clone()).collect();
    let tctx = AuditCtx::new(
        &api.facts,
        run_id("cleanup", &keys).to_string(),
        if confirm { now_iso() } else { TS_ZERO.to_string() },
        AuditMode {
            dry_run: !confirm,
            redact: !confirm,
        },
    );
    let slog = StageLogger::new(&tctx);
    let mut sweep = Sweep::new(adapter, tree, confirm);

    if !confirm {
        for top in tree.children.iter().rev() {
            sweep.node(top);
        }
        slog.cleanup_result()
            .path(tree.base.clone())
            .field("would_delete", json!(sweep.removed))
            .field("kept", json!(sweep.kept))
            .emit_success();
        api.audit.log(
            Level::Info,
            &format!(
                "cleanup {} (unconfirmed): {} paths would be deleted, {} undeclared kept",
                tree.base,
                sweep.removed.len(),
                sweep.kept.len()
            ),
        );
        return CleanupReport::WouldDelete(sweep.removed);
    }

    for top in tree.children.iter().rev() {
        let (r0, k0, f0) = (sweep.removed.len(), sweep.kept.len(), sweep.failed.len());
        sweep.node(top);
        let ev = slog
            .cleanup_result()
            .path(top.path.clone())
            .field("deleted", json!(sweep.removed[r0..]))
            .field("kept", json!(sweep.kept[k0..]));
        match sweep.failed[f0..].first() {
            None => ev.emit_success(),
            Some(f) => ev
                .field("failures", json!(sweep.failed.len() - f0))
                .error(f.error_id, &f.error)
                .emit_failure(),
        }
    }
    let Sweep {
        removed: deleted,
        kept,
        failed,
        ..
    } = sweep;
    api.audit.log(
        if failed.is_empty() && kept.is_empty() {
            Level::Info
        } else {
            Level::Warn
        },
        &format!(
            "cleanup {}: {} deleted, {} undeclared kept, {} failed",
            tree.base,
            deleted.len(),
            kept.len(),
            failed.len()
        ),
    );
    CleanupReport::Deleted {
        deleted,
        kept,
        failed,
    }
}
