//! Tree walker: resolved tree -> ordered operation plan.
//!
//! Depth-first pre-order. The base directory is op 0 and every directory precedes its
//! children. Every node is checked with `exists` (the only adapter call made here), which
//! decides `Skip` versus `CreateDir` and surfaces file/directory collisions before
//! anything is mutated.
use serde_json::json;

use crate::adapters::StorageAdapter;
use crate::logging::audit::{AuditCtx, AuditMode};
use crate::logging::{FactsEmitter, StageLogger, TS_ZERO};
use crate::types::errors::{Error, ErrorKind};
use crate::types::ids::{op_id, plan_id};
use crate::types::node::{EntryKind, NodeKind, ResolvedNode, ResolvedTree};
use crate::types::plan::{OperationPlan, PlannedAction, PlannedCollision, PlannedOp};

fn collision(path: &str, expected: NodeKind) -> Error {
    let what = match expected {
        NodeKind::Directory => "a file occupies this directory path",
        NodeKind::File => "a directory occupies this file path",
    };
    Error::new(ErrorKind::PathCollision, format!("{path}: {what}")).at(path)
}

struct Walker<'a> {
    adapter: &'a dyn StorageAdapter,
    plan: OperationPlan,
}

impl Walker<'_> {
    fn push(
        &mut self,
        path: &str,
        rel: String,
        kind: NodeKind,
        parent: Option<usize>,
        content: Option<Vec<u8>>,
        perms: Option<u32>,
    ) -> usize {
        let idx = self.plan.ops.len();
        let found = self.adapter.exists(path);
        let (action, reason) = match (&found, kind) {
            (Ok(EntryKind::Directory), NodeKind::Directory) => (PlannedAction::Skip, "exists"),
            (Ok(EntryKind::File), NodeKind::File) => (PlannedAction::WriteFile, "exists; content compared on write"),
            (Ok(EntryKind::Absent), NodeKind::Directory) => (PlannedAction::CreateDir, "absent"),
            (Ok(EntryKind::Absent), NodeKind::File) => (PlannedAction::WriteFile, "absent"),
            (Ok(_), NodeKind::Directory) => (PlannedAction::CreateDir, "collision"),
            (Ok(_), NodeKind::File) => (PlannedAction::WriteFile, "collision"),
            (Err(_), NodeKind::Directory) => (PlannedAction::CreateDir, "exists failed"),
            (Err(_), NodeKind::File) => (PlannedAction::WriteFile, "exists failed"),
        };
        match found {
            Ok(EntryKind::Absent) => {}
            Ok(k) if k.matches(kind) => {}
            Ok(_) => self.plan.collisions.push(PlannedCollision {
                op: idx,
                error: collision(path, kind),
            }),
            Err(e) => self.plan.collisions.push(PlannedCollision { op: idx, error: e }),
        }
        self.plan.ops.push(PlannedOp {
            path: path.to_string(),
            rel,
            kind,
            action,
            reason: reason.to_string(),
            parent,
            content,
            perms,
        });
        idx
    }

    fn walk(&mut self, nodes: &[ResolvedNode], parent: usize, prefix: &str) {
        for n in nodes {
            let rel = if prefix.is_empty() {
                n.name.clone()
            } else {
                format!("{prefix}/{}", n.name)
            };
            let content = match n.kind {
                NodeKind::File => Some(n.content.clone().unwrap_or_default()),
                NodeKind::Directory => None,
            };
            let idx = self.push(&n.path, rel.clone(), n.kind, Some(parent), content, n.perms);
            if n.is_dir() {
                self.walk(&n.children, idx, &rel);
            }
        }
    }
}

/// Build the plan for `tree` against the current state of `adapter`.
pub(crate) fn build(tree: &ResolvedTree, adapter: &dyn StorageAdapter) -> OperationPlan {
    let mut w = Walker {
        adapter,
        plan: OperationPlan {
            base: tree.base.clone(),
            ..OperationPlan::default()
        },
    };
    let root = w.push(&tree.base, String::new(), NodeKind::Directory, None, None, None);
    w.walk(&tree.children, root, "");
    w.plan
}

/// Emit one `plan` fact per op. Plan facts are always redacted.
pub(crate) fn emit_plan_facts(facts: &dyn FactsEmitter, plan: &OperationPlan) {
    let pid = plan_id(plan);
    let ctx = AuditCtx::new(
        facts,
        pid.to_string(),
        TS_ZERO.to_string(),
        AuditMode {
            dry_run: true,
            redact: true,
        },
    );
    let slog = StageLogger::new(&ctx);
    for (idx, op) in plan.ops.iter().enumerate() {
        let ev = slog
            .plan()
            .action(op_id(&pid, op, idx).to_string())
            .path(op.path.clone())
            .field("action", json!(op.action))
            .field("reason", json!(op.reason));
        match plan.collisions.iter().find(|c| c.op == idx) {
            Some(c) => {
                let id = crate::api::errors::id_str(crate::api::errors::error_id_for(c.error.kind));
                ev.error(id, &c.error).emit_failure();
            }
            None => ev.emit_success(),
        }
    }
}
