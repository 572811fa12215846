//! Move a stored tree from one (base, adapter) pair to another.
//!
//! The source is discovered by listing, then walked depth-first: each directory is
//! created at the destination before its children, each file is moved. Within one
//! backend instance files are renamed. Across instances each file is copied, verified by
//! size (and SHA-256 when enabled), and only then deleted at the source. A failed
//! source delete after a verified copy is reported as `MigrationConsistency` and never
//! retried. Atomicity is per node only.
use std::time::Instant;

use log::{debug, Level};
use serde_json::json;

use super::apply::{interruption_error, write_with_policy, RunLimits};
use super::errors::ApiError;
use super::options::MigrateOptions;
use super::TreeEngine;
use crate::adapters::StorageAdapter;
use crate::fs::sha256_hex;
use crate::logging::audit::{AuditCtx, AuditMode};
use crate::logging::{ts_for_mode, AuditSink, FactsEmitter, StageLogger};
use crate::policy::ErrorPolicy;
use crate::resolve::resolver::validate_segment;
use crate::resolve::PathResolver;
use crate::types::errors::{Error, ErrorKind, Result};
use crate::types::ids::run_id;
use crate::types::node::{EntryKind, NodeKind};
use crate::types::report::{MigrationReport, MoveMethod, MovedEntry, NodeFailure};
use crate::types::safepath::PathStyle;

/// One discovered source node, relative to the source base.
#[derive(Clone, Debug)]
struct SourceEntry {
    rel: Vec<String>,
    kind: NodeKind,
    /// Index of the parent directory entry.
    parent: Option<usize>,
}

fn join_all(style: PathStyle, base: &str, rel: &[String]) -> String {
    rel.iter().fold(base.to_string(), |acc, seg| style.join(&acc, seg))
}

fn discover(adapter: &dyn StorageAdapter, base: &str) -> Result<Vec<SourceEntry>> {
    fn go(
        adapter: &dyn StorageAdapter,
        base: &str,
        rel: &[String],
        parent: Option<usize>,
        out: &mut Vec<SourceEntry>,
    ) -> Result<()> {
        let dir = join_all(adapter.path_style(), base, rel);
        for name in adapter.list_children(&dir)? {
            validate_segment(&name).map_err(|e| Error { path: Some(dir.clone()), ..e })?;
            let mut child = rel.to_vec();
            child.push(name);
            let path = join_all(adapter.path_style(), base, &child);
            let kind = match adapter.exists(&path)? {
                EntryKind::Directory => NodeKind::Directory,
                EntryKind::File => NodeKind::File,
                // Vanished between list and exists.
                EntryKind::Absent => continue,
            };
            let idx = out.len();
            out.push(SourceEntry {
                rel: child.clone(),
                kind,
                parent,
            });
            if kind == NodeKind::Directory {
                go(adapter, base, &child, Some(idx), out)?;
            }
        }
        Ok(())
    }
    let mut out = Vec::new();
    go(adapter, base, &[], None, &mut out)?;
    Ok(out)
}

fn copy_verify_delete(
    src: &dyn StorageAdapter,
    dst: &dyn StorageAdapter,
    from: &str,
    to: &str,
    opts: &MigrateOptions,
    tag: &str,
    limits: &RunLimits,
) -> Result<()> {
    let bytes = limits.timed(from, || src.read_file(from))?;
    limits.timed(to, || write_with_policy(dst, to, &bytes, opts.conflict, tag))?;
    let size = limits.timed(to, || dst.file_size(to))?;
    if size != bytes.len() as u64 {
        return Err(Error::new(
            ErrorKind::AdapterIo,
            format!("{to}: size {size} after copy, expected {}; source kept", bytes.len()),
        )
        .at(to));
    }
    if opts.verify_hash {
        let copied = limits.timed(to, || dst.read_file(to))?;
        if sha256_hex(&copied) != sha256_hex(&bytes) {
            return Err(Error::new(ErrorKind::AdapterIo, format!("{to}: hash mismatch after copy; source kept")).at(to));
        }
    }
    limits
        .timed(from, || src.delete_recursive(from))
        .map_err(|e| {
            Error::new(
                ErrorKind::MigrationConsistency,
                format!("{from}: verified copy at {to} but source delete failed: {}", e.msg),
            )
            .at(from)
        })?;
    Ok(())
}

/// Remove source directories left empty by the move, deepest first.
fn prune_source_dirs(src: &dyn StorageAdapter, base: &str, entries: &[SourceEntry]) {
    let style = src.path_style();
    let dirs = entries
        .iter()
        .rev()
        .filter(|e| e.kind == NodeKind::Directory)
        .map(|e| join_all(style, base, &e.rel))
        .chain(std::iter::once(base.to_string()));
    for dir in dirs {
        match src.list_children(&dir) {
            Ok(children) if children.is_empty() => {
                if let Err(e) = src.delete_recursive(&dir) {
                    debug!("migrate: left empty source directory {dir}: {e}");
                }
            }
            Ok(_) => debug!("migrate: source directory {dir} not empty; kept"),
            Err(e) => debug!("migrate: cannot list {dir}: {e}"),
        }
    }
}

pub(super) fn run<E: FactsEmitter, A: AuditSink>(
    api: &TreeEngine<E, A>,
    src_base: &str,
    dst_base: &str,
    src: &dyn StorageAdapter,
    dst: &dyn StorageAdapter,
    opts: &MigrateOptions,
) -> std::result::Result<MigrationReport, ApiError> {
    let t0 = Instant::now();
    let src_base = PathResolver::new(&api.env, src.path_style()).resolve_base(src_base)?;
    let dst_base = PathResolver::new(&api.env, dst.path_style()).resolve_base(dst_base)?;
    let src_kind = src.exists(&src_base)?;
    let entries = match src_kind {
        EntryKind::Absent => {
            return Err(ApiError::NotFound(
                Error::new(ErrorKind::NotFound, format!("migration source {src_base} does not exist")).at(src_base),
            ))
        }
        EntryKind::File => Vec::new(),
        EntryKind::Directory => discover(src, &src_base)?,
    };
    let same_instance = src.instance_id() == dst.instance_id();
    if same_instance && src.path_style().same_or_inside(&src_base, &dst_base) {
        return Err(ApiError::PathTraversal(
            Error::new(
                ErrorKind::PathTraversal,
                format!("destination {dst_base} is the source {src_base} or lies inside it"),
            )
            .at(dst_base),
        ));
    }
    let dry = opts.mode.is_dry_run();
    let method = if dry {
        MoveMethod::Planned
    } else if same_instance {
        MoveMethod::Rename
    } else {
        MoveMethod::CopyVerifyDelete
    };
    let keys: Vec<String> = entries.iter().map(|e| e.rel.join("/")).collect();
    let pid = run_id("migrate", &keys);
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
    slog.migrate_attempt()
        .path(src_base.clone())
        .merge(json!({
            "from_backend": src.backend().as_str(),
            "to_backend": dst.backend().as_str(),
            "to": dst_base,
            "same_instance": same_instance,
            "entries": entries.len(),
        }))
        .emit_success();

    let limits = RunLimits::new(&api.policy, opts.cancel.clone(), t0);
    let tag = api.policy.backup.tag.as_str();
    let mut moved = Vec::new();
    let mut failed: Vec<NodeFailure> = Vec::new();
    let mut not_attempted = Vec::new();
    let mut cancelled = false;

    // Root first: the single file, or the destination base directory.
    let root_kind = if src_kind == EntryKind::File {
        NodeKind::File
    } else {
        NodeKind::Directory
    };
    let root = if dry {
        Ok(())
    } else {
        match root_kind {
            NodeKind::File if same_instance => limits.timed(&src_base, || src.move_or_copy(&src_base, &dst_base)).map(|_| ()),
            NodeKind::File => copy_verify_delete(src, dst, &src_base, &dst_base, opts, tag, &limits),
            NodeKind::Directory => limits.timed(&dst_base, || dst.create_directory(&dst_base)).map(|_| ()),
        }
    };
    let root_ok = match root {
        Ok(()) => {
            moved.push(MovedEntry {
                from: src_base.clone(),
                to: dst_base.clone(),
                kind: root_kind,
                method,
            });
            true
        }
        // Verified copy exists; the children (if any) can still move.
        Err(e) if e.kind == ErrorKind::MigrationConsistency => {
            failed.push(NodeFailure::new(src_base.clone(), e));
            true
        }
        Err(e) => {
            failed.push(NodeFailure::new(src_base.clone(), e));
            false
        }
    };

    let mut ok = vec![false; entries.len()];
    let mut stop = !root_ok;
    for (idx, entry) in entries.iter().enumerate() {
        let from = join_all(src.path_style(), &src_base, &entry.rel);
        let to = join_all(dst.path_style(), &dst_base, &entry.rel);
        let parent_ok = entry.parent.map_or(root_ok, |p| ok[p]);
        if stop || !parent_ok {
            not_attempted.push(from);
            continue;
        }
        if !dry {
            if let Some(kind) = limits.interrupted() {
                cancelled = kind == ErrorKind::Cancelled;
                if !cancelled {
                    failed.push(NodeFailure::new(from.clone(), interruption_error(kind, &from)));
                }
                not_attempted.push(from);
                stop = true;
                continue;
            }
        }
        let result = if dry {
            Ok(())
        } else {
            match entry.kind {
                NodeKind::Directory => limits.timed(&to, || dst.create_directory(&to)).map(|_| ()),
                NodeKind::File if same_instance => limits.timed(&from, || src.move_or_copy(&from, &to)).map(|_| ()),
                NodeKind::File => copy_verify_delete(src, dst, &from, &to, opts, tag, &limits),
            }
        };
        let ev = slog
            .migrate_result()
            .path(from.clone())
            .field("to", json!(to))
            .field("kind", json!(entry.kind));
        match result {
            Ok(()) => {
                ev.field("method", json!(method)).emit_success();
                ok[idx] = true;
                moved.push(MovedEntry {
                    from,
                    to,
                    kind: entry.kind,
                    method,
                });
            }
            Err(e) => {
                let consistency = e.kind == ErrorKind::MigrationConsistency;
                let f = NodeFailure::new(from, e);
                ev.error(f.error_id, &f.error).emit_failure();
                failed.push(f);
                // Both copies exist after a consistency failure; siblings are independent.
                if !consistency && opts.on_error == ErrorPolicy::Abort {
                    stop = true;
                }
            }
        }
    }

    if !dry && root_kind == NodeKind::Directory && root_ok {
        prune_source_dirs(src, &src_base, &entries);
    }

    let duration_ms = t0.elapsed().as_millis() as u64;
    let summary = slog.run_summary().path(src_base.clone()).merge(json!({
        "verb": "migrate",
        "moved": moved.len(),
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
            "migrate {src_base} -> {dst_base}{}: {} moved, {} failed, {} not attempted",
            if dry { " (dry run)" } else { "" },
            moved.len(),
            failed.len(),
            not_attempted.len()
        ),
    );

    Ok(MigrationReport {
        plan_id: pid,
        mode: opts.mode,
        moved,
        failed,
        not_attempted,
        cancelled,
        duration_ms,
    })
}
