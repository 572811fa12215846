//! Projections: flattened path maps and textual trees.
use crate::adapters::StorageAdapter;
use crate::policy::Scan;
use crate::types::errors::{Error, ErrorKind, Result};
use crate::types::node::{EntryKind, ResolvedNode, ResolvedTree};
use crate::types::report::PathMap;
use crate::types::safepath::PathStyle;
use crate::types::tree::{Entry, TreeSpec};

/// Depth-first `key -> path` map; keys join ancestor names with `separator`.
///
/// # Errors
///
/// `FlattenKeyCollision` when two distinct nodes produce the same key.
pub fn flatten_tree(tree: &ResolvedTree, separator: &str) -> Result<PathMap> {
    fn go(nodes: &[ResolvedNode], prefix: &str, sep: &str, out: &mut PathMap) -> Result<()> {
        for n in nodes {
            let key = if prefix.is_empty() {
                n.name.clone()
            } else {
                format!("{prefix}{sep}{}", n.name)
            };
            if let Some(existing) = out.get(&key) {
                return Err(Error::new(
                    ErrorKind::FlattenKeyCollision,
                    format!("`{key}` names both {existing} and {}", n.path),
                )
                .at(n.path.clone()));
            }
            out.push(key.clone(), n.path.clone());
            go(&n.children, &key, sep, out)?;
        }
        Ok(())
    }
    let mut out = PathMap::default();
    go(&tree.children, "", separator, &mut out)?;
    Ok(out)
}

/// Indented outline in insertion order: two spaces per level, directories end in `/`.
#[must_use]
pub fn summarize_spec(spec: &TreeSpec) -> String {
    fn go(spec: &TreeSpec, depth: usize, lines: &mut Vec<String>) {
        for (name, entry) in spec.iter() {
            let indent = "  ".repeat(depth);
            match entry {
                Entry::Dir(sub) => {
                    lines.push(format!("{indent}{name}/"));
                    go(sub, depth + 1, lines);
                }
                Entry::File(_) => lines.push(format!("{indent}{name}")),
            }
        }
    }
    let mut lines = Vec::new();
    go(spec, 0, &mut lines);
    lines.join("\n")
}

fn last_segment(path: &str) -> &str {
    path.trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(path)
}

/// Render what exists at `path` with box-drawing connectors.
///
/// Children are sorted case-insensitively and filtered through `scan`; `depth_limit`
/// caps how many levels below `path` are shown.
pub fn summarize_existing(
    adapter: &dyn StorageAdapter,
    path: &str,
    depth_limit: Option<usize>,
    scan: &Scan,
) -> String {
    match adapter.exists(path) {
        Ok(EntryKind::Directory) => {}
        Ok(EntryKind::File) => return last_segment(path).to_string(),
        Ok(EntryKind::Absent) | Err(_) => return format!("Path not found: {path}"),
    }
    let style = adapter.path_style();

    #[allow(clippy::too_many_arguments)]
    fn walk(
        adapter: &dyn StorageAdapter,
        style: PathStyle,
        dir: &str,
        prefix: &str,
        depth: usize,
        depth_limit: Option<usize>,
        scan: &Scan,
        out: &mut String,
    ) {
        if depth_limit.is_some_and(|l| depth >= l) {
            return;
        }
        let mut names = match adapter.list_children(dir) {
            Ok(n) => n,
            Err(_) => {
                out.push_str(&format!("{prefix}└── [Access Denied]\n"));
                return;
            }
        };
        names.retain(|n| !scan.is_ignored(n));
        names.sort_by_key(|n| n.to_lowercase());
        let count = names.len();
        for (i, name) in names.iter().enumerate() {
            let last = i + 1 == count;
            let child = style.join(dir, name);
            let is_dir = matches!(adapter.exists(&child), Ok(EntryKind::Directory));
            let connector = if last { "└── " } else { "├── " };
            out.push_str(&format!("{prefix}{connector}{name}{}\n", if is_dir { "/" } else { "" }));
            if is_dir {
                let ext = if last { "    " } else { "│   " };
                walk(adapter, style, &child, &format!("{prefix}{ext}"), depth + 1, depth_limit, scan, out);
            }
        }
    }

    let name = last_segment(path);
    let mut out = format!("{}/\n", if name.is_empty() { path } else { name });
    walk(adapter, style, path, "", 0, depth_limit, scan, &mut out);
    out
}
