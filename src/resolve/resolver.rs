use crate::types::errors::{Error, ErrorKind, Result};
use crate::types::node::{NodeKind, ResolvedNode, ResolvedTree};
use crate::types::safepath::{PathStyle, SafePath};
use crate::types::tree::{Entry, TreeSpec};

use super::env::Env;

/// Resolves spec names and base paths for one backend's path convention.
#[derive(Clone, Copy, Debug)]
pub struct PathResolver<'e> {
    env: &'e Env,
    style: PathStyle,
}

impl<'e> PathResolver<'e> {
    #[must_use]
    pub fn new(env: &'e Env, style: PathStyle) -> Self {
        Self { env, style }
    }

    #[must_use]
    pub fn style(&self) -> PathStyle {
        self.style
    }

    /// Expand and validate a single name.
    pub fn resolve(&self, raw_segment: &str) -> Result<String> {
        let seg = self.env.expand(raw_segment)?;
        validate_segment(&seg).map_err(|e| Error {
            msg: format!("`{raw_segment}`: {}", e.msg),
            ..e
        })?;
        Ok(seg)
    }

    /// Expand variables and a leading `~` (from `HOME`), then normalize to the style.
    pub fn resolve_base(&self, raw: &str) -> Result<String> {
        let mut expanded = self.env.expand(raw)?;
        if self.style == PathStyle::Filesystem && (expanded == "~" || expanded.starts_with("~/")) {
            let home = self.env.get("HOME").ok_or_else(|| {
                Error::new(
                    ErrorKind::UnresolvedVariable,
                    format!("`{raw}` needs HOME to expand `~`"),
                )
            })?;
            expanded = format!("{home}{}", &expanded[1..]);
        }
        self.style.normalize_base(&expanded)
    }

    /// Resolve a whole spec below `base`.
    ///
    /// Fails on the first bad name; also fails when two siblings expand to the same name.
    pub fn resolve_tree(&self, base: &str, spec: &TreeSpec) -> Result<ResolvedTree> {
        let base = self.resolve_base(base)?;
        let mut children = Vec::with_capacity(spec.len());
        self.resolve_level(&base, None, spec, &mut children)?;
        Ok(ResolvedTree {
            base,
            style: self.style,
            children,
        })
    }

    fn resolve_level(
        &self,
        base: &str,
        parent: Option<&SafePath>,
        spec: &TreeSpec,
        out: &mut Vec<ResolvedNode>,
    ) -> Result<()> {
        for (raw, entry) in spec.iter() {
            let name = self.resolve(raw)?;
            if out.iter().any(|n| n.name == name) {
                return Err(Error::new(
                    ErrorKind::InvalidSpec,
                    format!("`{raw}` resolves to `{name}`, which a sibling already uses"),
                ));
            }
            let candidate = match parent {
                Some(p) => self.style.join(&p.as_path(), &name),
                None => self.style.join(base, &name),
            };
            // Hard invariant: every resolved path lies strictly below the base.
            let safe = SafePath::from_rooted(base, &candidate, self.style)?;
            let mut node = ResolvedNode {
                name,
                kind: NodeKind::File,
                path: safe.as_path(),
                content: None,
                perms: None,
                children: Vec::new(),
            };
            match entry {
                Entry::Dir(sub) => {
                    node.kind = NodeKind::Directory;
                    node.perms = sub.perms();
                    self.resolve_level(base, Some(&safe), sub, &mut node.children)?;
                }
                Entry::File(content) => {
                    node.content = Some(content.as_bytes().to_vec());
                }
            }
            out.push(node);
        }
        Ok(())
    }
}

/// Strict validation of an expanded name.
pub fn validate_segment(seg: &str) -> Result<()> {
    if seg.is_empty() {
        return Err(Error::new(ErrorKind::InvalidSegment, "empty name"));
    }
    if seg == "." || seg == ".." {
        return Err(Error::new(
            ErrorKind::PathTraversal,
            format!("name `{seg}` is not allowed"),
        ));
    }
    if seg.contains(['/', '\\']) {
        return Err(Error::new(
            ErrorKind::PathTraversal,
            format!("name `{seg}` contains a path separator"),
        ));
    }
    if seg.contains('\0') {
        return Err(Error::new(ErrorKind::InvalidSegment, "name contains NUL"));
    }
    Ok(())
}
