//! Resolved tree nodes and adapter-level outcome types.
use std::ops::Index;

use serde::Serialize;

use super::safepath::PathStyle;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    Directory,
    File,
}

/// What an adapter sees at a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum EntryKind {
    Directory,
    File,
    Absent,
}

impl EntryKind {
    #[must_use]
    pub fn matches(self, kind: NodeKind) -> bool {
        matches!(
            (self, kind),
            (EntryKind::Directory, NodeKind::Directory) | (EntryKind::File, NodeKind::File)
        )
    }
}

/// Successful adapter outcome. Failures travel as `Err(types::Error)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Applied,
    AlreadySatisfied,
}

/// A spec entry with its path computed and validated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedNode {
    pub name: String,
    pub kind: NodeKind,
    pub path: String,
    #[serde(skip)]
    pub content: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perms: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ResolvedNode>,
}

impl ResolvedNode {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ResolvedNode> {
        self.children.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }
}

/// `node["child"]`, mirroring how the input `TreeSpec` is indexed.
///
/// # Panics
///
/// When `self` has no child called `name`. Use [`ResolvedNode::get`] for a fallible lookup.
impl Index<&str> for ResolvedNode {
    type Output = ResolvedNode;

    fn index(&self, name: &str) -> &ResolvedNode {
        match self.get(name) {
            Some(n) => n,
            None => panic!("no child named `{name}` under `{}`", self.path),
        }
    }
}

/// Resolved tree rooted at a base path; mirrors the shape of the `TreeSpec` it came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedTree {
    pub base: String,
    pub style: PathStyle,
    pub children: Vec<ResolvedNode>,
}

impl ResolvedTree {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ResolvedNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Follow a sequence of names from the base.
    #[must_use]
    pub fn lookup(&self, names: &[&str]) -> Option<&ResolvedNode> {
        let (first, rest) = names.split_first()?;
        rest.iter().try_fold(self.get(first)?, |node, n| node.get(n))
    }

    /// Depth-first pre-order, paired with each node's depth (0 for base children).
    #[must_use]
    pub fn pre_order(&self) -> Vec<(usize, &ResolvedNode)> {
        fn go<'a>(nodes: &'a [ResolvedNode], depth: usize, out: &mut Vec<(usize, &'a ResolvedNode)>) {
            for n in nodes {
                out.push((depth, n));
                go(&n.children, depth + 1, out);
            }
        }
        let mut out = Vec::new();
        go(&self.children, 0, &mut out);
        out
    }

    /// Children before parents; siblings in reverse insertion order.
    #[must_use]
    pub fn post_order(&self) -> Vec<&ResolvedNode> {
        fn go<'a>(nodes: &'a [ResolvedNode], out: &mut Vec<&'a ResolvedNode>) {
            for n in nodes.iter().rev() {
                go(&n.children, out);
                out.push(n);
            }
        }
        let mut out = Vec::new();
        go(&self.children, &mut out);
        out
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.pre_order().len()
    }
}

/// `tree["top"]["child"]`.
///
/// # Panics
///
/// When there is no top-level entry called `name`. Use [`ResolvedTree::get`] or
/// [`ResolvedTree::lookup`] to avoid the panic.
impl Index<&str> for ResolvedTree {
    type Output = ResolvedNode;

    fn index(&self, name: &str) -> &ResolvedNode {
        match self.get(name) {
            Some(n) => n,
            None => panic!("no entry named `{name}` under `{}`", self.base),
        }
    }
}
