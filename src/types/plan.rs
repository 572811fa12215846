use serde::Serialize;

use super::errors::Error;
use super::node::NodeKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ApplyMode {
    DryRun,
    Commit,
}

impl ApplyMode {
    #[must_use]
    pub fn is_dry_run(self) -> bool {
        matches!(self, ApplyMode::DryRun)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PlannedAction {
    CreateDir,
    WriteFile,
    Skip,
}

/// One planned step, in the order it will run.
#[derive(Clone, Debug, Serialize)]
pub struct PlannedOp {
    pub path: String,
    /// Relative key (segments joined with `/`), empty for the base directory.
    pub rel: String,
    pub kind: NodeKind,
    pub action: PlannedAction,
    pub reason: String,
    /// Index of the directory op this one depends on.
    pub parent: Option<usize>,
    #[serde(skip)]
    pub content: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perms: Option<u32>,
}

/// A mismatch between the `TreeSpec` and what storage holds, found while planning.
#[derive(Clone, Debug, Serialize)]
pub struct PlannedCollision {
    pub op: usize,
    pub error: Error,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct OperationPlan {
    pub base: String,
    pub ops: Vec<PlannedOp>,
    pub collisions: Vec<PlannedCollision>,
}

impl OperationPlan {
    /// Index of the top-level subtree an op belongs to; `None` for the base op.
    #[must_use]
    pub fn subtree_of(&self, mut idx: usize) -> Option<usize> {
        loop {
            match self.ops.get(idx)?.parent {
                Some(0) => return Some(idx),
                Some(p) => idx = p,
                None => return None,
            }
        }
    }

    #[must_use]
    pub fn is_collided(&self, idx: usize) -> bool {
        self.collisions.iter().any(|c| c.op == idx)
    }
}
