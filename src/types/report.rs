use std::collections::BTreeSet;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Serialize as DeriveSerialize;
use uuid::Uuid;

use super::errors::Error;
use super::node::{EntryKind, NodeKind, ResolvedTree};
use super::plan::{ApplyMode, OperationPlan, PlannedAction};

/// A failure attributable to one path.
#[derive(Clone, Debug, DeriveSerialize)]
pub struct NodeFailure {
    pub path: String,
    pub error_id: &'static str,
    pub error: Error,
}

impl NodeFailure {
    #[must_use]
    pub fn new(path: impl Into<String>, error: Error) -> Self {
        let error_id = crate::api::errors::id_str(crate::api::errors::error_id_for(error.kind));
        Self {
            path: path.into(),
            error_id,
            error,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, DeriveSerialize)]
pub enum OpOutcome {
    Applied,
    AlreadySatisfied,
    /// Dry run: inspected, not executed.
    Planned,
    Failed,
    NotAttempted,
}

#[derive(Clone, Debug, DeriveSerialize)]
pub struct OpRecord {
    pub path: String,
    pub action: PlannedAction,
    pub outcome: OpOutcome,
}

/// Result of `create_tree`: the resolved tree plus what happened to every planned op.
#[derive(Clone, Debug, DeriveSerialize)]
pub struct CreateReport {
    pub plan_id: Uuid,
    pub mode: ApplyMode,
    pub tree: ResolvedTree,
    pub plan: OperationPlan,
    pub records: Vec<OpRecord>,
    pub completed: Vec<String>,
    pub failed: Vec<NodeFailure>,
    pub not_attempted: Vec<String>,
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl CreateReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.not_attempted.is_empty() && !self.cancelled
    }

    #[must_use]
    pub fn count(&self, outcome: OpOutcome) -> usize {
        self.records.iter().filter(|r| r.outcome == outcome).count()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, DeriveSerialize)]
pub enum MoveMethod {
    /// Same backend instance; atomic rename.
    Rename,
    /// Cross-backend; copied, verified, then source deleted.
    CopyVerifyDelete,
    /// Dry run.
    Planned,
}

#[derive(Clone, Debug, DeriveSerialize)]
pub struct MovedEntry {
    pub from: String,
    pub to: String,
    pub kind: NodeKind,
    pub method: MoveMethod,
}

#[derive(Clone, Debug, DeriveSerialize)]
pub struct MigrationReport {
    pub plan_id: Uuid,
    pub mode: ApplyMode,
    pub moved: Vec<MovedEntry>,
    pub failed: Vec<NodeFailure>,
    pub not_attempted: Vec<String>,
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl MigrationReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.not_attempted.is_empty() && !self.cancelled
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveSerialize)]
pub struct TypeMismatch {
    pub path: String,
    pub expected: NodeKind,
    pub found: EntryKind,
}

#[derive(Clone, Debug, Default, DeriveSerialize)]
pub struct ValidationReport {
    pub present: BTreeSet<String>,
    pub missing: BTreeSet<String>,
    /// Present, but as the wrong kind. Never also listed in `missing`.
    pub mismatched: Vec<TypeMismatch>,
    /// Children storage reports that the `TreeSpec` does not declare.
    pub extra: BTreeSet<String>,
    pub failed: Vec<NodeFailure>,
}

impl ValidationReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.mismatched.is_empty() && self.failed.is_empty()
    }

    /// Complete and free of drift.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.is_complete() && self.extra.is_empty()
    }
}

#[derive(Clone, Debug, DeriveSerialize)]
pub enum CleanupReport {
    Deleted {
        deleted: Vec<String>,
        /// Undeclared entries found inside declared directories, left in place.
        kept: Vec<String>,
        failed: Vec<NodeFailure>,
    },
    WouldDelete(Vec<String>),
}

/// Flattened `key -> path` mapping in depth-first order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathMap {
    entries: Vec<(String, String)>,
}

impl PathMap {
    pub(crate) fn push(&mut self, key: String, path: String) {
        self.entries.push((key, path));
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, p)| p.as_str())
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, p)| (k.as_str(), p.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for PathMap {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut m = s.serialize_map(Some(self.entries.len()))?;
        for (k, p) in &self.entries {
            m.serialize_entry(k, p)?;
        }
        m.end()
    }
}
