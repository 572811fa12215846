//! Error types used across treewright.
use serde::Serialize;
use thiserror::Error;

/// Error categories for resolution, adapters and per-node operations.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ErrorKind {
    /// `$NAME` / `${NAME}` with no value in the environment mapping.
    #[error("unresolved variable")]
    UnresolvedVariable,
    /// A name that would step outside its parent, or a path outside its root.
    #[error("path traversal")]
    PathTraversal,
    /// Empty name, NUL byte, or otherwise unusable segment.
    #[error("invalid segment")]
    InvalidSegment,
    /// A file occupies a directory path or the other way around.
    #[error("path collision")]
    PathCollision,
    /// Existing file content differs and the conflict policy refuses to replace it.
    #[error("content conflict")]
    ContentConflict,
    #[error("adapter io error")]
    AdapterIo,
    /// Copy verified at the destination but the source could not be removed.
    #[error("migration consistency")]
    MigrationConsistency,
    #[error("flatten key collision")]
    FlattenKeyCollision,
    #[error("timeout")]
    Timeout,
    #[error("cancelled")]
    Cancelled,
    #[error("not found")]
    NotFound,
    #[error("invalid spec")]
    InvalidSpec,
}

impl ErrorKind {
    /// Configuration-level kinds abort a whole run before any mutation.
    #[must_use]
    pub const fn is_config(self) -> bool {
        matches!(
            self,
            ErrorKind::UnresolvedVariable
                | ErrorKind::PathTraversal
                | ErrorKind::InvalidSegment
                | ErrorKind::InvalidSpec
                | ErrorKind::FlattenKeyCollision
        )
    }
}

/// Structured error with a kind, the offending path when known, and a human message.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[error("{kind}: {msg}")]
pub struct Error {
    pub kind: ErrorKind,
    pub path: Option<String>,
    pub msg: String,
}

impl Error {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            path: None,
            msg: msg.into(),
        }
    }

    /// Attach the path this error is attributable to.
    #[must_use]
    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn io(path: &str, e: &std::io::Error) -> Self {
        let kind = match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            std::io::ErrorKind::TimedOut => ErrorKind::Timeout,
            _ => ErrorKind::AdapterIo,
        };
        Self::new(kind, format!("{path}: {e}")).at(path)
    }
}

/// Convenient alias for results returning a `types::Error`.
pub type Result<T> = std::result::Result<T, Error>;
