use thiserror::Error;

use crate::types::errors::{Error, ErrorKind};

/// Whole-run failures raised before any mutation. Per-node failures never surface here;
/// they are collected into the run's report instead.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unresolved variable: {0}")]
    UnresolvedVariable(Error),
    #[error("path traversal: {0}")]
    PathTraversal(Error),
    #[error("invalid spec: {0}")]
    InvalidSpec(Error),
    #[error("flatten key collision: {0}")]
    FlattenKeyCollision(Error),
    #[error("not found: {0}")]
    NotFound(Error),
    /// The base could not be inspected or is unusable (for example, a file sits there).
    #[error("storage error: {0}")]
    Storage(Error),
}

impl ApiError {
    /// The underlying typed error.
    #[must_use]
    pub fn inner(&self) -> &Error {
        match self {
            ApiError::UnresolvedVariable(e)
            | ApiError::PathTraversal(e)
            | ApiError::InvalidSpec(e)
            | ApiError::FlattenKeyCollision(e)
            | ApiError::NotFound(e)
            | ApiError::Storage(e) => e,
        }
    }

    #[must_use]
    pub fn error_id(&self) -> ErrorId {
        error_id_for(self.inner().kind)
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        exit_code_for(self.error_id())
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e.kind {
            ErrorKind::UnresolvedVariable => ApiError::UnresolvedVariable(e),
            ErrorKind::PathTraversal => ApiError::PathTraversal(e),
            ErrorKind::InvalidSegment | ErrorKind::InvalidSpec => ApiError::InvalidSpec(e),
            ErrorKind::FlattenKeyCollision => ApiError::FlattenKeyCollision(e),
            ErrorKind::NotFound => ApiError::NotFound(e),
            _ => ApiError::Storage(e),
        }
    }
}

// Emitted verbatim in facts and reports.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorId {
    E_UNRESOLVED_VAR,
    E_TRAVERSAL,
    E_COLLISION,
    E_CONFLICT,
    E_IO,
    E_MIGRATION_CONSISTENCY,
    E_FLATTEN_COLLISION,
    E_TIMEOUT,
    E_CANCELLED,
    E_CONFIG,
    E_NOT_FOUND,
    E_GENERIC,
}

#[must_use]
pub const fn error_id_for(kind: ErrorKind) -> ErrorId {
    match kind {
        ErrorKind::UnresolvedVariable => ErrorId::E_UNRESOLVED_VAR,
        ErrorKind::PathTraversal => ErrorId::E_TRAVERSAL,
        ErrorKind::InvalidSegment | ErrorKind::InvalidSpec => ErrorId::E_CONFIG,
        ErrorKind::PathCollision => ErrorId::E_COLLISION,
        ErrorKind::ContentConflict => ErrorId::E_CONFLICT,
        ErrorKind::AdapterIo => ErrorId::E_IO,
        ErrorKind::MigrationConsistency => ErrorId::E_MIGRATION_CONSISTENCY,
        ErrorKind::FlattenKeyCollision => ErrorId::E_FLATTEN_COLLISION,
        ErrorKind::Timeout => ErrorId::E_TIMEOUT,
        ErrorKind::Cancelled => ErrorId::E_CANCELLED,
        ErrorKind::NotFound => ErrorId::E_NOT_FOUND,
    }
}

#[must_use]
pub const fn id_str(id: ErrorId) -> &'static str {
    match id {
        ErrorId::E_UNRESOLVED_VAR => "E_UNRESOLVED_VAR",
        ErrorId::E_TRAVERSAL => "E_TRAVERSAL",
        ErrorId::E_COLLISION => "E_COLLISION",
        ErrorId::E_CONFLICT => "E_CONFLICT",
        ErrorId::E_IO => "E_IO",
        ErrorId::E_MIGRATION_CONSISTENCY => "E_MIGRATION_CONSISTENCY",
        ErrorId::E_FLATTEN_COLLISION => "E_FLATTEN_COLLISION",
        ErrorId::E_TIMEOUT => "E_TIMEOUT",
        ErrorId::E_CANCELLED => "E_CANCELLED",
        ErrorId::E_CONFIG => "E_CONFIG",
        ErrorId::E_NOT_FOUND => "E_NOT_FOUND",
        ErrorId::E_GENERIC => "E_GENERIC",
    }
}

#[must_use]
pub const fn exit_code_for(id: ErrorId) -> i32 {
    match id {
        ErrorId::E_CONFIG => 10,
        ErrorId::E_UNRESOLVED_VAR => 11,
        ErrorId::E_TRAVERSAL => 12,
        ErrorId::E_FLATTEN_COLLISION => 13,
        ErrorId::E_COLLISION => 20,
        ErrorId::E_CONFLICT => 21,
        ErrorId::E_IO => 30,
        ErrorId::E_NOT_FOUND => 31,
        ErrorId::E_TIMEOUT => 40,
        ErrorId::E_CANCELLED => 41,
        ErrorId::E_MIGRATION_CONSISTENCY => 50,
        ErrorId::E_GENERIC => 1,
    }
}

#[must_use]
pub fn exit_code_for_id_str(s: &str) -> Option<i32> {
    const ALL: [ErrorId; 12] = [
        ErrorId::E_UNRESOLVED_VAR,
        ErrorId::E_TRAVERSAL,
        ErrorId::E_COLLISION,
        ErrorId::E_CONFLICT,
        ErrorId::E_IO,
        ErrorId::E_MIGRATION_CONSISTENCY,
        ErrorId::E_FLATTEN_COLLISION,
        ErrorId::E_TIMEOUT,
        ErrorId::E_CANCELLED,
        ErrorId::E_CONFIG,
        ErrorId::E_NOT_FOUND,
        ErrorId::E_GENERIC,
    ];
    ALL.iter().find(|id| id_str(**id) == s).map(|id| exit_code_for(*id))
}
