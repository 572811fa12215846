use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::policy::{ConflictPolicy, ErrorPolicy, Policy};
use crate::types::plan::ApplyMode;

/// Caller-held abort switch. Clones share one flag; the engine checks it between
/// operations, never in the middle of one.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options for `create_tree`.
#[derive(Clone, Debug)]
pub struct CreateOptions {
    pub mode: ApplyMode,
    pub conflict: ConflictPolicy,
    pub on_error: ErrorPolicy,
    pub cancel: Option<CancelToken>,
}

impl CreateOptions {
    /// Commit mode with the policy's conflict and error handling.
    #[must_use]
    pub fn from_policy(policy: &Policy) -> Self {
        Self {
            mode: ApplyMode::Commit,
            conflict: policy.conflict,
            on_error: policy.errors,
            cancel: None,
        }
    }

    #[must_use]
    pub fn dry_run(mut self) -> Self {
        self.mode = ApplyMode::DryRun;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: ApplyMode) -> Self {
        self.mode = mode;
        self
    }

    /// `true` replaces differing files; `false` rejects them.
    #[must_use]
    pub fn overwrite(mut self, yes: bool) -> Self {
        self.conflict = if yes {
            ConflictPolicy::Overwrite
        } else {
            ConflictPolicy::Reject
        };
        self
    }

    #[must_use]
    pub fn with_conflict(mut self, conflict: ConflictPolicy) -> Self {
        self.conflict = conflict;
        self
    }

    #[must_use]
    pub fn continue_on_error(mut self, yes: bool) -> Self {
        self.on_error = if yes {
            ErrorPolicy::ContinueOnError
        } else {
            ErrorPolicy::Abort
        };
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self::from_policy(&Policy::default())
    }
}

/// Options for `migrate`.
#[derive(Clone, Debug)]
pub struct MigrateOptions {
    pub mode: ApplyMode,
    /// Applies when a destination file already exists with different content.
    pub conflict: ConflictPolicy,
    pub on_error: ErrorPolicy,
    pub verify_hash: bool,
    pub cancel: Option<CancelToken>,
}

impl MigrateOptions {
    #[must_use]
    pub fn from_policy(policy: &Policy) -> Self {
        Self {
            mode: ApplyMode::Commit,
            conflict: policy.conflict,
            on_error: policy.errors,
            verify_hash: policy.migration.verify_hash,
            cancel: None,
        }
    }

    #[must_use]
    pub fn dry_run(mut self) -> Self {
        self.mode = ApplyMode::DryRun;
        self
    }

    #[must_use]
    pub fn with_conflict(mut self, conflict: ConflictPolicy) -> Self {
        self.conflict = conflict;
        self
    }

    #[must_use]
    pub fn continue_on_error(mut self, yes: bool) -> Self {
        self.on_error = if yes {
            ErrorPolicy::ContinueOnError
        } else {
            ErrorPolicy::Abort
        };
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self::from_policy(&Policy::default())
    }
}
