use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKUP_TAG, DEFAULT_FLATTEN_SEPARATOR, DEFAULT_OP_TIMEOUT_MS, SCAN_IGNORED_EXTENSIONS,
    SCAN_IGNORED_NAMES,
};

/// What to do when a file exists with different content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Leave the file alone and record `ContentConflict`.
    #[default]
    Reject,
    Overwrite,
    /// Move the existing file to a versioned sibling, then write.
    Version,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Stop at the first failure; everything after it is not attempted.
    #[default]
    Abort,
    /// Record failures and keep going with independent siblings.
    ContinueOnError,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Concurrency {
    /// 1 runs sequentially; more runs top-level subtrees on a bounded pool.
    pub workers: usize,
}

impl Default for Concurrency {
    fn default() -> Self {
        Self { workers: 1 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub op_timeout_ms: Option<u64>,
    pub run_timeout_ms: Option<u64>,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            op_timeout_ms: Some(DEFAULT_OP_TIMEOUT_MS),
            run_timeout_ms: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Flatten {
    pub separator: String,
}

impl Default for Flatten {
    fn default() -> Self {
        Self {
            separator: DEFAULT_FLATTEN_SEPARATOR.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Migration {
    /// Compare SHA-256 digests after cross-backend copies, not only sizes.
    pub verify_hash: bool,
}

impl Default for Migration {
    fn default() -> Self {
        Self { verify_hash: true }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Backup {
    pub tag: String,
}

impl Default for Backup {
    fn default() -> Self {
        Self {
            tag: DEFAULT_BACKUP_TAG.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scan {
    pub ignored_names: Vec<String>,
    /// Lowercase, with the leading dot.
    pub ignored_extensions: Vec<String>,
}

impl Default for Scan {
    fn default() -> Self {
        Self {
            ignored_names: SCAN_IGNORED_NAMES.iter().map(|s| (*s).to_string()).collect(),
            ignored_extensions: SCAN_IGNORED_EXTENSIONS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl Scan {
    /// Hidden entries, ignored names and ignored extensions are skipped.
    #[must_use]
    pub fn is_ignored(&self, name: &str) -> bool {
        if name.starts_with('.') || self.ignored_names.iter().any(|n| n == name) {
            return true;
        }
        let lower = name.to_ascii_lowercase();
        self.ignored_extensions.iter().any(|ext| lower.ends_with(ext.as_str()))
    }
}
