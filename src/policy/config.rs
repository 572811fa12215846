use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::{Backup, Concurrency, ConflictPolicy, ErrorPolicy, Flatten, Migration, Scan, Timeouts};
use crate::types::errors::{Error, ErrorKind, Result};

/// Engine-wide configuration. Grouped fields mirror the config document layout:
///
/// ```yaml
/// conflict: version
/// errors: continue_on_error
/// concurrency: { workers: 4 }
/// timeouts: { op_timeout_ms: 5000 }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Policy {
    pub conflict: ConflictPolicy,
    pub errors: ErrorPolicy,
    pub concurrency: Concurrency,
    pub timeouts: Timeouts,
    pub flatten: Flatten,
    pub migration: Migration,
    pub backup: Backup,
    pub scan: Scan,
}

fn config_error(e: impl std::fmt::Display) -> Error {
    Error::new(ErrorKind::InvalidSpec, format!("invalid policy: {e}"))
}

impl Policy {
    /// `timeouts.op_timeout_ms` as a duration, ready for an adapter's `with_timeout`.
    #[must_use]
    pub fn op_timeout(&self) -> Option<Duration> {
        self.timeouts.op_timeout_ms.map(Duration::from_millis)
    }

    /// # Errors
    ///
    /// `InvalidSpec` when the document is malformed or names an unknown field.
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str::<Self>(s).map_err(config_error)?.checked()
    }

    /// # Errors
    ///
    /// `InvalidSpec` when the document is malformed or names an unknown field.
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str::<Self>(s).map_err(config_error)?.checked()
    }

    /// Load from a `.json`, `.yaml` or `.yml` file.
    ///
    /// # Errors
    ///
    /// `NotFound` for a missing file, `InvalidSpec` for an unknown extension or bad content.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(&shown, &e))?;
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("json") => Self::from_json_str(&text),
            Some("yaml" | "yml") => Self::from_yaml_str(&text),
            other => Err(Error::new(
                ErrorKind::InvalidSpec,
                format!("unsupported policy format {:?}", other.unwrap_or("")),
            )
            .at(shown)),
        }
    }

    fn checked(self) -> Result<Self> {
        if self.concurrency.workers == 0 {
            return Err(config_error("concurrency.workers must be at least 1"));
        }
        if self.flatten.separator.is_empty() {
            return Err(config_error("flatten.separator must not be empty"));
        }
        if self.backup.tag.is_empty() || self.backup.tag.contains(['/', '\\']) {
            return Err(config_error("backup.tag must be a non-empty name"));
        }
        Ok(self)
    }
}
