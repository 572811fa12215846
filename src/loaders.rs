//! Load a [`TreeSpec`] from a JSON or YAML document on disk.
use std::path::Path;

use crate::types::errors::{Error, ErrorKind, Result};
use crate::types::tree::TreeSpec;

/// Pick the parser by extension: `.json`, or `.yaml`/`.yml`.
///
/// # Errors
///
/// `NotFound` when the file is missing, `InvalidSpec` for an unsupported extension or
/// a malformed document.
pub fn load_tree(path: impl AsRef<Path>) -> Result<TreeSpec> {
    let path = path.as_ref();
    let shown = path.display().to_string();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let parse: fn(&str) -> Result<TreeSpec> = match ext.as_deref() {
        Some("json") => TreeSpec::from_json_str,
        Some("yaml" | "yml") => TreeSpec::from_yaml_str,
        _ => {
            return Err(Error::new(
                ErrorKind::InvalidSpec,
                format!("{shown}: unsupported tree format (expected .json, .yaml or .yml)"),
            )
            .at(shown))
        }
    };
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(&shown, &e))?;
    parse(&text).map_err(|e| Error {
        msg: format!("{shown}: {}", e.msg),
        ..e
    }
    .at(shown))
}
