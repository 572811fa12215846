//! Naming for versioned copies kept when a conflicting file is replaced.
use std::time::{SystemTime, UNIX_EPOCH};

/// Hidden sibling name for a versioned copy: `.<name>.<tag>.<millis>.bak`.
#[must_use]
pub fn versioned_name(name: &str, tag: &str) -> String {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!(".{name}.{tag}.{ts}.bak")
}
