//! Filesystem metadata helpers: node classification and content hashing.
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::types::node::EntryKind;

/// SHA-256 of a byte slice, lowercase hex.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Compute SHA-256 of a file at `path`, returning a lowercase hex string.
pub fn sha256_hex_of(path: &Path) -> Option<String> {
    let mut f = std::fs::File::open(path).ok()?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut f, &mut hasher).ok()?;
    Some(hex::encode(hasher.finalize()))
}

/// Classify the node at `path`, following symlinks.
///
/// # Errors
///
/// Returns the IO error for anything other than "does not exist".
pub fn kind_of(path: &Path) -> std::io::Result<EntryKind> {
    match std::fs::metadata(path) {
        Ok(md) if md.is_dir() => Ok(EntryKind::Directory),
        Ok(_) => Ok(EntryKind::File),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(EntryKind::Absent),
        Err(e) if super::atomic::is_not_a_directory(&e) => Ok(EntryKind::Absent),
        Err(e) => Err(e),
    }
}
