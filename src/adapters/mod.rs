//! Storage adapters: the only code that touches real storage.
//!
//! Every backend implements [`StorageAdapter`]. New backends are added by implementing the
//! trait, not by extending an existing adapter.
pub mod local;
pub mod object;

pub use local::LocalAdapter;
pub use object::{ClientOp, GcsAdapter, MemoryObjectClient, ObjectClient, ObjectMeta, ObjectStoreAdapter, S3Adapter};
#[cfg(feature = "object-store")]
pub use object::ObjectStoreClient;

use serde::Serialize;

use crate::types::errors::{Error, ErrorKind, Result};
use crate::types::node::{EntryKind, Outcome};
use crate::types::safepath::PathStyle;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Backend {
    Local,
    S3,
    Gcs,
}

impl Backend {
    #[must_use]
    pub const fn path_style(self) -> PathStyle {
        match self {
            Backend::Local => PathStyle::Filesystem,
            Backend::S3 | Backend::Gcs => PathStyle::ObjectKey,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Backend::Local => "local",
            Backend::S3 => "s3",
            Backend::Gcs => "gcs",
        }
    }
}

/// Capability set every backend implements.
///
/// All calls are synchronous. `Ok(Outcome::AlreadySatisfied)` is the idempotent no-op;
/// failures are typed `Err`s carrying the offending path.
pub trait StorageAdapter: Send + Sync {
    fn backend(&self) -> Backend;

    /// Identity of the storage namespace. Two adapters with equal ids can rename between
    /// each other's paths.
    fn instance_id(&self) -> String;

    fn path_style(&self) -> PathStyle {
        self.backend().path_style()
    }

    /// Paths equal to or above this boundary are never deleted.
    fn root_boundary(&self) -> Option<&str> {
        None
    }

    fn exists(&self, path: &str) -> Result<EntryKind>;

    /// Succeeds when the directory already exists; `PathCollision` when a file is there.
    /// The parent must already exist.
    fn create_directory(&self, path: &str) -> Result<Outcome>;

    /// Byte-identical existing content is `AlreadySatisfied` regardless of `overwrite`.
    /// Differing content with `overwrite = false` is `ContentConflict`, with nothing written.
    fn write_file(&self, path: &str, content: &[u8], overwrite: bool) -> Result<Outcome>;

    fn read_file(&self, path: &str) -> Result<Vec<u8>>;

    fn file_size(&self, path: &str) -> Result<u64>;

    /// Move within this adapter instance, atomically where the backend can.
    fn move_or_copy(&self, src: &str, dst: &str) -> Result<Outcome>;

    /// Delete a file or a directory with all descendants. Absent paths are
    /// `AlreadySatisfied`; paths at or above the root boundary are refused.
    fn delete_recursive(&self, path: &str) -> Result<Outcome>;

    /// Immediate child names, sorted.
    fn list_children(&self, path: &str) -> Result<Vec<String>>;

    /// Apply a permission mode. Backends without permissions report `AlreadySatisfied`.
    fn set_permissions(&self, path: &str, mode: u32) -> Result<Outcome> {
        let _ = (path, mode);
        Ok(Outcome::AlreadySatisfied)
    }
}

/// Refuse deletes at or above `boundary`, and of anything that is obviously a root.
pub(crate) fn check_delete_boundary(style: PathStyle, boundary: Option<&str>, path: &str) -> Result<()> {
    let is_root = match style {
        PathStyle::Filesystem => path.is_empty() || path == "." || path == "/" || path.ends_with(":\\"),
        PathStyle::ObjectKey => path.is_empty(),
    };
    if is_root {
        return Err(Error::new(ErrorKind::PathTraversal, format!("refusing to delete root `{path}`")).at(path));
    }
    if let Some(b) = boundary {
        if !style.is_strict_descendant(b, path) {
            return Err(Error::new(
                ErrorKind::PathTraversal,
                format!("`{path}` is not strictly below root boundary `{b}`"),
            )
            .at(path));
        }
    }
    Ok(())
}
