//! Shared crate-wide constants for treewright.
//!
//! Centralizes magic values and default labels used across modules.

/// Keys starting with this prefix are metadata, not tree nodes.
pub const METADATA_PREFIX: &str = "_";

/// Metadata key carrying a directory permission mode.
pub const PERMS_KEY: &str = "_perms";

/// A file value equal to this literal means "create an empty file".
pub const EMPTY_FILE_MARKER: &str = "file";

/// Default separator used to join ancestor names into flattened keys.
pub const DEFAULT_FLATTEN_SEPARATOR: &str = "_";

/// Default tag used when naming versioned copies of conflicting files.
/// Example: `.<name>.<tag>.<millis>.bak`.
pub const DEFAULT_BACKUP_TAG: &str = "treewright";

/// Temporary filename suffix for atomic local writes staged within a directory.
/// The temporary name is `.{fname}.{pid}.{ctr}{TMP_SUFFIX}`.
pub const TMP_SUFFIX: &str = ".treewright.tmp";

/// Object-store "directory" marker: a zero-byte object whose key ends with this suffix.
pub const DIR_MARKER_SUFFIX: &str = "/";

/// Default per-call timeout (`Policy::op_timeout`). Adapters built `with_timeout`
/// enforce it; the engine only warns about calls that take longer.
pub const DEFAULT_OP_TIMEOUT_MS: u64 = 30_000;

/// Object that stands in for a directory marker in stores whose paths cannot end in
/// `/` (the `object_store` client). Key `a/b/` is stored as `a/b/.treewright-dir`.
pub const STORE_DIR_MARKER: &str = ".treewright-dir";

/// UUIDv5 namespace tag for deterministic plan/op IDs.
pub const NS_TAG: &str = "https://treewright.dev/plan";

/// Subsystem label on every emitted fact.
pub const SUBSYSTEM: &str = "treewright";

/// Entries skipped when rendering an existing tree.
pub const SCAN_IGNORED_NAMES: &[&str] = &[
    "__pycache__",
    "node_modules",
    "venv",
    ".git",
    ".idea",
    ".vscode",
    "build",
    "dist",
    "target",
    "bin",
    "obj",
];

/// Extensions (lowercase, with dot) skipped when rendering an existing tree.
pub const SCAN_IGNORED_EXTENSIONS: &[&str] = &[".pyc", ".pyo", ".pyd", ".ds_store"];

/// Largest object S3 copies server-side in one request (5 GiB).
pub const S3_MAX_COPY_BYTES: u64 = 5 * 1024 * 1024 * 1024;

/// Keys per S3 DeleteObjects request.
pub const S3_DELETE_BATCH: usize = 1000;

/// Maximum object key length in bytes, both providers.
pub const MAX_OBJECT_KEY_BYTES: usize = 1024;
