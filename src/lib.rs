#![forbid(unsafe_code)]
//! Treewright: declarative folder trees across storage backends.
//!
//! A [`TreeSpec`] (an ordered mapping of names to subtrees or file contents) is resolved
//! against a base path and materialized, validated, flattened, summarized, migrated or
//! torn down through a [`StorageAdapter`](adapters::StorageAdapter).
//!
//! Safety model highlights:
//! - Names are expanded from an explicit environment mapping and strictly validated; a
//!   name that would escape its parent fails resolution before any storage call.
//! - Every mutating run plans first. Collisions are found with `exists` calls alone.
//! - Local writes are staged and renamed into place through directory handles
//!   (`rustix`), so readers never see partial files.
//! - Deletes are refused at or above the base and any adapter root boundary.

pub mod adapters;
pub mod api;
pub mod constants;
pub mod fs;
pub mod loaders;
pub mod logging;
pub mod policy;
pub mod resolve;
pub mod types;

pub use api::errors::{ApiError, ErrorId};
pub use api::options::{CancelToken, CreateOptions, MigrateOptions};
pub use api::*;
pub use loaders::load_tree;
pub use resolve::Env;
pub use types::tree::{Entry, FileContent, TreeSpec};
