//! Engine configuration.
//!
//! A [`Policy`] groups the knobs every operation consults: conflict handling, error
//! handling, concurrency, timeouts, flatten separator, migration verification, backup
//! naming and the scan filters used when rendering existing trees. Every field has a
//! default, so a config document only names what it changes.

pub mod config;
pub mod types;

pub use config::Policy;
pub use types::{Backup, Concurrency, ConflictPolicy, ErrorPolicy, Flatten, Migration, Scan, Timeouts};
