//! Local filesystem mechanisms: atomic writes/renames, metadata checks and hashing.
//! Emits no facts; pure mechanism used by the local adapter and the engine.
pub mod atomic;
pub mod backup;
pub mod meta;

pub use atomic::{atomic_write, rename};
pub use backup::versioned_name;
pub use meta::{kind_of, sha256_hex, sha256_hex_of};
