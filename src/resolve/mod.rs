//! Path resolution: environment expansion, segment validation and tree resolution.
//!
//! Names are expanded from an explicit [`Env`] mapping, then validated. A name that
//! expands to `.`, `..`, or anything containing a separator is rejected; structure comes
//! only from nesting.

pub mod env;
pub mod resolver;

pub use env::Env;
pub use resolver::PathResolver;
