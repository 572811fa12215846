pub mod errors;
pub mod ids;
pub mod node;
pub mod plan;
pub mod report;
pub mod safepath;
pub mod tree;

pub use errors::*;
pub use ids::*;
pub use node::*;
pub use plan::*;
pub use report::*;
pub use safepath::*;
pub use tree::*;
