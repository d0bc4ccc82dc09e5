pub mod actor;
pub mod combat;

pub use actor::*;
pub use combat::*;
