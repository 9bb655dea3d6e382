pub mod catalog;
pub mod identity;
pub mod instance;
pub mod operation;

pub use catalog::*;
pub use identity::*;
pub use instance::*;
pub use operation::*;
