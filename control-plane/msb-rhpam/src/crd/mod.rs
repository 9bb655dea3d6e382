pub mod rhpam;

pub use rhpam::*;
