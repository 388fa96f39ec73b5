pub(crate) mod effects;
pub(crate) mod git;
pub(crate) mod run;

mod facade;

pub use facade::*;
