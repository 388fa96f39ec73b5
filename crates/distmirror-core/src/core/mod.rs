//! Internal implementation modules for `distmirror-core`.
//!
//! Callers should go through the re-exports at the crate root.

pub mod config;
pub mod runtime;
pub mod sources;
pub mod store;
pub mod tooling;

#[cfg(test)]
pub(crate) mod test_support;
