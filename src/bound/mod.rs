//! Source-to-worker bindings: the record, its store operations, the watch,
//! and the join with source configurations.

mod binding_store;
mod bound_config;
mod source_bound;
mod watcher;

pub use binding_store::*;
pub use source_bound::*;
pub use watcher::*;

#[cfg(test)]
mod source_bound_test;
