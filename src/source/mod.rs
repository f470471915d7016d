//! Source configurations, the second collection a binding is joined with.
//!
//! The controller writes one configuration per source; workers only read
//! them through [`BindingStore::get_source_bound_config`](crate::BindingStore::get_source_bound_config).

mod source_config;

pub use source_config::*;
