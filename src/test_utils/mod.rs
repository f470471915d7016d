//! Fixtures shared by the unit test modules
mod common;

pub(crate) use common::*;
