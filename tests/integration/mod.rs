//! Integration tests for the mutable DAG filesystem

pub mod test_utils;

mod files;
mod ops_mv;
mod republisher;
