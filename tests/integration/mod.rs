//! End-to-end comparison tests against real databases.

pub mod config_test;
pub mod experiment_test;
pub mod sqlite_compare_test;
