//! SQL Scientist - verifies that two SQL queries are behaviorally equivalent.
//!
//! A query pair is run under identical parameter bindings; every result set
//! each side produces is read back and diffed for schema and data
//! differences. An experiment repeats that across many parameter
//! collections on a bounded pool of concurrent comparisons.

pub mod cli;
pub mod compare;
pub mod config;
pub mod db;
pub mod error;
pub mod experiment;
pub mod logging;
pub mod report;

pub use compare::{ComparisonInput, QueryComparison, QueryComparisonEngine};
pub use db::{ParameterCollection, QueryExecutionAdapter, ResultSet, Value};
pub use error::{ExecutionError, Result, ScientistError, Side};
pub use experiment::{compare_once, run_experiment, ExperimentOptions, ExperimentResult};
