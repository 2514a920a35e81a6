//! Result set comparison.
//!
//! The engine executes a query pair, then diffs the returned result sets
//! pairwise: column metadata through [`compare_schema`] and row data through
//! [`compare_rows`]. Every positional loop is bounded by the shorter side and
//! count differences are reported as flags.

mod engine;
mod rows;
mod schema;
mod summary;

pub use engine::{compare_result_sets, QueryComparisonEngine, COMPARATOR_VERSION};
pub use rows::compare_rows;
pub use schema::compare_schema;
pub use summary::{
    CellDifference, ColumnDifference, ComparisonInput, QueryComparison,
    ResultSetComparisonSummary, RowComparison, RowDifference, SchemaComparison,
};
