//! Comparison inputs and outputs.

use serde::Serialize;

use crate::db::ParameterCollection;

/// A query pair plus the bindings applied identically to both.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonInput {
    query1: String,
    query2: String,
    parameters: ParameterCollection,
}

impl ComparisonInput {
    pub fn new(
        query1: impl Into<String>,
        query2: impl Into<String>,
        parameters: ParameterCollection,
    ) -> Self {
        Self {
            query1: query1.into(),
            query2: query2.into(),
            parameters,
        }
    }

    pub fn query1(&self) -> &str {
        &self.query1
    }

    pub fn query2(&self) -> &str {
        &self.query2
    }

    pub fn parameters(&self) -> &ParameterCollection {
        &self.parameters
    }
}

/// Differences found between two columns at the same position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnDifference {
    pub index: usize,
    pub name_is_different: bool,
    pub type_is_different: bool,
    pub nullability_is_different: bool,
    pub size_is_different: bool,
}

/// A mismatching cell within a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellDifference {
    pub column_index: usize,
}

/// All mismatching cells of one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowDifference {
    pub row_index: usize,
    pub cells: Vec<CellDifference>,
}

/// Outcome of comparing the columns of two result sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaComparison {
    pub columns_are_same: bool,
    pub column_count_mismatch: bool,
    pub column_differences: Vec<ColumnDifference>,
}

/// Outcome of comparing the rows of two result sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowComparison {
    pub row_count_mismatch: bool,
    pub data_differences: Vec<RowDifference>,
}

/// Comparison of one pair of result sets at the same batch position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultSetComparisonSummary {
    pub results_are_identical: bool,
    pub columns_are_same: bool,
    pub column_count_mismatch: bool,
    pub row_count_mismatch: bool,
    pub column_differences: Vec<ColumnDifference>,
    pub data_differences: Vec<RowDifference>,
}

impl ResultSetComparisonSummary {
    /// Combines the schema and row comparisons of one result set pair.
    pub fn from_parts(schema: SchemaComparison, rows: RowComparison) -> Self {
        let results_are_identical = schema.columns_are_same
            && !schema.column_count_mismatch
            && !rows.row_count_mismatch
            && rows.data_differences.is_empty();

        Self {
            results_are_identical,
            columns_are_same: schema.columns_are_same,
            column_count_mismatch: schema.column_count_mismatch,
            row_count_mismatch: rows.row_count_mismatch,
            column_differences: schema.column_differences,
            data_differences: rows.data_differences,
        }
    }

    /// Total number of mismatching cells.
    pub fn cell_difference_count(&self) -> usize {
        self.data_differences.iter().map(|r| r.cells.len()).sum()
    }
}

/// Comparison of every result set produced by a query pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryComparison {
    pub result_set_comparisons: Vec<ResultSetComparisonSummary>,
    pub results_are_identical: bool,
    pub result_set_counts_are_not_same: bool,
    /// Number of result sets each side produced.
    pub result_set_counts: (usize, usize),
}

impl QueryComparison {
    /// Aggregates per-result-set summaries.
    pub fn new(summaries: Vec<ResultSetComparisonSummary>, counts: (usize, usize)) -> Self {
        let result_set_counts_are_not_same = counts.0 != counts.1;
        let results_are_identical = !result_set_counts_are_not_same
            && summaries.iter().all(|s| s.results_are_identical);

        Self {
            result_set_comparisons: summaries,
            results_are_identical,
            result_set_counts_are_not_same,
            result_set_counts: counts,
        }
    }
}
