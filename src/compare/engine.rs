//! Dual-query execution and diff.

use std::sync::Arc;

use tracing::debug;

use super::rows::compare_rows;
use super::schema::compare_schema;
use super::summary::{ComparisonInput, QueryComparison, ResultSetComparisonSummary};
use crate::db::{ParameterCollection, QueryExecutionAdapter, ResultSet};
use crate::error::{ExecutionError, Side};

/// Version of the comparison semantics.
///
/// Version 2 collects every difference within the overlapping range of each
/// positional loop. Version 1 stopped at the first mismatch and is no longer
/// produced.
pub const COMPARATOR_VERSION: u32 = 2;

/// Runs a query pair under the same bindings and diffs what comes back.
#[derive(Clone)]
pub struct QueryComparisonEngine {
    first: Arc<dyn QueryExecutionAdapter>,
    second: Arc<dyn QueryExecutionAdapter>,
    concurrent_sides: bool,
}

impl QueryComparisonEngine {
    /// Creates an engine that runs both queries through one adapter.
    pub fn new(adapter: Arc<dyn QueryExecutionAdapter>) -> Self {
        Self::with_adapters(Arc::clone(&adapter), adapter)
    }

    /// Creates an engine with a separate adapter per side.
    pub fn with_adapters(
        first: Arc<dyn QueryExecutionAdapter>,
        second: Arc<dyn QueryExecutionAdapter>,
    ) -> Self {
        Self {
            first,
            second,
            concurrent_sides: false,
        }
    }

    /// Runs the two queries of each comparison concurrently.
    ///
    /// When one side fails, the other side's execution is dropped before the
    /// error is returned.
    pub fn concurrent_sides(mut self, enabled: bool) -> Self {
        self.concurrent_sides = enabled;
        self
    }

    /// Executes both queries and compares every result set pair.
    pub async fn compare(&self, input: &ComparisonInput) -> Result<QueryComparison, ExecutionError> {
        let parameters = input.parameters();

        let (sets1, sets2) = if self.concurrent_sides {
            tokio::try_join!(
                self.run_side(Side::First, input.query1(), parameters),
                self.run_side(Side::Second, input.query2(), parameters),
            )?
        } else {
            let sets1 = self
                .run_side(Side::First, input.query1(), parameters)
                .await?;
            let sets2 = self
                .run_side(Side::Second, input.query2(), parameters)
                .await?;
            (sets1, sets2)
        };

        let comparison = compare_result_sets(&sets1, &sets2);
        debug!(
            "Compared {} result set pair(s), identical: {}",
            comparison.result_set_comparisons.len(),
            comparison.results_are_identical
        );
        Ok(comparison)
    }

    async fn run_side(
        &self,
        side: Side,
        sql: &str,
        parameters: &ParameterCollection,
    ) -> Result<Vec<ResultSet>, ExecutionError> {
        let adapter = match side {
            Side::First => &self.first,
            Side::Second => &self.second,
        };
        adapter
            .execute(sql, parameters, side)
            .await
            .map_err(|e| ExecutionError::from_adapter(e, side, sql))
    }
}

/// Diffs two ordered result set lists.
///
/// Pairs are compared positionally over the shorter list; a length
/// difference is reported through `result_set_counts_are_not_same`.
pub fn compare_result_sets(sets1: &[ResultSet], sets2: &[ResultSet]) -> QueryComparison {
    let summaries = sets1
        .iter()
        .zip(sets2)
        .map(|(rs1, rs2)| {
            ResultSetComparisonSummary::from_parts(
                compare_schema(rs1.columns(), rs2.columns()),
                compare_rows(rs1.rows(), rs2.rows()),
            )
        })
        .collect();

    QueryComparison::new(summaries, (sets1.len(), sets2.len()))
}
