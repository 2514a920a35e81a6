//! Entry points for comparing query pairs.
//!
//! [`compare_once`] runs a single comparison; [`run_experiment`] repeats it
//! across an ordered list of parameter collections.
//! [`collections_from_query`] derives those collections from a data query.

mod runner;

pub use runner::{
    ExperimentItem, ExperimentOptions, ExperimentResult, ExperimentRunner, ItemOutcome,
    DEFAULT_MAX_CONCURRENCY,
};

use std::sync::Arc;

use crate::compare::{ComparisonInput, QueryComparison, QueryComparisonEngine};
use crate::db::{ParameterCollection, QueryExecutionAdapter};
use crate::error::{Result, ScientistError, Side};
use tracing::info;

/// Compares two queries once under the given bindings.
pub async fn compare_once(
    adapter: Arc<dyn QueryExecutionAdapter>,
    query1: &str,
    query2: &str,
    parameters: ParameterCollection,
) -> Result<QueryComparison> {
    let engine = QueryComparisonEngine::new(adapter);
    let input = ComparisonInput::new(query1, query2, parameters);
    Ok(engine.compare(&input).await?)
}

/// Compares two queries once per parameter collection.
pub async fn run_experiment(
    adapter: Arc<dyn QueryExecutionAdapter>,
    query1: &str,
    query2: &str,
    collections: &[ParameterCollection],
    options: ExperimentOptions,
) -> Result<ExperimentResult> {
    let engine = QueryComparisonEngine::new(adapter).concurrent_sides(options.concurrent_sides);
    ExperimentRunner::new(engine, options)
        .run(query1, query2, collections)
        .await
}

/// Runs a data query and turns each row of its first result set into a
/// parameter collection, keyed by column name.
///
/// Query failures are reported as parameter errors; connection failures
/// pass through unchanged.
pub async fn collections_from_query(
    adapter: &dyn QueryExecutionAdapter,
    data_query: &str,
) -> Result<Vec<ParameterCollection>> {
    let sets = adapter
        .execute(data_query, &ParameterCollection::empty(), Side::First)
        .await
        .map_err(|e| match e {
            ScientistError::Query(msg) => {
                ScientistError::parameters(format!("Parameters query failed: {msg}"))
            }
            other => other,
        })?;

    let Some(set) = sets.first() else {
        return Err(ScientistError::parameters(
            "Parameters query returned no result set",
        ));
    };
    if set.rows().is_empty() {
        return Err(ScientistError::parameters("Parameters query returned no rows"));
    }

    let collections = set
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            ParameterCollection::from_row(set.columns(), row).map_err(|e| {
                ScientistError::parameters(format!("Parameter collection {i}: {e}"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    info!("Parameters query produced {} collections", collections.len());
    Ok(collections)
}
