//! Experiment runner.
//!
//! Runs the same query pair once per parameter collection on a bounded pool
//! of concurrent comparisons. Results land in a slot indexed by the
//! collection's input position, so completion order never affects the
//! output order.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::compare::{ComparisonInput, QueryComparison, QueryComparisonEngine};
use crate::db::ParameterCollection;
use crate::error::{ExecutionError, Result};

/// Default number of comparisons in flight at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Options controlling an experiment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentOptions {
    /// Stop dispatching and cancel in-flight work after the first
    /// non-identical comparison.
    pub stop_on_first_mismatch: bool,
    /// Upper bound on concurrent comparisons. Zero is treated as one.
    pub max_concurrency: usize,
    /// Run the two queries of each comparison concurrently.
    pub concurrent_sides: bool,
}

impl Default for ExperimentOptions {
    fn default() -> Self {
        Self {
            stop_on_first_mismatch: false,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            concurrent_sides: false,
        }
    }
}

impl ExperimentOptions {
    /// Options for a fully sequential run.
    pub fn sequential() -> Self {
        Self {
            max_concurrency: 1,
            ..Self::default()
        }
    }
}

/// What happened to one parameter collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "result", rename_all = "lowercase")]
pub enum ItemOutcome {
    /// Both queries ran and were compared.
    Compared(QueryComparison),
    /// One side failed; siblings are unaffected.
    Failed(ExecutionError),
}

/// Outcome for the parameter collection at `collection_index`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentItem {
    pub collection_index: usize,
    pub outcome: ItemOutcome,
}

impl ExperimentItem {
    pub fn comparison(&self) -> Option<&QueryComparison> {
        match &self.outcome {
            ItemOutcome::Compared(comparison) => Some(comparison),
            ItemOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ExecutionError> {
        match &self.outcome {
            ItemOutcome::Compared(_) => None,
            ItemOutcome::Failed(error) => Some(error),
        }
    }

    pub fn is_identical(&self) -> bool {
        self.comparison().is_some_and(|c| c.results_are_identical)
    }
}

/// Result of an experiment run, in input order.
///
/// Without an early stop there is exactly one item per parameter collection.
/// After an early stop, collections that had not completed are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExperimentResult {
    pub items: Vec<ExperimentItem>,
    pub stopped_early: bool,
}

impl ExperimentResult {
    /// True when every item was compared and found identical.
    pub fn all_identical(&self) -> bool {
        !self.stopped_early && self.items.iter().all(ExperimentItem::is_identical)
    }

    /// Successful comparisons with their collection index.
    pub fn comparisons(&self) -> impl Iterator<Item = (usize, &QueryComparison)> {
        self.items
            .iter()
            .filter_map(|item| item.comparison().map(|c| (item.collection_index, c)))
    }

    /// Per-item failures.
    pub fn failures(&self) -> impl Iterator<Item = &ExecutionError> {
        self.items.iter().filter_map(ExperimentItem::failure)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Runs a query pair across many parameter collections.
#[derive(Clone)]
pub struct ExperimentRunner {
    engine: QueryComparisonEngine,
    options: ExperimentOptions,
}

impl ExperimentRunner {
    pub fn new(engine: QueryComparisonEngine, options: ExperimentOptions) -> Self {
        Self { engine, options }
    }

    pub fn options(&self) -> &ExperimentOptions {
        &self.options
    }

    /// Compares `query1` against `query2` once per parameter collection.
    ///
    /// A per-collection query failure is recorded as a failed item. A
    /// connection-class failure cancels everything in flight and is returned
    /// as the error of the whole run.
    pub async fn run(
        &self,
        query1: &str,
        query2: &str,
        collections: &[ParameterCollection],
    ) -> Result<ExperimentResult> {
        let concurrency = self.options.max_concurrency.max(1);
        info!(
            "Starting experiment: {} collection(s), concurrency {}",
            collections.len(),
            concurrency
        );

        let cancel = CancellationToken::new();
        let engine = &self.engine;

        let mut slots: Vec<Option<ItemOutcome>> = (0..collections.len()).map(|_| None).collect();
        let mut fatal: Option<ExecutionError> = None;

        let mut outcomes = stream::iter(collections.iter().enumerate())
            .map(|(index, parameters)| {
                let cancel = cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        return (index, None);
                    }
                    let input = ComparisonInput::new(query1, query2, parameters.clone());
                    tokio::select! {
                        biased;

                        _ = cancel.cancelled() => (index, None),
                        result = engine.compare(&input) => (index, Some(result)),
                    }
                }
            })
            .buffer_unordered(concurrency);

        while let Some((index, outcome)) = outcomes.next().await {
            match outcome {
                None => debug!("Collection {} cancelled", index),
                Some(Ok(comparison)) => {
                    debug!(
                        "Collection {} compared, identical: {}",
                        index, comparison.results_are_identical
                    );
                    if !comparison.results_are_identical
                        && self.options.stop_on_first_mismatch
                        && !cancel.is_cancelled()
                    {
                        warn!("Mismatch in collection {}, stopping experiment", index);
                        cancel.cancel();
                    }
                    slots[index] = Some(ItemOutcome::Compared(comparison));
                }
                Some(Err(error)) if error.is_fatal() => {
                    cancel.cancel();
                    fatal = Some(error.in_collection(index));
                    break;
                }
                Some(Err(error)) => {
                    debug!("Collection {} failed: {}", index, error);
                    slots[index] = Some(ItemOutcome::Failed(error.in_collection(index)));
                }
            }
        }
        drop(outcomes);

        if let Some(error) = fatal {
            warn!("Experiment aborted: {}", error);
            return Err(error.into());
        }

        let items: Vec<ExperimentItem> = slots
            .into_iter()
            .enumerate()
            .filter_map(|(collection_index, slot)| {
                slot.map(|outcome| ExperimentItem {
                    collection_index,
                    outcome,
                })
            })
            .collect();

        let result = ExperimentResult {
            items,
            stopped_early: cancel.is_cancelled(),
        };
        info!(
            "Experiment finished: {} item(s), all identical: {}",
            result.len(),
            result.all_identical()
        );
        Ok(result)
    }
}
