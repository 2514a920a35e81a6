//! Experiment runs against SQLite.

use std::sync::Arc;

use sql_scientist::cli::parse_parameter_collections;
use sql_scientist::compare::QueryComparisonEngine;
use sql_scientist::db::{ParameterCollection, QueryExecutionAdapter, SqliteAdapter};
use sql_scientist::error::Side;
use sql_scientist::experiment::{ExperimentOptions, ExperimentRunner, ItemOutcome};
use sql_scientist::run_experiment;

use super::sqlite_compare_test::people_db;

fn ids(json: &str) -> Vec<ParameterCollection> {
    parse_parameter_collections(json).unwrap()
}

#[tokio::test]
async fn test_two_collections_in_order() {
    let db = people_db().await;
    let result = run_experiment(
        db,
        "SELECT name FROM people WHERE id = @id",
        "SELECT name FROM people WHERE id = @id LIMIT 1",
        &ids(r#"[{"id": 1}, {"id": 2}]"#),
        ExperimentOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(result.len(), 2);
    let indices: Vec<usize> = result.items.iter().map(|i| i.collection_index).collect();
    assert_eq!(indices, vec![0, 1]);
    assert!(result.all_identical());
}

#[tokio::test]
async fn test_mismatch_reported_per_collection() {
    let db = people_db().await;
    // Differs only where city is NULL.
    let result = run_experiment(
        db,
        "SELECT city FROM people WHERE id = @id",
        "SELECT city FROM people WHERE id = @id AND city IS NOT NULL",
        &ids(r#"[{"id": 1}, {"id": 2}, {"id": 3}]"#),
        ExperimentOptions::sequential(),
    )
    .await
    .unwrap();

    assert!(!result.stopped_early);
    let identical: Vec<bool> = result.items.iter().map(|i| i.is_identical()).collect();
    assert_eq!(identical, vec![true, true, false]);
}

#[tokio::test]
async fn test_stop_on_first_mismatch() {
    let db = people_db().await;
    let options = ExperimentOptions {
        stop_on_first_mismatch: true,
        max_concurrency: 1,
        concurrent_sides: false,
    };
    let result = run_experiment(
        db,
        "SELECT name FROM people WHERE id = @id",
        "SELECT upper(name) AS name FROM people WHERE id = @id",
        &ids(r#"[{"id": 1}, {"id": 2}, {"id": 3}]"#),
        options,
    )
    .await
    .unwrap();

    assert!(result.stopped_early);
    assert_eq!(result.len(), 1);
    assert_eq!(result.items[0].collection_index, 0);
    assert!(!result.all_identical());
}

#[tokio::test]
async fn test_runtime_failure_in_one_collection() {
    let db = people_db().await;
    // SQLite raises on abs() of the minimum integer.
    let result = run_experiment(
        db,
        "SELECT @n AS n",
        "SELECT abs(@n) AS n",
        &ids(r#"[{"n": 5}, {"n": -9223372036854775808}, {"n": 7}]"#),
        ExperimentOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(result.len(), 3);
    assert!(result.items[0].is_identical());
    assert!(result.items[2].is_identical());
    match &result.items[1].outcome {
        ItemOutcome::Failed(e) => {
            assert_eq!(e.side, Side::Second);
            assert_eq!(e.collection_index, Some(1));
            assert!(e.message.contains("integer overflow"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_sides_on_separate_databases() {
    let first = people_db().await;
    let second: Arc<dyn QueryExecutionAdapter> = Arc::new(SqliteAdapter::in_memory().await.unwrap());
    second
        .execute(
            "CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT NOT NULL, city TEXT);
             INSERT INTO people VALUES (1, 'Ada', 'London'), (2, 'Linus', 'Espoo'), (3, 'Grace', NULL);",
            &ParameterCollection::empty(),
            Side::Second,
        )
        .await
        .unwrap();

    let engine = QueryComparisonEngine::with_adapters(first, second).concurrent_sides(true);
    let runner = ExperimentRunner::new(engine, ExperimentOptions::default());
    let query = "SELECT id, name, city FROM people WHERE id = @id";
    let result = runner
        .run(query, query, &ids(r#"[{"id": 1}, {"id": 2}, {"id": 3}]"#))
        .await
        .unwrap();

    let identical: Vec<bool> = result.items.iter().map(|i| i.is_identical()).collect();
    assert_eq!(identical, vec![true, false, true]);

    let (_, comparison) = result.comparisons().nth(1).unwrap();
    let diff = &comparison.result_set_comparisons[0].data_differences[0];
    assert_eq!(diff.row_index, 0);
    assert_eq!(diff.cells.len(), 1);
    assert_eq!(diff.cells[0].column_index, 2);
}
