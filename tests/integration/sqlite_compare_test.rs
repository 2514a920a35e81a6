//! Single comparisons against SQLite.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use sql_scientist::compare_once;
use sql_scientist::db::{Parameter, ParameterCollection, QueryExecutionAdapter, SqliteAdapter};
use sql_scientist::error::{ExecutionErrorKind, ScientistError, Side};

async fn memory_db() -> Arc<dyn QueryExecutionAdapter> {
    Arc::new(SqliteAdapter::in_memory().await.unwrap())
}

/// An in-memory database with a small `people` table.
pub async fn people_db() -> Arc<dyn QueryExecutionAdapter> {
    let adapter = memory_db().await;
    adapter
        .execute(
            "CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT NOT NULL, city TEXT);
             INSERT INTO people (id, name, city) VALUES
                (1, 'Ada', 'London'),
                (2, 'Linus', 'Helsinki'),
                (3, 'Grace', NULL);",
            &ParameterCollection::empty(),
            Side::First,
        )
        .await
        .unwrap();
    adapter
}

async fn compare(
    adapter: Arc<dyn QueryExecutionAdapter>,
    query1: &str,
    query2: &str,
) -> sql_scientist::QueryComparison {
    compare_once(adapter, query1, query2, ParameterCollection::empty())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_identical_literal() {
    let result = compare(memory_db().await, "SELECT 1", "SELECT 1").await;
    assert!(result.results_are_identical);
    assert_eq!(result.result_set_comparisons.len(), 1);
}

#[tokio::test]
async fn test_different_literal() {
    let result = compare(memory_db().await, "SELECT 1", "SELECT 2").await;
    assert!(!result.results_are_identical);

    let summary = &result.result_set_comparisons[0];
    assert_eq!(summary.data_differences.len(), 1);
    assert_eq!(summary.data_differences[0].row_index, 0);
    assert_eq!(summary.data_differences[0].cells.len(), 1);
    assert_eq!(summary.data_differences[0].cells[0].column_index, 0);
}

#[tokio::test]
async fn test_column_alias_difference() {
    let result = compare(memory_db().await, "SELECT 'x' AS C1", "SELECT 'x' AS C2").await;
    assert!(!result.results_are_identical);

    let summary = &result.result_set_comparisons[0];
    assert!(!summary.columns_are_same);
    assert!(summary.data_differences.is_empty());
    assert_eq!(summary.column_differences.len(), 1);
    assert_eq!(summary.column_differences[0].index, 0);
    assert!(summary.column_differences[0].name_is_different);
}

#[tokio::test]
async fn test_multi_statement_batches() {
    let result = compare(
        memory_db().await,
        "SELECT 1 AS a; SELECT 2 AS b",
        "SELECT 1 AS a; SELECT 3 AS b",
    )
    .await;

    assert!(!result.results_are_identical);
    assert_eq!(result.result_set_comparisons.len(), 2);
    assert!(result.result_set_comparisons[0].results_are_identical);
    assert!(!result.result_set_comparisons[1].results_are_identical);
}

#[tokio::test]
async fn test_result_set_count_difference() {
    let result = compare(memory_db().await, "SELECT 1; SELECT 2", "SELECT 1").await;

    assert!(result.result_set_counts_are_not_same);
    assert!(!result.results_are_identical);
    assert_eq!(result.result_set_comparisons.len(), 1);
    assert!(result.result_set_comparisons[0].results_are_identical);
}

#[tokio::test]
async fn test_empty_results_with_different_schemas() {
    let result = compare(
        memory_db().await,
        "SELECT 1 AS a WHERE 0",
        "SELECT 'x' AS b, 2 AS c WHERE 0",
    )
    .await;

    assert!(!result.results_are_identical);
    let summary = &result.result_set_comparisons[0];
    assert!(!summary.columns_are_same);
    assert!(summary.column_count_mismatch);
    assert!(summary.column_differences[0].name_is_different);
    assert!(!summary.row_count_mismatch);
}

#[tokio::test]
async fn test_setup_statements_are_not_result_sets() {
    let result = compare(
        memory_db().await,
        "CREATE TABLE IF NOT EXISTS p (x); SELECT 1 AS a",
        "SELECT 1 AS a",
    )
    .await;

    assert!(!result.result_set_counts_are_not_same);
    assert_eq!(result.result_set_counts, (1, 1));
    assert!(result.results_are_identical);
}

#[tokio::test]
async fn test_equivalent_rewrite_is_identical() {
    let db = people_db().await;
    let result = compare(
        db,
        "SELECT id, name FROM people WHERE city IS NOT NULL ORDER BY id",
        "SELECT id, name FROM people WHERE id IN (SELECT id FROM people WHERE city IS NOT NULL) ORDER BY id",
    )
    .await;
    assert!(result.results_are_identical);
}

#[tokio::test]
async fn test_row_order_matters() {
    let db = people_db().await;
    let result = compare(
        db,
        "SELECT name FROM people ORDER BY id",
        "SELECT name FROM people ORDER BY id DESC",
    )
    .await;

    let summary = &result.result_set_comparisons[0];
    assert!(!summary.row_count_mismatch);
    let rows: Vec<usize> = summary.data_differences.iter().map(|d| d.row_index).collect();
    assert_eq!(rows, vec![0, 2]);
}

#[tokio::test]
async fn test_row_count_difference() {
    let db = people_db().await;
    let result = compare(
        db,
        "SELECT name FROM people ORDER BY id",
        "SELECT name FROM people WHERE city IS NOT NULL ORDER BY id",
    )
    .await;

    let summary = &result.result_set_comparisons[0];
    assert!(summary.row_count_mismatch);
    assert!(summary.data_differences.is_empty());
    assert!(!result.results_are_identical);
}

#[tokio::test]
async fn test_integer_and_real_are_different() {
    let result = compare(memory_db().await, "SELECT 1 AS n", "SELECT 1.0 AS n").await;
    let summary = &result.result_set_comparisons[0];
    assert_eq!(summary.data_differences.len(), 1);
}

#[tokio::test]
async fn test_decimal_scale_ignored() {
    let result = compare(memory_db().await, "SELECT 1.50 AS n", "SELECT 1.5 AS n").await;
    assert!(result.results_are_identical);
}

#[tokio::test]
async fn test_text_and_integer_are_different() {
    let result = compare(memory_db().await, "SELECT '1' AS n", "SELECT 1 AS n").await;
    assert!(!result.results_are_identical);
    assert_eq!(result.result_set_comparisons[0].data_differences.len(), 1);
}

#[tokio::test]
async fn test_nulls_compare_equal() {
    let db = people_db().await;
    let result = compare(
        db,
        "SELECT city FROM people WHERE id = 3",
        "SELECT NULL AS city",
    )
    .await;
    assert!(result.result_set_comparisons[0].data_differences.is_empty());
}

#[tokio::test]
async fn test_parameters_bound_to_both_queries() {
    let db = people_db().await;
    let params = ParameterCollection::new(vec![Parameter::new("id", 2)]).unwrap();

    let result = compare_once(
        db.clone(),
        "SELECT name FROM people WHERE id = @id",
        "SELECT name FROM people WHERE id + 0 = @id",
        params.clone(),
    )
    .await
    .unwrap();
    assert!(result.results_are_identical);

    let result = compare_once(
        db,
        "SELECT name FROM people WHERE id = @id",
        "SELECT name FROM people WHERE id = @id + 1",
        params,
    )
    .await
    .unwrap();
    assert!(!result.results_are_identical);
}

#[tokio::test]
async fn test_syntax_error_names_failing_side() {
    let err = compare_once(
        memory_db().await,
        "SELECT 1",
        "SELEC 1",
        ParameterCollection::empty(),
    )
    .await
    .unwrap_err();

    match err {
        ScientistError::Execution(e) => {
            assert_eq!(e.kind, ExecutionErrorKind::Query);
            assert_eq!(e.side, Side::Second);
            assert_eq!(e.query, "SELEC 1");
            assert!(e.message.contains("syntax error"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_table_is_query_failure() {
    let err = compare_once(
        memory_db().await,
        "SELECT * FROM missing",
        "SELECT 1",
        ParameterCollection::empty(),
    )
    .await
    .unwrap_err();

    assert!(!err.is_fatal());
    assert!(err.to_string().contains("no such table"));
}
