//! Connections resolved from config files.

use std::io::Write;

use sql_scientist::config::Config;
use sql_scientist::db::{self, DatabaseBackend, ParameterCollection};
use sql_scientist::error::Side;
use sql_scientist::{compare_once, run_experiment};

#[tokio::test]
async fn test_sqlite_file_connection_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("fixtures.db");
    std::fs::File::create(&db_path).unwrap();

    let config_path = dir.path().join("config.toml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    write!(
        file,
        r#"
[experiment]
max_concurrency = 2
stop_on_first_mismatch = true

[connections.fixtures]
backend = "sqlite"
database = "{}"
"#,
        db_path.display()
    )
    .unwrap();

    let config = Config::load_from_file(&config_path).unwrap();
    assert_eq!(config.experiment.max_concurrency, 2);

    let connection = config.resolve_connection(None, Some("fixtures")).unwrap();
    assert_eq!(connection.backend, DatabaseBackend::Sqlite);

    let adapter = db::connect(&connection).await.unwrap();
    adapter
        .execute(
            "CREATE TABLE orders (id INTEGER PRIMARY KEY, total REAL NOT NULL);
             INSERT INTO orders VALUES (1, 10.5), (2, 20.0), (3, 7.25);",
            &ParameterCollection::empty(),
            Side::First,
        )
        .await
        .unwrap();

    let result = compare_once(
        adapter.clone(),
        "SELECT SUM(total) AS total FROM orders",
        "SELECT SUM(o.total) AS total FROM orders AS o",
        ParameterCollection::empty(),
    )
    .await
    .unwrap();
    assert!(result.results_are_identical);

    let collections = sql_scientist::cli::parse_parameter_collections(
        r#"[{"min": 8}, {"min": 100}]"#,
    )
    .unwrap();
    let result = run_experiment(
        adapter.clone(),
        "SELECT id FROM orders WHERE total > @min ORDER BY id",
        "SELECT id FROM orders WHERE total >= @min ORDER BY id",
        &collections,
        config.experiment,
    )
    .await
    .unwrap();
    assert!(result.all_identical());
    assert_eq!(result.len(), 2);

    adapter.close().await.unwrap();

    // The data persisted in the file.
    let reopened = db::connect(&connection).await.unwrap();
    let sets = reopened
        .execute(
            "SELECT COUNT(*) FROM orders",
            &ParameterCollection::empty(),
            Side::First,
        )
        .await
        .unwrap();
    assert_eq!(sets[0].rows()[0][0], sql_scientist::Value::Integer(3));
    reopened.close().await.unwrap();
}

#[tokio::test]
async fn test_missing_sqlite_file_is_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = sql_scientist::config::ConnectionConfig::sqlite(
        dir.path().join("absent.db").display().to_string(),
    );

    let err = db::connect(&config).await.err().unwrap();
    assert!(err.is_fatal());
}
