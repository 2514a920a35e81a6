//! Binary tests: exit codes, report formats and flag handling.

use super::common::run_scientist;

const MEMORY: &str = "sqlite::memory:";

#[test]
fn test_identical_queries_exit_zero() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, stderr) = run_scientist(
        dir.path(),
        &[MEMORY, "--query1", "SELECT 1", "--query2", "SELECT 1"],
    );

    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("Result: identical"));
    assert!(stdout.contains("1 identical, 0 different, 0 failed"));
}

#[test]
fn test_different_queries_exit_one() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_scientist(
        dir.path(),
        &[MEMORY, "--query1", "SELECT 1", "--query2", "SELECT 2"],
    );

    assert_eq!(code, 1);
    assert!(stdout.contains("Result: DIFFERENT"));
    assert!(stdout.contains("Row 0: column(s) 0 differ"));
}

#[test]
fn test_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_scientist(
        dir.path(),
        &[
            MEMORY,
            "--query1",
            "SELECT 'x' AS C1",
            "--query2",
            "SELECT 'x' AS C2",
            "--output",
            "json",
        ],
    );

    assert_eq!(code, 1);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["all_identical"], false);
    let summary = &json["items"][0]["outcome"]["result"]["result_set_comparisons"][0];
    assert_eq!(summary["columns_are_same"], false);
    assert_eq!(summary["column_differences"][0]["name_is_different"], true);
}

#[test]
fn test_params_file_runs_each_collection() {
    let dir = tempfile::tempdir().unwrap();
    let params = dir.path().join("params.json");
    std::fs::write(&params, r#"[{"id": 1}, {"id": 2}, {"id": 3}]"#).unwrap();

    let (code, stdout, stderr) = run_scientist(
        dir.path(),
        &[
            MEMORY,
            "--query1",
            "SELECT @id AS id",
            "--query2",
            "SELECT (@id) AS id",
            "--params",
            params.to_str().unwrap(),
            "--max-concurrency",
            "2",
        ],
    );

    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("Collection 0: identical"));
    assert!(stdout.contains("Collection 2: identical"));
    assert!(stdout.contains("3 collections compared"));
}

#[test]
fn test_params_query_rows_become_collections() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, stderr) = run_scientist(
        dir.path(),
        &[
            MEMORY,
            "--query1",
            "SELECT @id * 2 AS doubled, @label AS label",
            "--query2",
            "SELECT @id + @id AS doubled, @label AS label",
            "--params-query",
            "SELECT 1 AS id, 'a' AS label UNION ALL SELECT 2, 'b' UNION ALL SELECT 3, NULL",
        ],
    );

    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("Collection 2: identical"));
    assert!(stdout.contains("3 collections compared"));
}

#[test]
fn test_params_query_without_rows_exit_two() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, stderr) = run_scientist(
        dir.path(),
        &[
            MEMORY,
            "--query1",
            "SELECT @id",
            "--query2",
            "SELECT @id",
            "--params-query",
            "SELECT 1 AS id WHERE 0",
        ],
    );

    assert_eq!(code, 2);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Parameters query returned no rows"));
}

#[test]
fn test_query_files() {
    let dir = tempfile::tempdir().unwrap();
    let q1 = dir.path().join("old.sql");
    let q2 = dir.path().join("new.sql");
    std::fs::write(&q1, "SELECT 1 AS a;\nSELECT 2 AS b;\n").unwrap();
    std::fs::write(&q2, "SELECT 1 AS a;\n").unwrap();

    let (code, stdout, _) = run_scientist(
        dir.path(),
        &[
            MEMORY,
            "--query1-file",
            q1.to_str().unwrap(),
            "--query2-file",
            q2.to_str().unwrap(),
        ],
    );

    assert_eq!(code, 1);
    assert!(stdout.contains("Result set count differs: 2 vs 1"));
}

#[test]
fn test_query_failure_exit_one() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_scientist(
        dir.path(),
        &[MEMORY, "--query1", "SELECT 1", "--query2", "SELEC 1"],
    );

    assert_eq!(code, 1);
    assert!(stdout.contains("Result: FAILED"));
    assert!(stdout.contains("query failure on second query"));
}

#[test]
fn test_unreachable_database_exit_two() {
    let dir = tempfile::tempdir().unwrap();
    let missing = format!("sqlite:{}", dir.path().join("absent.db").display());
    let (code, stdout, stderr) = run_scientist(
        dir.path(),
        &[&missing, "--query1", "SELECT 1", "--query2", "SELECT 1"],
    );

    assert_eq!(code, 2);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Connection Error"));
}

#[test]
fn test_invalid_config_exit_two() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[experiment]\nmax_concurrency = 0\n",
    )
    .unwrap();

    let (code, _, stderr) = run_scientist(
        dir.path(),
        &[MEMORY, "--query1", "SELECT 1", "--query2", "SELECT 1"],
    );

    assert_eq!(code, 2);
    assert!(stderr.contains("max_concurrency"));
}

#[test]
fn test_named_connection_from_config() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[connections.scratch]\nbackend = \"sqlite\"\ndatabase = \":memory:\"\n",
    )
    .unwrap();

    let (code, stdout, stderr) = run_scientist(
        dir.path(),
        &["-c", "scratch", "--query1", "SELECT 1", "--query2", "SELECT 1"],
    );
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("identical"));

    let (code, _, stderr) = run_scientist(
        dir.path(),
        &["-c", "nope", "--query1", "SELECT 1", "--query2", "SELECT 1"],
    );
    assert_eq!(code, 2);
    assert!(stderr.contains("Unknown connection 'nope'"));
}

#[test]
fn test_second_connection() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_scientist(
        dir.path(),
        &[
            MEMORY,
            "--second-connection",
            MEMORY,
            "--concurrent-sides",
            "--query1",
            "SELECT 1",
            "--query2",
            "SELECT 1",
        ],
    );
    assert_eq!(code, 0, "stderr: {stderr}");
}

#[test]
fn test_log_file() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("logs").join("run.log");
    let (code, _, stderr) = run_scientist(
        dir.path(),
        &[
            MEMORY,
            "--query1",
            "SELECT 1",
            "--query2",
            "SELECT 1",
            "--verbose",
            "--log-file",
            log.to_str().unwrap(),
        ],
    );

    assert_eq!(code, 0);
    assert!(stderr.is_empty());
    let contents = std::fs::read_to_string(&log).unwrap();
    assert!(contents.contains("Experiment finished"));
}
