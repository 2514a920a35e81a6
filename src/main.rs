//! SQL Scientist - checks that two SQL queries behave the same.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use sql_scientist::cli::Cli;
use sql_scientist::compare::QueryComparisonEngine;
use sql_scientist::config::{Config, ConnectionConfig};
use sql_scientist::db::{self, QueryExecutionAdapter};
use sql_scientist::error::{Result, ScientistError};
use sql_scientist::experiment::{self, ExperimentRunner};
use sql_scientist::logging;
use sql_scientist::report::ReportRenderer;
use tracing::{info, warn};

/// Every comparison was identical.
const EXIT_IDENTICAL: u8 = 0;
/// Differences were found or a collection failed.
const EXIT_DIFFERENT: u8 = 1;
/// The run could not complete.
const EXIT_FATAL: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match &cli.log_file {
        Some(path) => {
            if let Err(e) = logging::init_file_logging(path, cli.verbose) {
                eprintln!("{}: {}", e.category(), e);
                return ExitCode::from(EXIT_FATAL);
            }
        }
        None => logging::init_stderr_logging(cli.verbose),
    }

    match run(&cli).await {
        Ok(true) => ExitCode::from(EXIT_IDENTICAL),
        Ok(false) => ExitCode::from(EXIT_DIFFERENT),
        Err(e) => {
            eprintln!("{}: {}", e.category(), e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// Runs the experiment and prints the report. Returns whether everything
/// was identical.
async fn run(cli: &Cli) -> Result<bool> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    // Precedence: CLI connection string, named connection, default
    // connection, then environment. Individual flags override the result.
    let mut connection =
        config.resolve_connection(cli.connection_string.as_deref(), cli.connection_name())?;
    if let Some(overrides) = cli.connection_overrides() {
        connection.merge(&overrides);
    }

    let options = cli.experiment_options(config.experiment)?;
    let format = cli.parse_output_format().map_err(ScientistError::config)?;
    let (query1, query2) = cli.read_queries()?;
    // A params file is read before connecting; a data query runs after.
    let params_query = cli.params_query()?;
    let file_collections = match params_query {
        Some(_) => None,
        None => Some(cli.load_parameter_collections()?),
    };

    info!("Connection: {}", connection.display_string());
    let first = db::connect(&connection).await?;
    let second = match &cli.second_connection {
        Some(conn_str) => {
            let mut second_config = ConnectionConfig::from_connection_string(conn_str)?;
            second_config.apply_env_defaults();
            if let Some(secs) = cli.query_timeout {
                second_config.query_timeout_secs = secs;
            }
            info!("Second connection: {}", second_config.display_string());
            match db::connect(&second_config).await {
                Ok(adapter) => Some(adapter),
                Err(e) => {
                    close(&first).await;
                    return Err(e);
                }
            }
        }
        None => None,
    };

    let collections = match (file_collections, &params_query) {
        (Some(collections), _) => collections,
        (None, Some(data_query)) => {
            match experiment::collections_from_query(first.as_ref(), data_query).await {
                Ok(collections) => collections,
                Err(e) => {
                    close(&first).await;
                    if let Some(second) = &second {
                        close(second).await;
                    }
                    return Err(e);
                }
            }
        }
        (None, None) => vec![sql_scientist::db::ParameterCollection::empty()],
    };

    let engine = QueryComparisonEngine::with_adapters(
        Arc::clone(&first),
        second.clone().unwrap_or_else(|| Arc::clone(&first)),
    )
    .concurrent_sides(options.concurrent_sides);
    let runner = ExperimentRunner::new(engine, options);

    let started = Instant::now();
    let result = runner.run(&query1, &query2, &collections).await;
    let elapsed = started.elapsed();

    close(&first).await;
    if let Some(second) = &second {
        close(second).await;
    }

    let result = result?;
    let renderer = ReportRenderer::new(format).with_max_differences(cli.max_differences);
    print!("{}", renderer.render(&result, elapsed));

    Ok(result.all_identical())
}

async fn close(adapter: &Arc<dyn QueryExecutionAdapter>) {
    if let Err(e) = adapter.close().await {
        warn!("Failed to close connection: {}", e);
    }
}
