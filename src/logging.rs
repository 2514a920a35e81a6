//! Logging configuration for SQL Scientist.
//!
//! Logs go to stderr so stdout carries only the comparison report, or to a
//! file when one is given.

use std::fs::{self, File};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use crate::error::{Result, ScientistError};

/// Returns the filter directive used when `RUST_LOG` is not set.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "sql_scientist=debug,info"
    } else {
        "warn"
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// Initializes logging to stderr.
pub fn init_stderr_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .init();
}

/// Initializes logging to a file, truncating it first.
pub fn init_file_logging(path: &Path, verbose: bool) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            ScientistError::config(format!("Could not create log directory: {e}"))
        })?;
    }

    let log_file = File::create(path)
        .map_err(|e| ScientistError::config(format!("Could not create log file: {e}")))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(log_file)
        .with_ansi(false) // No ANSI colors in file output
        .init();

    Ok(())
}
