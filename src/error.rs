//! Error types for SQL Scientist.
//!
//! Defines the main error enum used throughout the crate, plus the typed
//! execution failure the comparison engine reports when one side of a query
//! pair cannot be run.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Which of the two compared queries an operation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The original query (`query1`).
    First,
    /// The candidate replacement query (`query2`).
    Second,
}

impl Side {
    /// Returns the side as a short lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Second => "second",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Class of failure behind an [`ExecutionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionErrorKind {
    /// The data store could not be reached. Fatal for an experiment run.
    Connection,
    /// The query itself failed (syntax, runtime fault, timeout).
    Query,
}

impl fmt::Display for ExecutionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => f.write_str("connection failure"),
            Self::Query => f.write_str("query failure"),
        }
    }
}

/// A typed failure raised while executing one side of a comparison.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error(
    "{kind} on {side} query{}: {message}",
    collection_suffix(.collection_index)
)]
pub struct ExecutionError {
    /// Whether the failure was connectivity or query related.
    pub kind: ExecutionErrorKind,
    /// The side whose query failed.
    pub side: Side,
    /// Text of the offending query.
    pub query: String,
    /// Index of the parameter collection being compared, when run as part of an experiment.
    pub collection_index: Option<usize>,
    /// Provider-native diagnostic text.
    pub message: String,
}

fn collection_suffix(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!(" (parameter collection {i})"),
        None => String::new(),
    }
}

impl ExecutionError {
    /// Builds an execution error from an adapter failure on the given side.
    pub fn from_adapter(error: ScientistError, side: Side, query: &str) -> Self {
        let kind = if error.is_fatal() {
            ExecutionErrorKind::Connection
        } else {
            ExecutionErrorKind::Query
        };
        let message = match error {
            ScientistError::Connection(msg)
            | ScientistError::Query(msg)
            | ScientistError::Parameters(msg)
            | ScientistError::Config(msg)
            | ScientistError::Internal(msg) => msg,
            ScientistError::Execution(inner) => inner.message,
        };
        Self {
            kind,
            side,
            query: query.to_string(),
            collection_index: None,
            message,
        }
    }

    /// Attaches the parameter collection index this failure belongs to.
    pub fn in_collection(mut self, index: usize) -> Self {
        self.collection_index = Some(index);
        self
    }

    /// Returns true if this failure should abort an entire experiment run.
    pub fn is_fatal(&self) -> bool {
        self.kind == ExecutionErrorKind::Connection
    }
}

/// Main error type for SQL Scientist operations.
#[derive(Error, Debug)]
pub enum ScientistError {
    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution errors reported by an adapter (syntax errors, timeouts, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// A comparison could not run because one of its queries failed.
    #[error("Execution error: {0}")]
    Execution(ExecutionError),

    /// Invalid parameter bindings (duplicate names, unsupported values).
    #[error("Parameter error: {0}")]
    Parameters(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors (broken invariants, unexpected states).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScientistError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a parameter error with the given message.
    pub fn parameters(msg: impl Into<String>) -> Self {
        Self::Parameters(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true for connection-class failures, which abort a whole run.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Execution(e) => e.is_fatal(),
            _ => false,
        }
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Execution(_) => "Execution Error",
            Self::Parameters(_) => "Parameter Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

impl From<ExecutionError> for ScientistError {
    fn from(e: ExecutionError) -> Self {
        Self::Execution(e)
    }
}

/// Result type alias using ScientistError.
pub type Result<T> = std::result::Result<T, ScientistError>;
