//! Database abstraction layer for SQL Scientist.
//!
//! Provides the trait-based execution interface the comparison engine
//! consumes, allowing different database backends (and in-memory fakes) to
//! be used interchangeably.

pub mod mock;
pub mod placeholders;
mod postgres;
pub mod reader;
mod sqlite;
pub mod type_map;
mod types;

pub use mock::ScriptedAdapter;
pub use postgres::PostgresAdapter;
pub use reader::ResultSetReader;
pub use sqlite::SqliteAdapter;
pub use types::{
    ColumnInfo, Decimal, Parameter, ParameterCollection, ResultSet, Row, Value, ValueKind,
    UNBOUNDED_SIZE,
};

use crate::config::ConnectionConfig;
use crate::error::{Result, ScientistError, Side};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Postgres,
    Sqlite,
}

impl DatabaseBackend {
    /// Returns the backend as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }
}

/// Creates an execution adapter for the given backend and configuration.
///
/// This is the central factory function for database connections.
pub async fn connect(config: &ConnectionConfig) -> Result<Arc<dyn QueryExecutionAdapter>> {
    debug!(
        "Connecting to {} backend at {}",
        config.backend.as_str(),
        config.display_string()
    );
    match config.backend {
        DatabaseBackend::Postgres => {
            let adapter = PostgresAdapter::connect(config).await?;
            Ok(Arc::new(adapter))
        }
        DatabaseBackend::Sqlite => {
            let adapter = SqliteAdapter::connect(config).await?;
            Ok(Arc::new(adapter))
        }
    }
}

/// Capability the comparison engine uses to run queries.
///
/// Implementations bind the parameters, run the (possibly multi-statement)
/// batch and return one [`ResultSet`] per row-returning statement, in order.
/// Statements without result columns (DDL, plain DML) produce no set. Failures carry
/// the provider's diagnostic text as [`ScientistError::Query`] or, when the
/// data store is unreachable, [`ScientistError::Connection`].
#[async_trait]
pub trait QueryExecutionAdapter: Send + Sync {
    /// Executes a query batch with the given bindings.
    ///
    /// `side` identifies which of the compared queries is running; adapters
    /// may use it to route to a side-specific connection or for logging.
    async fn execute(
        &self,
        sql: &str,
        parameters: &ParameterCollection,
        side: Side,
    ) -> Result<Vec<ResultSet>>;

    /// Closes the underlying connections.
    async fn close(&self) -> Result<()>;
}

/// Maps a sqlx error raised while running a statement.
///
/// Pool and transport failures are connection errors; everything else is a
/// query error with the driver's message.
pub(crate) fn map_execution_error(error: sqlx::Error, describe: fn(sqlx::Error) -> String) -> ScientistError {
    match error {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => ScientistError::connection(error.to_string()),
        other => ScientistError::query(describe(other)),
    }
}
