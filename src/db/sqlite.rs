//! SQLite execution adapter.
//!
//! Runs comparisons against a SQLite file or an in-memory database. Batches
//! may contain several statements; each statement that returns columns
//! yields one result set.

use crate::config::ConnectionConfig;
use crate::db::placeholders::{bind_named, split_statements, PlaceholderStyle};
use crate::db::type_map::TypeMap;
use crate::db::{
    map_execution_error, ColumnInfo, Decimal, ParameterCollection, QueryExecutionAdapter,
    ResultSet, ResultSetReader, Row, Value, ValueKind,
};
use crate::error::{Result, ScientistError, Side};
use async_trait::async_trait;
use sqlx::sqlite::{
    Sqlite, SqliteColumn, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, Statement, TypeInfo, ValueRef};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// SQLite execution adapter.
#[derive(Debug)]
pub struct SqliteAdapter {
    pool: SqlitePool,
    query_timeout: Duration,
}

impl SqliteAdapter {
    /// Creates a new adapter from an existing connection pool.
    pub fn from_pool(pool: SqlitePool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    /// Opens the database named by the config.
    ///
    /// An in-memory database lives inside a single connection, so the pool is
    /// limited to one connection in that case.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let url = config.to_connection_string()?;
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| ScientistError::config(format!("Invalid SQLite location: {e}")))?;

        let max_connections = if in_memory { 1 } else { config.max_connections };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| ScientistError::connection(format!("Cannot open {url}: {e}")))?;

        debug!("Opened SQLite database {}", url);
        Ok(Self::from_pool(pool, config.query_timeout()))
    }

    /// Opens a private in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let config = ConnectionConfig::sqlite(":memory:");
        Self::connect(&config).await
    }

    /// Runs each statement of the batch on one connection.
    ///
    /// Every statement is prepared first so its columns are known even when
    /// it returns no rows. Statements without columns run for their effect
    /// and produce no result set.
    async fn run(&self, sql: &str, parameters: &ParameterCollection) -> Result<Vec<ResultSet>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_execution_error(e, describe_error))?;
        let mut sets = Vec::new();

        for statement in split_statements(sql) {
            let bound = bind_named(&statement, parameters, PlaceholderStyle::Question);

            let prepared = (&mut *conn)
                .prepare(&bound.sql)
                .await
                .map_err(|e| map_execution_error(e, describe_error))?;
            let columns = column_infos(prepared.columns());

            let mut query = sqlx::query::<Sqlite>(&bound.sql);
            for value in &bound.values {
                query = match value {
                    Value::Null => query.bind(None::<String>),
                    Value::Text(s) => query.bind(s.as_str()),
                    Value::Integer(i) => query.bind(*i),
                    Value::Decimal(d) => query.bind(d.to_f64()),
                    Value::DateTime(dt) => query.bind(*dt),
                    Value::Binary(b) => query.bind(b.as_slice()),
                    Value::Other(s) => query.bind(s.as_str()),
                };
            }

            if columns.is_empty() {
                query
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| map_execution_error(e, describe_error))?;
                continue;
            }

            let rows = query
                .fetch_all(&mut *conn)
                .await
                .map_err(|e| map_execution_error(e, describe_error))?;

            let mut reader = ResultSetReader::new();
            reader.set_columns(columns);
            for row in &rows {
                reader.push_row(convert_row(row))?;
            }
            sets.push(reader.finish());
        }

        Ok(sets)
    }
}

#[async_trait]
impl QueryExecutionAdapter for SqliteAdapter {
    async fn execute(
        &self,
        sql: &str,
        parameters: &ParameterCollection,
        side: Side,
    ) -> Result<Vec<ResultSet>> {
        debug!("Executing {} query ({} parameters)", side, parameters.len());

        tokio::time::timeout(self.query_timeout, self.run(sql, parameters))
            .await
            .map_err(|_| {
                ScientistError::query(format!(
                    "Query timed out after {} seconds",
                    self.query_timeout.as_secs()
                ))
            })?
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

fn describe_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => format!("ERROR: {}", db_error.message()),
        None => error.to_string(),
    }
}

fn column_infos(columns: &[SqliteColumn]) -> Vec<ColumnInfo> {
    columns
        .iter()
        .map(|col| {
            let native_type = col.type_info().name();
            let (kind, size) = TypeMap::SQLITE.lookup(native_type);
            ColumnInfo::new(col.name(), native_type)
                .with_kind(kind)
                .with_size(size)
        })
        .collect()
}

fn convert_row(row: &SqliteRow) -> Row {
    (0..row.columns().len())
        .map(|i| convert_value(row, i))
        .collect()
}

/// Converts a cell using the storage class of the stored value.
///
/// SQLite types values dynamically, so the declared column type only
/// describes the column; the cell's own storage class decides its kind.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let storage = match row.try_get_raw(index) {
        Ok(raw) if !raw.is_null() => raw.type_info().name().to_string(),
        _ => return Value::Null,
    };

    match TypeMap::SQLITE.kind_of(&storage) {
        ValueKind::Integer => row
            .try_get::<i64, _>(index)
            .map(Value::Integer)
            .unwrap_or(Value::Null),
        ValueKind::Decimal => row
            .try_get::<f64, _>(index)
            .map(|v| Value::Decimal(Decimal::from_f64(v)))
            .unwrap_or(Value::Null),
        ValueKind::Binary => row
            .try_get::<Vec<u8>, _>(index)
            .map(Value::Binary)
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<String, _>(index)
            .map(Value::Text)
            .unwrap_or(Value::Null),
    }
}
