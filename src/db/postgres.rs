//! PostgreSQL execution adapter.
//!
//! Provides the `PostgresAdapter` struct that implements the
//! `QueryExecutionAdapter` trait for PostgreSQL databases using sqlx.

use crate::config::ConnectionConfig;
use crate::db::placeholders::{bind_named, split_statements, BoundQuery, PlaceholderStyle};
use crate::db::type_map::TypeMap;
use crate::db::{
    map_execution_error, ColumnInfo, Decimal, ParameterCollection, QueryExecutionAdapter,
    ResultSet, ResultSetReader, Row, Value, ValueKind,
};
use crate::error::{Result, ScientistError, Side};
use async_trait::async_trait;
use base64::Engine as _;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::postgres::{
    PgConnection, PgPool, PgPoolOptions, PgRow, PgValueFormat, PgValueRef, Postgres,
};
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, TypeInfo, ValueRef};
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum number of connection retry attempts.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts (doubles each retry).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// PostgreSQL execution adapter.
#[derive(Debug)]
pub struct PostgresAdapter {
    pool: PgPool,
    query_timeout: Duration,
}

impl PostgresAdapter {
    /// Creates a new adapter from an existing connection pool.
    pub fn from_pool(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    /// Connects to PostgreSQL, retrying transient failures with backoff.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let conn_str = config.to_connection_string()?;

        let mut last_error = None;
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);

        for attempt in 1..=MAX_RETRY_ATTEMPTS {
            debug!("Connection attempt {} of {}", attempt, MAX_RETRY_ATTEMPTS);

            let result = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(Duration::from_secs(10))
                .connect(&conn_str)
                .await;

            match result {
                Ok(pool) => {
                    debug!("Successfully connected to database");
                    return Ok(Self::from_pool(pool, config.query_timeout()));
                }
                Err(e) => {
                    let is_transient = is_transient_error(&e);
                    last_error = Some(e);

                    if attempt < MAX_RETRY_ATTEMPTS && is_transient {
                        warn!(
                            "Connection attempt {} failed (transient error), retrying in {:?}",
                            attempt, delay
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2; // Exponential backoff
                    } else {
                        break;
                    }
                }
            }
        }

        match last_error {
            Some(e) => Err(map_connection_error(e, config)),
            None => Err(ScientistError::internal("No connection attempt was made")),
        }
    }

    /// Runs each statement of the batch on one connection.
    ///
    /// Statements run one by one through the extended protocol, so bound
    /// parameters work in multi-statement batches and session state (temp
    /// tables, `SET`) carries over between statements.
    async fn run(&self, sql: &str, parameters: &ParameterCollection) -> Result<Vec<ResultSet>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_execution_error(e, format_query_error))?;
        let mut sets = Vec::new();

        for statement in split_statements(sql) {
            let bound = bind_named(&statement, parameters, PlaceholderStyle::Dollar);
            if let Some(set) = execute_statement(&mut *conn, bound).await? {
                sets.push(set);
            }
        }

        Ok(sets)
    }
}

/// Runs a single statement with bound parameters.
///
/// Column metadata comes from `describe`, so an empty result keeps its
/// schema and nullability is known for table columns. A statement that
/// describes no columns yields no result set.
async fn execute_statement(
    conn: &mut PgConnection,
    bound: BoundQuery<'_>,
) -> Result<Option<ResultSet>> {
    let described = (&mut *conn)
        .describe(&bound.sql)
        .await
        .map_err(|e| map_execution_error(e, format_query_error))?;

    let columns: Vec<ColumnInfo> = described
        .columns()
        .iter()
        .enumerate()
        .map(|(i, col)| {
            column_info(col.name(), col.type_info().name())
                .with_nullable(described.nullable(i).unwrap_or(true))
        })
        .collect();

    let mut query = sqlx::query::<Postgres>(&bound.sql);
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
            .map_err(|e| map_execution_error(e, format_query_error))?;
        return Ok(None);
    }

    let rows = query
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_execution_error(e, format_query_error))?;

    let mut reader = ResultSetReader::new();
    reader.set_columns(columns);
    for row in &rows {
        reader.push_row(convert_row(row))?;
    }
    Ok(Some(reader.finish()))
}

#[async_trait]
impl QueryExecutionAdapter for PostgresAdapter {
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

/// Builds column metadata from a native type name using the static type table.
fn column_info(name: &str, native_type: &str) -> ColumnInfo {
    let (kind, size) = TypeMap::POSTGRES.lookup(native_type);
    ColumnInfo::new(name, native_type)
        .with_kind(kind)
        .with_size(size)
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
///
/// A value that fails typed decoding keeps its raw form as `Other`, so it
/// never compares equal to a real NULL.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    let raw = match row.try_get_raw(index) {
        Ok(raw) if !raw.is_null() => raw,
        _ => return Value::Null,
    };

    match type_name.to_uppercase().as_str() {
        "INT2" => row
            .try_get::<i16, _>(index)
            .map(|v| Value::Integer(v as i64))
            .unwrap_or_else(|_| raw_other(&raw)),
        "INT4" => row
            .try_get::<i32, _>(index)
            .map(|v| Value::Integer(v as i64))
            .unwrap_or_else(|_| raw_other(&raw)),
        "INT8" => row
            .try_get::<i64, _>(index)
            .map(Value::Integer)
            .unwrap_or_else(|_| raw_other(&raw)),
        "OID" => row
            .try_get::<sqlx::postgres::types::Oid, _>(index)
            .map(|v| Value::Integer(v.0 as i64))
            .unwrap_or_else(|_| raw_other(&raw)),
        "FLOAT4" => row
            .try_get::<f32, _>(index)
            .map(|v| Value::Decimal(Decimal::from_f64(v as f64)))
            .unwrap_or_else(|_| raw_other(&raw)),
        "FLOAT8" => row
            .try_get::<f64, _>(index)
            .map(|v| Value::Decimal(Decimal::from_f64(v)))
            .unwrap_or_else(|_| raw_other(&raw)),
        "NUMERIC" => decode_numeric(&raw)
            .and_then(|s| Decimal::parse(&s))
            .map(Value::Decimal)
            .unwrap_or_else(|| raw_other(&raw)),
        "BOOL" => row
            .try_get::<bool, _>(index)
            .map(|v| Value::Other(v.to_string()))
            .unwrap_or_else(|_| raw_other(&raw)),
        "BYTEA" => row
            .try_get::<Vec<u8>, _>(index)
            .map(Value::Binary)
            .unwrap_or_else(|_| raw_other(&raw)),
        "TIMESTAMPTZ" => row
            .try_get::<DateTime<Utc>, _>(index)
            .map(|v| Value::DateTime(v.naive_utc()))
            .unwrap_or_else(|_| raw_other(&raw)),
        "TIMESTAMP" => row
            .try_get::<NaiveDateTime, _>(index)
            .map(Value::DateTime)
            .unwrap_or_else(|_| raw_other(&raw)),
        "DATE" => row
            .try_get::<NaiveDate, _>(index)
            .map(|v| Value::DateTime(v.and_time(chrono::NaiveTime::MIN)))
            .unwrap_or_else(|_| raw_other(&raw)),
        _ => match TypeMap::POSTGRES.kind_of(type_name) {
            ValueKind::Text => row
                .try_get::<String, _>(index)
                .map(Value::Text)
                .unwrap_or_else(|_| raw_other(&raw)),
            _ => raw_other(&raw),
        },
    }
}

/// Renders a value sqlx has no typed decoding for as an `Other` token.
///
/// Text-format values keep their text; anything else is base64 encoded.
fn raw_other(raw: &PgValueRef<'_>) -> Value {
    let text = match raw.format() {
        PgValueFormat::Text => raw.as_str().ok().map(str::to_string),
        PgValueFormat::Binary => None,
    };
    Value::Other(text.unwrap_or_else(|| {
        base64::engine::general_purpose::STANDARD.encode(raw.as_bytes().unwrap_or_default())
    }))
}

/// Decodes a NUMERIC value to plain decimal text.
fn decode_numeric(raw: &PgValueRef<'_>) -> Option<String> {
    match raw.format() {
        PgValueFormat::Text => raw.as_str().ok().map(str::to_string),
        PgValueFormat::Binary => decode_numeric_binary(raw.as_bytes().ok()?),
    }
}

/// Decodes the binary NUMERIC wire format: a header of ndigits, weight, sign
/// and display scale, followed by base-10000 digits.
fn decode_numeric_binary(bytes: &[u8]) -> Option<String> {
    let read_i16 = |at: usize| -> Option<i16> {
        Some(i16::from_be_bytes([*bytes.get(at)?, *bytes.get(at + 1)?]))
    };

    let ndigits = usize::try_from(read_i16(0)?).ok()?;
    let weight = read_i16(2)? as i32;
    let sign = read_i16(4)? as u16;

    match sign {
        0xC000 => return Some("NaN".to_string()),
        0xD000 => return Some("Infinity".to_string()),
        0xF000 => return Some("-Infinity".to_string()),
        _ => {}
    }

    let digits = (0..ndigits)
        .map(|i| read_i16(8 + 2 * i))
        .collect::<Option<Vec<i16>>>()?;

    let mut text = String::new();
    if sign == 0x4000 {
        text.push('-');
    }

    if weight < 0 {
        text.push('0');
    } else {
        for j in 0..=weight as usize {
            let d = digits.get(j).copied().unwrap_or(0);
            if j == 0 {
                text.push_str(&d.to_string());
            } else {
                text.push_str(&format!("{d:04}"));
            }
        }
    }

    let first_fraction = (weight + 1).max(0) as usize;
    if digits.len() > first_fraction {
        text.push('.');
        for _ in 0..(-weight - 1).max(0) {
            text.push_str("0000");
        }
        for d in &digits[first_fraction..] {
            text.push_str(&format!("{d:04}"));
        }
    }

    Some(text)
}

/// Determines if an error is transient and worth retrying.
fn is_transient_error(error: &sqlx::Error) -> bool {
    let error_str = error.to_string().to_lowercase();

    // Connection refused or timeout are often transient
    if error_str.contains("connection refused")
        || error_str.contains("timed out")
        || error_str.contains("timeout")
        || error_str.contains("temporarily unavailable")
        || error_str.contains("connection reset")
        || error_str.contains("broken pipe")
    {
        return true;
    }

    false
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> ScientistError {
    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.port;
    let user = config.user.as_deref().unwrap_or("unknown");
    let database = config.database.as_deref().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        ScientistError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        ScientistError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        ScientistError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        ScientistError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        ScientistError::connection(error.to_string())
    }
}

/// Formats a query error with PostgreSQL detail and hint fields if available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }

        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
    }

    result
}
