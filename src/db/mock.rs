//! Scripted execution adapter for testing.
//!
//! Provides an in-memory `QueryExecutionAdapter` that returns predefined
//! result sets per query text, records every call it receives, and can be
//! told to fail or to stall for a while.

use super::type_map::TypeMap;
use super::{ColumnInfo, ParameterCollection, QueryExecutionAdapter, ResultSet, Row};
use crate::error::{Result, ScientistError, Side};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Custom response function: (sql, parameters, side) -> result sets.
pub type Responder =
    dyn Fn(&str, &ParameterCollection, Side) -> Result<Vec<ResultSet>> + Send + Sync;

/// Custom delay function: (sql, parameters) -> how long to stall.
pub type DelayFn = dyn Fn(&str, &ParameterCollection) -> Option<Duration> + Send + Sync;

#[derive(Debug, Clone)]
enum Script {
    Sets(Vec<ResultSet>),
    QueryFailure(String),
    ConnectionFailure(String),
}

/// One call received by the adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub sql: String,
    pub parameters: ParameterCollection,
    pub side: Side,
}

/// A mock adapter that returns scripted results.
#[derive(Default)]
pub struct ScriptedAdapter {
    scripts: HashMap<String, Script>,
    delays: HashMap<String, Duration>,
    responder: Option<Box<Responder>>,
    delay_fn: Option<Box<DelayFn>>,
    calls: Mutex<Vec<RecordedCall>>,
    completed: AtomicUsize,
}

impl ScriptedAdapter {
    /// Creates an adapter with no scripts; every query fails until scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an adapter that answers every query with the given function.
    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(&str, &ParameterCollection, Side) -> Result<Vec<ResultSet>> + Send + Sync + 'static,
    {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::default()
        }
    }

    /// Scripts the result sets returned for a query text.
    pub fn with_result(mut self, sql: impl Into<String>, sets: Vec<ResultSet>) -> Self {
        self.scripts.insert(sql.into(), Script::Sets(sets));
        self
    }

    /// Scripts a query failure for a query text.
    pub fn with_query_failure(mut self, sql: impl Into<String>, message: impl Into<String>) -> Self {
        self.scripts
            .insert(sql.into(), Script::QueryFailure(message.into()));
        self
    }

    /// Scripts a connection failure for a query text.
    pub fn with_connection_failure(
        mut self,
        sql: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.scripts
            .insert(sql.into(), Script::ConnectionFailure(message.into()));
        self
    }

    /// Makes a query text stall before answering.
    pub fn with_delay(mut self, sql: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(sql.into(), delay);
        self
    }

    /// Stalls calls for which the function returns a duration, e.g. only
    /// for a particular parameter collection.
    pub fn with_delay_when<F>(mut self, delay_fn: F) -> Self
    where
        F: Fn(&str, &ParameterCollection) -> Option<Duration> + Send + Sync + 'static,
    {
        self.delay_fn = Some(Box::new(delay_fn));
        self
    }

    /// Returns every call received so far, in arrival order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Returns how many calls ran to completion (were not cancelled).
    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryExecutionAdapter for ScriptedAdapter {
    async fn execute(
        &self,
        sql: &str,
        parameters: &ParameterCollection,
        side: Side,
    ) -> Result<Vec<ResultSet>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                sql: sql.to_string(),
                parameters: parameters.clone(),
                side,
            });
        }

        let delay = self
            .delays
            .get(sql)
            .copied()
            .or_else(|| self.delay_fn.as_ref().and_then(|f| f(sql, parameters)));
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = match (self.scripts.get(sql), &self.responder) {
            (Some(Script::Sets(sets)), _) => Ok(sets.clone()),
            (Some(Script::QueryFailure(msg)), _) => Err(ScientistError::query(msg.clone())),
            (Some(Script::ConnectionFailure(msg)), _) => {
                Err(ScientistError::connection(msg.clone()))
            }
            (None, Some(responder)) => responder(sql, parameters, side),
            (None, None) => Err(ScientistError::query(format!(
                "No scripted result for: {sql}"
            ))),
        };

        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Builds a result set from `(name, native type)` column pairs and rows,
/// resolving kinds and sizes through the PostgreSQL type table.
pub fn table(columns: &[(&str, &str)], rows: Vec<Row>) -> ResultSet {
    let columns = columns
        .iter()
        .map(|(name, native_type)| {
            let (kind, size) = TypeMap::POSTGRES.lookup(native_type);
            ColumnInfo::new(*name, *native_type)
                .with_kind(kind)
                .with_size(size)
        })
        .collect();
    ResultSet::new(columns, rows)
}
