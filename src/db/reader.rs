//! Result set reading.
//!
//! Adapters feed raw driver output (column metadata, then rows) into a
//! [`ResultSetReader`], which checks row widths and produces an immutable
//! [`ResultSet`].

use super::types::{ColumnInfo, ResultSet, Row};
use crate::error::{Result, ScientistError};
use tracing::{debug, warn};

/// Accumulates one statement's output into a [`ResultSet`].
#[derive(Debug, Default)]
pub struct ResultSetReader {
    columns: Option<Vec<ColumnInfo>>,
    rows: Vec<Row>,
}

impl ResultSetReader {
    /// Creates a reader with no schema yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplies column metadata. Later calls are ignored.
    pub fn set_columns(&mut self, columns: Vec<ColumnInfo>) {
        if self.columns.is_none() {
            self.columns = Some(columns);
        }
    }

    /// Appends a row. The row must be as wide as the schema.
    pub fn push_row(&mut self, row: Row) -> Result<()> {
        if let Some(columns) = &self.columns {
            if row.len() != columns.len() {
                return Err(ScientistError::internal(format!(
                    "Row {} has {} values but the result set has {} columns",
                    self.rows.len(),
                    row.len(),
                    columns.len()
                )));
            }
        }
        self.rows.push(row);
        Ok(())
    }

    /// Finishes reading.
    ///
    /// A result set whose schema was never supplied is treated as having zero
    /// columns. Rows read without a schema are dropped along with it, keeping
    /// every row as wide as the column list.
    pub fn finish(self) -> ResultSet {
        match self.columns {
            Some(columns) => {
                debug!(
                    "Read result set with {} columns and {} rows",
                    columns.len(),
                    self.rows.len()
                );
                ResultSet::new(columns, self.rows)
            }
            None => {
                if self.rows.is_empty() {
                    debug!("Result set has no column metadata; treating it as zero columns");
                } else {
                    warn!(
                        "Result set has no column metadata; discarding {} rows",
                        self.rows.len()
                    );
                }
                ResultSet::new(Vec::new(), Vec::new())
            }
        }
    }
}
