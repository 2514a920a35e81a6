//! Row data comparison.

use super::summary::{CellDifference, RowComparison, RowDifference};
use crate::db::Row;

/// Compares two row lists position by position.
///
/// Only the first `min(len1, len2)` rows are diffed, and within a row only
/// the shared column positions. Every mismatching cell is collected; a row
/// appears in `data_differences` only when it has at least one.
pub fn compare_rows(rows1: &[Row], rows2: &[Row]) -> RowComparison {
    let data_differences = rows1
        .iter()
        .zip(rows2)
        .enumerate()
        .filter_map(|(row_index, (r1, r2))| {
            let cells: Vec<CellDifference> = r1
                .iter()
                .zip(r2)
                .enumerate()
                .filter(|(_, (v1, v2))| !v1.typed_eq(v2))
                .map(|(column_index, _)| CellDifference { column_index })
                .collect();
            (!cells.is_empty()).then_some(RowDifference { row_index, cells })
        })
        .collect();

    RowComparison {
        row_count_mismatch: rows1.len() != rows2.len(),
        data_differences,
    }
}
