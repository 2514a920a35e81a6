//! Column metadata comparison.

use super::summary::{ColumnDifference, SchemaComparison};
use crate::db::ColumnInfo;

/// Compares two column lists position by position.
///
/// Only the first `min(len1, len2)` columns are diffed. Names and native type
/// names are compared as exact strings and sizes verbatim, so `varchar` and
/// `nvarchar` differ and the unbounded sentinel is never normalized. A count
/// difference sets `column_count_mismatch` without adding per-index entries.
pub fn compare_schema(columns1: &[ColumnInfo], columns2: &[ColumnInfo]) -> SchemaComparison {
    let column_differences: Vec<ColumnDifference> = columns1
        .iter()
        .zip(columns2)
        .enumerate()
        .filter_map(|(index, (c1, c2))| {
            let diff = ColumnDifference {
                index,
                name_is_different: c1.name != c2.name,
                type_is_different: c1.native_type != c2.native_type,
                nullability_is_different: c1.nullable != c2.nullable,
                size_is_different: c1.size != c2.size,
            };
            let any = diff.name_is_different
                || diff.type_is_different
                || diff.nullability_is_different
                || diff.size_is_different;
            any.then_some(diff)
        })
        .collect();

    let column_count_mismatch = columns1.len() != columns2.len();

    SchemaComparison {
        columns_are_same: column_differences.is_empty() && !column_count_mismatch,
        column_count_mismatch,
        column_differences,
    }
}
