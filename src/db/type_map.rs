//! Static native type tables.
//!
//! Maps the type names reported by each driver to the value kind used for
//! comparison and to a declared column size.

use super::types::{ValueKind, UNBOUNDED_SIZE};

/// One entry of a native type table: (type name, kind, size in bytes).
type TypeEntry = (&'static str, ValueKind, i32);

/// PostgreSQL type names as reported by sqlx.
const POSTGRES_TYPES: &[TypeEntry] = &[
    ("BOOL", ValueKind::Other, 1),
    ("CHAR", ValueKind::Text, 1),
    ("INT2", ValueKind::Integer, 2),
    ("INT4", ValueKind::Integer, 4),
    ("INT8", ValueKind::Integer, 8),
    ("OID", ValueKind::Integer, 4),
    ("FLOAT4", ValueKind::Decimal, 4),
    ("FLOAT8", ValueKind::Decimal, 8),
    ("NUMERIC", ValueKind::Decimal, UNBOUNDED_SIZE),
    ("MONEY", ValueKind::Other, 8),
    ("TEXT", ValueKind::Text, UNBOUNDED_SIZE),
    ("VARCHAR", ValueKind::Text, UNBOUNDED_SIZE),
    ("BPCHAR", ValueKind::Text, UNBOUNDED_SIZE),
    ("NAME", ValueKind::Text, 64),
    ("CITEXT", ValueKind::Text, UNBOUNDED_SIZE),
    ("UNKNOWN", ValueKind::Text, UNBOUNDED_SIZE),
    ("BYTEA", ValueKind::Binary, UNBOUNDED_SIZE),
    ("TIMESTAMP", ValueKind::DateTime, 8),
    ("TIMESTAMPTZ", ValueKind::DateTime, 8),
    ("DATE", ValueKind::DateTime, 4),
    ("TIME", ValueKind::Other, 8),
    ("TIMETZ", ValueKind::Other, 12),
    ("INTERVAL", ValueKind::Other, 16),
    ("UUID", ValueKind::Other, 16),
    ("JSON", ValueKind::Other, UNBOUNDED_SIZE),
    ("JSONB", ValueKind::Other, UNBOUNDED_SIZE),
    ("VOID", ValueKind::Null, 0),
];

/// SQLite type names as reported by sqlx (declared or inferred affinity).
const SQLITE_TYPES: &[TypeEntry] = &[
    ("NULL", ValueKind::Null, 0),
    ("INTEGER", ValueKind::Integer, 8),
    ("INT", ValueKind::Integer, 8),
    ("BIGINT", ValueKind::Integer, 8),
    ("BOOLEAN", ValueKind::Integer, 8),
    ("REAL", ValueKind::Decimal, 8),
    ("NUMERIC", ValueKind::Decimal, UNBOUNDED_SIZE),
    ("TEXT", ValueKind::Text, UNBOUNDED_SIZE),
    ("BLOB", ValueKind::Binary, UNBOUNDED_SIZE),
    ("DATE", ValueKind::DateTime, UNBOUNDED_SIZE),
    ("TIME", ValueKind::Other, UNBOUNDED_SIZE),
    ("DATETIME", ValueKind::DateTime, UNBOUNDED_SIZE),
];

/// A lookup table from native type name to (kind, size).
#[derive(Debug, Clone, Copy)]
pub struct TypeMap {
    entries: &'static [TypeEntry],
}

impl TypeMap {
    /// The PostgreSQL table.
    pub const POSTGRES: TypeMap = TypeMap {
        entries: POSTGRES_TYPES,
    };

    /// The SQLite table.
    pub const SQLITE: TypeMap = TypeMap {
        entries: SQLITE_TYPES,
    };

    /// Looks up a native type name, case-insensitively.
    ///
    /// Array types (`INT4[]`) and unknown names map to `Other` / unbounded.
    pub fn lookup(&self, native_type: &str) -> (ValueKind, i32) {
        self.entries
            .iter()
            .find(|(name, _, _)| name.eq_ignore_ascii_case(native_type))
            .map(|(_, kind, size)| (*kind, *size))
            .unwrap_or((ValueKind::Other, UNBOUNDED_SIZE))
    }

    /// Looks up the kind only.
    pub fn kind_of(&self, native_type: &str) -> ValueKind {
        self.lookup(native_type).0
    }
}
