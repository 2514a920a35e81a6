//! Result set and value types for SQL Scientist.
//!
//! Defines the structures used to represent query results read back from the
//! database, plus the parameter bindings applied to both compared queries.

use base64::Engine as _;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{Result, ScientistError};

/// Column size denoting an unbounded (max-length) column.
pub const UNBOUNDED_SIZE: i32 = i32::MAX;

/// The kind of a tagged [`Value`], also used as a column's semantic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Null,
    Text,
    Integer,
    Decimal,
    DateTime,
    Binary,
    Other,
}

/// An exact decimal number kept in normalized textual form.
///
/// Normalization drops leading integer zeros, trailing fractional zeros and
/// the sign of zero, so numerically equal decimals compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Decimal(String);

impl Decimal {
    /// Parses a plain decimal literal (`-12.340`, `+7`, `.5`).
    ///
    /// Special values such as `NaN` and `Infinity` are kept verbatim.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        if matches!(
            s.to_ascii_lowercase().as_str(),
            "nan" | "inf" | "infinity" | "-inf" | "-infinity" | "+inf" | "+infinity"
        ) {
            return Some(Self(s.to_ascii_lowercase().replace("infinity", "inf")));
        }

        let (negative, body) = match s.as_bytes()[0] {
            b'-' => (true, &s[1..]),
            b'+' => (false, &s[1..]),
            _ => (false, s),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }

        let int_part = int_part.trim_start_matches('0');
        let frac_part = frac_part.trim_end_matches('0');
        let int_part = if int_part.is_empty() { "0" } else { int_part };
        let is_zero = int_part == "0" && frac_part.is_empty();

        let mut out = String::with_capacity(int_part.len() + frac_part.len() + 2);
        if negative && !is_zero {
            out.push('-');
        }
        out.push_str(int_part);
        if !frac_part.is_empty() {
            out.push('.');
            out.push_str(frac_part);
        }
        Some(Self(out))
    }

    /// Builds a decimal from a float using its shortest round-trip rendering.
    pub fn from_f64(v: f64) -> Self {
        if v.is_nan() {
            return Self("nan".to_string());
        }
        if v.is_infinite() {
            return Self(if v > 0.0 { "inf" } else { "-inf" }.to_string());
        }
        // Display for f64 never uses exponent notation
        Self::parse(&v.to_string()).unwrap_or_else(|| Self(v.to_string()))
    }

    /// Returns the normalized text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Approximates the decimal as a float, for drivers that bind floats only.
    pub fn to_f64(&self) -> Option<f64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Represents a single cell value read from, or bound to, a query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Character data.
    Text(String),

    /// Signed integer (up to i64).
    Integer(i64),

    /// Exact or floating point number.
    Decimal(Decimal),

    /// Date/time value; zoned timestamps are normalized to UTC.
    DateTime(NaiveDateTime),

    /// Binary data.
    Binary(Vec<u8>),

    /// Any other type, carried as the driver's textual rendering.
    Other(String),
}

impl Value {
    /// Returns the kind tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Text(_) => ValueKind::Text,
            Value::Integer(_) => ValueKind::Integer,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::Binary(_) => ValueKind::Binary,
            Value::Other(_) => ValueKind::Other,
        }
    }

    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Typed cell equality used by the row comparator.
    ///
    /// Two NULLs are equal, a NULL never equals a non-NULL, and values of
    /// different kinds are never equal (text `"1"` is not integer `1`).
    pub fn typed_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::Other(a), Value::Other(b)) => a == b,
            _ => false,
        }
    }

    /// Converts the value to a string for reports.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            Value::Binary(b) => format!(
                "base64:{}",
                base64::engine::general_purpose::STANDARD.encode(b)
            ),
            Value::Other(s) => s.clone(),
        }
    }

    /// Converts a JSON scalar into a value for parameter binding.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
            serde_json::Value::Bool(b) => Ok(Value::Other(b.to_string())),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Integer(i))
                } else {
                    Decimal::parse(&n.to_string())
                        .or_else(|| n.as_f64().map(Decimal::from_f64))
                        .map(Value::Decimal)
                        .ok_or_else(|| ScientistError::parameters(format!("Unsupported number {n}")))
                }
            }
            other => Err(ScientistError::parameters(format!(
                "Parameter values must be scalars, got {other}"
            ))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Decimal(Decimal::from_f64(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

/// Metadata about a column in a result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column display name (empty for unnamed expressions).
    pub name: String,

    /// Provider-native type name, e.g. `varchar`.
    pub native_type: String,

    /// Value kind the native type maps to.
    pub semantic_type: ValueKind,

    /// Whether the column admits NULL.
    pub nullable: bool,

    /// Declared size; [`UNBOUNDED_SIZE`] for max-length columns.
    pub size: i32,
}

impl ColumnInfo {
    /// Creates a column with the given name and native type.
    ///
    /// The column is nullable, unbounded and of kind `Other` until refined.
    pub fn new(name: impl Into<String>, native_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            native_type: native_type.into(),
            semantic_type: ValueKind::Other,
            nullable: true,
            size: UNBOUNDED_SIZE,
        }
    }

    /// Sets the semantic type.
    pub fn with_kind(mut self, kind: ValueKind) -> Self {
        self.semantic_type = kind;
        self
    }

    /// Sets nullability.
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Sets the declared size.
    pub fn with_size(mut self, size: i32) -> Self {
        self.size = size;
        self
    }

    /// Returns true if the column has no declared maximum size.
    pub fn is_unbounded(&self) -> bool {
        self.size == UNBOUNDED_SIZE
    }
}

/// A row of data from a result set.
pub type Row = Vec<Value>;

/// One table of rows produced by a single statement of a query batch.
///
/// Immutable after construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    columns: Vec<ColumnInfo>,
    rows: Vec<Row>,
}

impl ResultSet {
    /// Creates a result set from columns and rows.
    pub fn new(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Column metadata, in source order.
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// Rows, in source order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Returns true if the result set has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A single named binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An ordered set of uniquely named bindings applied identically to both queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParameterCollection {
    parameters: Vec<Parameter>,
}

impl ParameterCollection {
    /// Creates a collection, rejecting duplicate names.
    ///
    /// A leading `@` on a name is ignored, so `@id` and `id` collide.
    pub fn new(parameters: Vec<Parameter>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(parameters.len());
        let parameters: Vec<Parameter> = parameters
            .into_iter()
            .map(|p| Parameter {
                name: p.name.trim_start_matches('@').to_string(),
                value: p.value,
            })
            .collect();

        for p in &parameters {
            if p.name.is_empty() {
                return Err(ScientistError::parameters("Parameter names must not be empty"));
            }
            if !seen.insert(p.name.clone()) {
                return Err(ScientistError::parameters(format!(
                    "Duplicate parameter name '{}'",
                    p.name
                )));
            }
        }

        Ok(Self { parameters })
    }

    /// Creates an empty collection.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a collection from a JSON object mapping names to scalar values.
    pub fn from_json_object(json: &serde_json::Value) -> Result<Self> {
        let object = json.as_object().ok_or_else(|| {
            ScientistError::parameters(format!(
                "Each parameter collection must be a JSON object, got {json}"
            ))
        })?;

        let parameters = object
            .iter()
            .map(|(name, value)| Ok(Parameter::new(name.clone(), Value::from_json(value)?)))
            .collect::<Result<Vec<_>>>()?;

        Self::new(parameters)
    }

    /// Builds a collection from one row, naming each value after its column.
    pub fn from_row(columns: &[ColumnInfo], row: &Row) -> Result<Self> {
        let parameters = columns
            .iter()
            .zip(row)
            .map(|(column, value)| Parameter::new(column.name.clone(), value.clone()))
            .collect();
        Self::new(parameters)
    }

    /// Returns the bindings in order.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Returns the value bound to a name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}
