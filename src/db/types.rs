//! Query result types for sql-console.
//!
//! Defines the raw result a session hands back and the normalized
//! [`QueryResult`] the executor returns to callers.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Normalized result of a successfully executed statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    /// Command tag of the statement (e.g. `SELECT`), empty if unknown.
    pub command: String,

    /// Column names in the order the database returned them.
    pub columns: Vec<String>,

    /// Rows keyed by column name.
    pub rows: Vec<Row>,

    /// Rows returned or affected, depending on the statement.
    pub row_count: u64,

    /// Field descriptors, one per column.
    pub fields: Vec<FieldDescriptor>,
}

/// Column metadata as reported by the driver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Column name.
    pub name: String,

    /// Database type name (e.g. `INT4`, `TEXT`).
    pub type_name: String,

    /// Zero-based position in the result set.
    pub ordinal: usize,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, ordinal: usize) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            ordinal,
        }
    }
}

/// Result as handed back by a session, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResult {
    /// Command tag, if the session could determine one.
    pub command: Option<String>,

    /// Field descriptors of the result set.
    pub fields: Vec<FieldDescriptor>,

    /// Positional row values, aligned with `fields`.
    pub rows: Vec<Vec<Value>>,

    /// Row count, if the driver reported one.
    pub row_count: Option<u64>,
}

impl RawResult {
    /// Converts into a [`QueryResult`].
    ///
    /// Every row ends up with exactly one entry per distinct column name.
    /// Missing trailing values become `Null`, surplus values are dropped.
    /// When column names repeat, the rightmost value wins.
    pub fn normalize(self) -> QueryResult {
        let columns: Vec<String> = self.fields.iter().map(|f| f.name.clone()).collect();

        let rows = self
            .rows
            .into_iter()
            .map(|values| {
                let mut values = values.into_iter();
                let mut row = Row::with_capacity(columns.len());
                for column in &columns {
                    row.insert(column.clone(), values.next().unwrap_or(Value::Null));
                }
                row
            })
            .collect();

        QueryResult {
            command: self.command.unwrap_or_default(),
            columns,
            rows,
            row_count: self.row_count.unwrap_or(0),
            fields: self.fields,
        }
    }
}

/// A row of data keyed by column name, in column order.
///
/// Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    entries: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Sets the value for a column, replacing an earlier value under the same name.
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        let column = column.into();
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Column names present in this row.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Represents a single SQL scalar from a query result.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text, and the text rendering of types without a narrower variant.
    Text(String),

    /// Point in time, normalized to UTC.
    Timestamp(DateTime<Utc>),

    /// Binary data.
    Bytes(Vec<u8>),
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Timestamp(ts) => {
                serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Bytes(b) => serializer.serialize_str(&STANDARD.encode(b)),
        }
    }
}

// Conversion implementations for common types
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
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
