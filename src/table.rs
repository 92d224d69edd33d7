//! Tabular results
//!
//! A [`Table`] is a [`Schema`] plus rows of JSON records. Range fetches
//! return one, so an empty range still carries its declared columns.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

use crate::fetcher::Record;

static NULL: Value = Value::Null;

/// Logical type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Text
    String,
    /// Whole number
    Integer,
    /// Floating point number
    Float,
    /// true/false
    Boolean,
    /// Calendar date
    Date,
    /// Date and time
    DateTime,
    /// Anything else (nested values, or nothing seen yet)
    Json,
}

impl ColumnKind {
    /// Best guess for an undeclared column from one of its values
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::Bool(_) => Self::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => Self::Integer,
            Value::Number(_) => Self::Float,
            Value::String(_) => Self::String,
            Value::Null | Value::Array(_) | Value::Object(_) => Self::Json,
        }
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name as it appears in records
    pub name: String,
    /// Logical type
    pub kind: ColumnKind,
}

impl Column {
    /// Create a column
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered column list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Create a schema; later duplicates of a name are dropped
    pub fn new(columns: impl IntoIterator<Item = Column>) -> Self {
        let mut schema = Self::default();
        for column in columns {
            schema.push(column);
        }
        schema
    }

    fn push(&mut self, column: Column) {
        if !self.contains(&column.name) {
            self.columns.push(column);
        }
    }

    /// Columns in order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether a column of that name exists
    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the schema has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Append the columns of `other` not already present, keeping their order
    pub fn extend_from(&mut self, other: &Schema) {
        for column in &other.columns {
            self.push(column.clone());
        }
    }
}

impl FromIterator<Column> for Schema {
    fn from_iter<I: IntoIterator<Item = Column>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Schema plus rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    schema: Schema,
    rows: Vec<Record>,
}

impl Table {
    /// Table with `schema` and no rows
    pub fn empty(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Build a table from records
    ///
    /// The schema is `declared` followed by any other field names in the
    /// order they are first seen.
    pub fn from_records(declared: &Schema, records: Vec<Record>) -> Self {
        let mut schema = declared.clone();
        for record in &records {
            for (name, value) in record {
                if !schema.contains(name) {
                    schema.push(Column::new(name.clone(), ColumnKind::infer(value)));
                }
            }
        }
        Self {
            schema,
            rows: records,
        }
    }

    /// Concatenate tables in order; the schema is the union in first-seen order
    pub fn concat(declared: &Schema, parts: impl IntoIterator<Item = Table>) -> Self {
        let mut table = Self::empty(declared.clone());
        for part in parts {
            table.schema.extend_from(&part.schema);
            table.rows.extend(part.rows);
        }
        table
    }

    /// The schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Rows in order
    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Consume the table, returning its rows
    pub fn into_rows(self) -> Vec<Record> {
        self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, `Null` where a row lacks it
    pub fn column_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows.iter().map(move |row| row.get(name).unwrap_or(&NULL))
    }

    /// Stable sort by `keys`; keys not in the schema are ignored
    pub fn sort_by_keys<S: AsRef<str>>(&mut self, keys: &[S]) {
        let keys: Vec<&str> = keys
            .iter()
            .map(AsRef::as_ref)
            .filter(|key| self.schema.contains(key))
            .collect();
        if keys.is_empty() {
            return;
        }

        self.rows.sort_by(|a, b| {
            keys.iter()
                .map(|key| {
                    compare_values(a.get(*key).unwrap_or(&NULL), b.get(*key).unwrap_or(&NULL))
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });
    }

    /// Restrict every row to `declared`, filling missing columns with null
    pub fn conform_to(&mut self, declared: &Schema) {
        for row in &mut self.rows {
            let mut conformed = Record::new();
            for name in declared.names() {
                let value = row.remove(name).unwrap_or(Value::Null);
                conformed.insert(name.to_string(), value);
            }
            *row = conformed;
        }
        self.schema = declared.clone();
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Number(_) => 0,
        Value::String(_) => 1,
        Value::Bool(_) => 2,
        Value::Array(_) | Value::Object(_) => 3,
        Value::Null => 4,
    }
}

/// Total order on JSON values used for row sorting
///
/// Numbers compare numerically, strings lexicographically, `false < true`;
/// across types the order is number, string, bool, nested, and null last.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                x.cmp(&y)
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                x.cmp(&y)
            } else {
                let x = x.as_f64().unwrap_or(f64::NAN);
                let y = y.as_f64().unwrap_or(f64::NAN);
                x.total_cmp(&y)
            }
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Array(_), Value::Array(_))
        | (Value::Object(_), Value::Object(_))
        | (Value::Array(_), Value::Object(_))
        | (Value::Object(_), Value::Array(_)) => a.to_string().cmp(&b.to_string()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
