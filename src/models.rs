//! Data models for tables flowing through the pipeline
//!
//! This module contains the in-memory table representation shared by the
//! loader, the normalizer and the writer, plus the policy enums that the
//! configuration layer exposes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A single cell value.
///
/// Only integers and text are modelled; `Eq + Hash` is what lets whole rows
/// be compared for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing value (empty CSV cell)
    Null,
    /// Signed 64-bit integer
    Integer(i64),
    /// UTF-8 text
    Text(String),
}

impl Value {
    /// Parse a raw CSV cell the way a dataframe reader would: empty is null,
    /// a base-10 integer is an integer, anything else is text.
    #[must_use]
    pub fn infer(raw: &str) -> Self {
        if raw.is_empty() {
            Self::Null
        } else if let Ok(n) = raw.trim().parse::<i64>() {
            Self::Integer(n)
        } else {
            Self::Text(raw.to_string())
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Storage type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// 64-bit integer column
    Integer,
    /// Text column
    Text,
}

impl ColumnType {
    /// SQL type name used in `CREATE TABLE`
    #[must_use]
    pub const fn sql_type(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
        }
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name as it appears in the output relation
    pub name: String,
    /// Storage type
    pub column_type: ColumnType,
}

impl Column {
    /// Create a new column
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Untyped table as read from a CSV file: a header row plus string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    /// Column names from the header row
    pub headers: Vec<String>,
    /// Data rows, one string per header
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Position of a header, if present
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Assign a type to every column and convert the cells.
    ///
    /// A column is `Integer` when it has at least one non-empty cell and every
    /// non-empty cell parses as an integer.
    #[must_use]
    pub fn into_typed(self) -> Table {
        let column_types: Vec<ColumnType> = (0..self.headers.len())
            .map(|col| {
                let mut seen = false;
                let all_integer = self.rows.iter().all(|row| {
                    let cell = &row[col];
                    if cell.is_empty() {
                        return true;
                    }
                    seen = true;
                    cell.trim().parse::<i64>().is_ok()
                });
                if seen && all_integer {
                    ColumnType::Integer
                } else {
                    ColumnType::Text
                }
            })
            .collect();

        let rows = self
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(&column_types)
                    .map(|(cell, ty)| match ty {
                        ColumnType::Integer => Value::infer(&cell),
                        ColumnType::Text if cell.is_empty() => Value::Null,
                        ColumnType::Text => Value::Text(cell),
                    })
                    .collect()
            })
            .collect();

        let columns = self
            .headers
            .into_iter()
            .zip(column_types)
            .map(|(name, ty)| Column::new(name, ty))
            .collect();

        Table { columns, rows }
    }
}

/// Typed, row-major table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Ordered columns
    pub columns: Vec<Column>,
    /// Rows, each with exactly one value per column
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table, checking that every row matches the column count.
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> crate::error::Result<Self> {
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(crate::error::EtlError::Schema(format!(
                "row {i} has {} values but the table has {} columns",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Position of a column, if present
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Column names in order
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table holds no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value at (`row`, column `name`)
    #[must_use]
    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        let col = self.column_index(name)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }
}

/// What to do with a decoded category value outside {0, 1}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfRangePolicy {
    /// Keep the decoded digit as-is
    #[default]
    PassThrough,
    /// Map any value above 1 to 1
    Clamp,
    /// Remove rows that carry any out-of-range value
    DropRow,
    /// Fail the run
    Reject,
}

/// What to do when the output relation already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IfExists {
    /// Refuse to touch an existing relation
    #[default]
    Fail,
    /// Drop and recreate the relation
    Replace,
    /// Insert into the existing relation
    Append,
}

impl OutOfRangePolicy {
    /// Configuration spelling of the policy
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PassThrough => "pass_through",
            Self::Clamp => "clamp",
            Self::DropRow => "drop_row",
            Self::Reject => "reject",
        }
    }
}

impl IfExists {
    /// Configuration spelling of the policy
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::Replace => "replace",
            Self::Append => "append",
        }
    }
}

impl FromStr for OutOfRangePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "pass_through" => Ok(Self::PassThrough),
            "clamp" => Ok(Self::Clamp),
            "drop_row" => Ok(Self::DropRow),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "unknown out-of-range policy: {other} (expected pass_through, clamp, drop_row or reject)"
            )),
        }
    }
}

impl FromStr for IfExists {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "replace" => Ok(Self::Replace),
            "append" => Ok(Self::Append),
            other => Err(format!("unknown if-exists policy: {other} (expected fail, replace or append)")),
        }
    }
}

impl fmt::Display for OutOfRangePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for IfExists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
