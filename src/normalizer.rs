//! Category decoding and normalization.
//!
//! The categories input packs every label of a record into one string of
//! `name-digit` tokens, e.g. `related-1;request-0;offer-0`. This module turns
//! that column into one integer column per category name and removes
//! full-row duplicates.
//!
//! The category layout is derived from the data itself. Every row is parsed
//! and must carry the same ordered list of names; the first disagreement
//! fails the run instead of silently trusting the first row. Decoded values
//! carry their row key and are merged back by key, never by position.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{EtlError, Result};
use crate::models::{Column, ColumnType, OutOfRangePolicy, Table, Value};
use crate::schema::output;

/// Options controlling how the packed category column is decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Name of the packed category column
    pub category_column: String,
    /// Separator between tokens
    pub token_delimiter: String,
    /// Column identifying a record, carried through decoding
    pub key_column: String,
    /// Handling of decoded values outside {0, 1}
    pub out_of_range: OutOfRangePolicy,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            category_column: output::DEFAULT_CATEGORY_COLUMN.to_string(),
            token_delimiter: output::DEFAULT_TOKEN_DELIMITER.to_string(),
            key_column: output::DEFAULT_JOIN_KEY.to_string(),
            out_of_range: OutOfRangePolicy::default(),
        }
    }
}

/// Split a `name-d` token into its name and decoded digit.
///
/// The name is everything but the last two characters; the value is the last
/// character read as a base-10 digit. Digits other than 0 and 1 are returned
/// unchanged.
pub fn parse_token(token: &str) -> std::result::Result<(&str, i64), String> {
    let mut chars = token.char_indices().rev();
    let (_, last) = chars.next().ok_or_else(|| "empty token".to_string())?;
    let (name_end, _) = chars
        .next()
        .ok_or_else(|| "token is too short to hold a name and a value".to_string())?;
    let digit = last
        .to_digit(10)
        .ok_or_else(|| format!("trailing character {last:?} is not a decimal digit"))?;
    Ok((&token[..name_end], i64::from(digit)))
}

/// Ordered category names derived from the packed column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategorySchema {
    names: Vec<String>,
}

impl CategorySchema {
    /// Build a schema from explicit names
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Category names in token order
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of categories
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when no categories were derived
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn matches(&self, names: &[&str]) -> bool {
        self.names.len() == names.len() && self.names.iter().zip(names).all(|(a, b)| a == b)
    }

    fn check_unique(&self) -> Result<()> {
        let mut seen = HashSet::new();
        match self.names.iter().find(|n| !seen.insert(n.as_str())) {
            Some(dup) => Err(EtlError::Schema(format!("category {dup:?} appears more than once"))),
            None => Ok(()),
        }
    }
}

/// Decoded category values for one row of the joined table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRow {
    /// Ordinal of the source row in the joined table
    pub row: usize,
    /// Join-key value of the source row
    pub key: Value,
    /// One value per schema entry, in schema order
    pub values: Vec<i64>,
}

/// Parse the packed column of every row.
///
/// Returns the derived schema and the decoded values keyed by row.
pub fn decode_rows(table: &Table, options: &NormalizeOptions) -> Result<(CategorySchema, Vec<DecodedRow>)> {
    let cat_idx = table
        .column_index(&options.category_column)
        .ok_or_else(|| EtlError::Schema(format!("no {:?} column to decode", options.category_column)))?;
    let key_idx = table
        .column_index(&options.key_column)
        .ok_or_else(|| EtlError::Schema(format!("no {:?} key column", options.key_column)))?;

    let mut schema: Option<CategorySchema> = None;
    let mut decoded = Vec::with_capacity(table.len());

    for (i, row) in table.rows.iter().enumerate() {
        let key = &row[key_idx];
        let packed = match &row[cat_idx] {
            Value::Null => {
                return Err(EtlError::MalformedCategory {
                    row: i,
                    key: key.to_string(),
                    token: String::new(),
                    reason: "category string is missing".to_string(),
                })
            }
            other => other.to_string(),
        };

        let mut names = Vec::new();
        let mut values = Vec::new();
        for token in packed.split(options.token_delimiter.as_str()) {
            let (name, value) = parse_token(token).map_err(|reason| EtlError::MalformedCategory {
                row: i,
                key: key.to_string(),
                token: token.to_string(),
                reason,
            })?;
            names.push(name);
            values.push(value);
        }

        if let Some(expected) = &schema {
            if !expected.matches(&names) {
                return Err(EtlError::Schema(format!(
                    "row {i} ({key}) has categories [{}] but earlier rows have [{}]",
                    names.join(", "),
                    expected.names().join(", ")
                )));
            }
        } else {
            let derived = CategorySchema::new(names.iter().map(ToString::to_string).collect());
            derived.check_unique()?;
            debug!(categories = derived.len(), "Derived category schema from row {}", i);
            schema = Some(derived);
        }

        decoded.push(DecodedRow {
            row: i,
            key: key.clone(),
            values,
        });
    }

    Ok((schema.unwrap_or_default(), decoded))
}

/// Replace the packed column with one integer column per category.
///
/// Each base row is paired with the decoded row carrying the same ordinal,
/// and the key values must agree. A base row without a decoded counterpart,
/// a key mismatch, or leftover decoded rows are schema errors.
pub fn merge_decoded(
    base: Table,
    options: &NormalizeOptions,
    schema: &CategorySchema,
    decoded: Vec<DecodedRow>,
) -> Result<Table> {
    let cat_idx = base
        .column_index(&options.category_column)
        .ok_or_else(|| EtlError::Schema(format!("no {:?} column to replace", options.category_column)))?;
    let key_idx = base
        .column_index(&options.key_column)
        .ok_or_else(|| EtlError::Schema(format!("no {:?} key column", options.key_column)))?;

    let mut columns: Vec<Column> = base
        .columns
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != cat_idx)
        .map(|(_, c)| c.clone())
        .collect();

    let existing: HashSet<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    if let Some(clash) = schema.names().iter().find(|n| existing.contains(n.as_str())) {
        return Err(EtlError::Schema(format!(
            "category {clash:?} collides with an existing column"
        )));
    }
    columns.extend(schema.names().iter().map(|n| Column::new(n.clone(), ColumnType::Integer)));

    let mut by_row: HashMap<usize, DecodedRow> = decoded.into_iter().map(|d| (d.row, d)).collect();

    let mut rows = Vec::with_capacity(base.rows.len());
    for (i, row) in base.rows.into_iter().enumerate() {
        let entry = by_row
            .remove(&i)
            .ok_or_else(|| EtlError::Schema(format!("row {i} has no decoded categories")))?;
        if entry.key != row[key_idx] {
            return Err(EtlError::Schema(format!(
                "decoded categories for row {i} belong to key {} but the row has key {}",
                entry.key, row[key_idx]
            )));
        }
        if entry.values.len() != schema.len() {
            return Err(EtlError::Schema(format!(
                "row {i} decoded {} categories, expected {}",
                entry.values.len(),
                schema.len()
            )));
        }

        let mut merged: Vec<Value> = row
            .into_iter()
            .enumerate()
            .filter(|(j, _)| *j != cat_idx)
            .map(|(_, v)| v)
            .collect();
        merged.extend(entry.values.into_iter().map(Value::Integer));
        rows.push(merged);
    }

    if !by_row.is_empty() {
        let mut orphans: Vec<usize> = by_row.into_keys().collect();
        orphans.sort_unstable();
        return Err(EtlError::Schema(format!(
            "decoded categories for rows {orphans:?} have no matching base row"
        )));
    }

    Table::new(columns, rows)
}

/// Remove rows equal across every column to an earlier row, keeping the
/// first occurrence. Returns the number of rows removed.
pub fn dedup_rows(rows: &mut Vec<Vec<Value>>) -> usize {
    let before = rows.len();
    let mut seen: HashSet<Vec<Value>> = HashSet::with_capacity(before);
    rows.retain(|row| seen.insert(row.clone()));
    before - rows.len()
}

/// Counters describing one normalization pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    /// Derived category names in column order
    pub categories: Vec<String>,
    /// Rows entering the normalizer
    pub rows_in: usize,
    /// Full-row duplicates removed
    pub duplicates_removed: usize,
    /// Decoded values outside {0, 1}
    pub out_of_range_values: usize,
    /// Values mapped to 1 under `clamp`
    pub values_clamped: usize,
    /// Rows removed under `drop_row`
    pub rows_dropped: usize,
    /// Rows leaving the normalizer
    pub rows_out: usize,
}

/// Decodes the packed category column and deduplicates the result
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    options: NormalizeOptions,
}

impl Normalizer {
    /// Create a normalizer with the given options
    #[must_use]
    pub const fn new(options: NormalizeOptions) -> Self {
        Self { options }
    }

    /// Options in use
    #[must_use]
    pub const fn options(&self) -> &NormalizeOptions {
        &self.options
    }

    /// Run the full normalization on a joined table.
    pub fn normalize(&self, table: Table) -> Result<(Table, NormalizeReport)> {
        let rows_in = table.len();
        let (schema, mut decoded) = decode_rows(&table, &self.options)?;

        let mut report = NormalizeReport {
            categories: schema.names().to_vec(),
            rows_in,
            ..NormalizeReport::default()
        };

        self.apply_out_of_range(&schema, &mut decoded, &mut report)?;

        let mut merged = merge_decoded(table, &self.options, &schema, decoded)?;
        report.duplicates_removed = dedup_rows(&mut merged.rows);

        if self.options.out_of_range == OutOfRangePolicy::DropRow && !schema.is_empty() {
            let first_category = merged.columns.len() - schema.len();
            let before = merged.rows.len();
            merged
                .rows
                .retain(|row| row[first_category..].iter().all(|v| matches!(v, Value::Integer(0 | 1))));
            report.rows_dropped = before - merged.rows.len();
        }

        report.rows_out = merged.len();
        info!(
            categories = schema.len(),
            rows_in = report.rows_in,
            rows_out = report.rows_out,
            duplicates_removed = report.duplicates_removed,
            "Normalized category column {:?}",
            self.options.category_column
        );
        Ok((merged, report))
    }

    fn apply_out_of_range(
        &self,
        schema: &CategorySchema,
        decoded: &mut [DecodedRow],
        report: &mut NormalizeReport,
    ) -> Result<()> {
        for entry in decoded.iter_mut() {
            for (name, value) in schema.names().iter().zip(entry.values.iter_mut()) {
                if (0..=1).contains(&*value) {
                    continue;
                }
                report.out_of_range_values += 1;
                match self.options.out_of_range {
                    OutOfRangePolicy::PassThrough | OutOfRangePolicy::DropRow => {}
                    OutOfRangePolicy::Clamp => {
                        *value = 1;
                        report.values_clamped += 1;
                    }
                    OutOfRangePolicy::Reject => {
                        return Err(EtlError::OutOfRangeCategory {
                            row: entry.row,
                            key: entry.key.to_string(),
                            column: name.clone(),
                            value: *value,
                        });
                    }
                }
            }
        }

        if report.out_of_range_values > 0 {
            warn!(
                count = report.out_of_range_values,
                policy = %self.options.out_of_range,
                "Found category values outside 0/1"
            );
        }
        Ok(())
    }
}
