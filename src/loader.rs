//! CSV loading and key joins.
//!
//! Both inputs are headered, comma-separated files. They are read as raw
//! string tables, inner-joined on a shared key and only then typed, so the
//! join compares exactly what the files contain.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::Path;

use csv::ReaderBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{EtlError, Result};
use crate::models::{RawTable, Table};

/// Suffix given to a left-side column whose name also appears on the right
pub const LEFT_SUFFIX: &str = "_x";
/// Suffix given to a right-side column whose name also appears on the left
pub const RIGHT_SUFFIX: &str = "_y";

/// Read a headered CSV file into a raw table.
///
/// # Errors
///
/// `SourceNotFound` if the file cannot be opened, `Csv` for malformed
/// records, `Schema` for duplicate header names.
pub fn load_csv(path: &Path) -> Result<RawTable> {
    let file = File::open(path).map_err(|source| EtlError::SourceNotFound {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
    let csv_err = |source| EtlError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let headers: Vec<String> = reader.headers().map_err(csv_err)?.iter().map(ToString::to_string).collect();

    let mut seen = HashSet::new();
    if let Some(dup) = headers.iter().find(|h| !seen.insert(h.as_str())) {
        return Err(EtlError::Schema(format!("duplicate column {dup:?} in {}", path.display())));
    }

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        rows.push(record.iter().map(ToString::to_string).collect());
    }

    debug!(path = %path.display(), columns = headers.len(), rows = rows.len(), "Loaded CSV");
    Ok(RawTable { headers, rows })
}

/// Inner-join two raw tables on `key`.
///
/// Output order follows the left table; each left row is followed by its
/// matches in right-table order, so duplicate keys yield the cross product.
/// The key appears once, at its left-side position. Keys are compared with
/// surrounding whitespace removed, the same way cells are typed afterwards.
pub fn inner_join(left: &RawTable, right: &RawTable, key: &str) -> Result<RawTable> {
    let left_key = left
        .column_index(key)
        .ok_or_else(|| EtlError::Schema(format!("left input has no {key:?} column")))?;
    let right_key = right
        .column_index(key)
        .ok_or_else(|| EtlError::Schema(format!("right input has no {key:?} column")))?;

    let right_names: HashSet<&str> = right.headers.iter().map(String::as_str).collect();
    let left_names: HashSet<&str> = left.headers.iter().map(String::as_str).collect();

    let mut headers: Vec<String> = left
        .headers
        .iter()
        .map(|h| {
            if h != key && right_names.contains(h.as_str()) {
                format!("{h}{LEFT_SUFFIX}")
            } else {
                h.clone()
            }
        })
        .collect();
    let right_cols: Vec<usize> = (0..right.headers.len()).filter(|&i| i != right_key).collect();
    headers.extend(right_cols.iter().map(|&i| {
        let h = &right.headers[i];
        if left_names.contains(h.as_str()) {
            format!("{h}{RIGHT_SUFFIX}")
        } else {
            h.clone()
        }
    }));

    let mut index: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, row) in right.rows.iter().enumerate() {
        index.entry(row[right_key].trim()).or_default().push(i);
    }

    let mut rows = Vec::new();
    for left_row in &left.rows {
        let Some(matches) = index.get(left_row[left_key].trim()) else {
            continue;
        };
        for &m in matches {
            let right_row = &right.rows[m];
            let mut row = left_row.clone();
            row.extend(right_cols.iter().map(|&i| right_row[i].clone()));
            rows.push(row);
        }
    }

    Ok(RawTable { headers, rows })
}

/// Read a CSV file that must carry the `key` column.
pub fn load_keyed(path: &Path, key: &str) -> Result<RawTable> {
    let table = load_csv(path)?;
    if table.column_index(key).is_none() {
        return Err(EtlError::Schema(format!("{} has no {key:?} column", path.display())));
    }
    Ok(table)
}

/// Counts produced by the load stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    /// Rows in the messages input
    pub messages_rows: usize,
    /// Rows in the categories input
    pub categories_rows: usize,
    /// Rows after the join
    pub joined_rows: usize,
}

/// Load the messages and categories files and join them on `key`.
pub fn load_data(messages_path: &Path, categories_path: &Path, key: &str) -> Result<(Table, LoadStats)> {
    let messages = load_keyed(messages_path, key)?;
    let categories = load_keyed(categories_path, key)?;

    let joined = inner_join(&messages, &categories, key)?;
    let stats = LoadStats {
        messages_rows: messages.rows.len(),
        categories_rows: categories.rows.len(),
        joined_rows: joined.rows.len(),
    };
    info!(
        messages = stats.messages_rows,
        categories = stats.categories_rows,
        joined = stats.joined_rows,
        "Joined inputs on {}",
        key
    );
    Ok((joined.into_typed(), stats))
}
