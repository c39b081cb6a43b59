//! Error types for the disaster-etl library.
//!
//! This module provides custom error types using `thiserror` so each pipeline
//! stage can report exactly what went wrong and where.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading, normalizing or writing a dataset.
#[derive(Error, Debug)]
pub enum EtlError {
    /// An input file could not be located or opened
    #[error("Source not found: {}: {source}", .path.display())]
    SourceNotFound {
        /// Path that was requested
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// A CSV record could not be parsed
    #[error("CSV error in {}: {source}", .path.display())]
    Csv {
        /// File being read
        path: PathBuf,
        /// Underlying parser failure
        #[source]
        source: csv::Error,
    },

    /// Structural problem with a table: missing key, disagreeing category layout, etc.
    #[error("Schema error: {0}")]
    Schema(String),

    /// A category token whose value is not a single trailing decimal digit
    #[error("Malformed category token {token:?} in row {row} ({key}): {reason}")]
    MalformedCategory {
        /// Zero-based row ordinal in the joined table
        row: usize,
        /// Join-key value of that row, rendered as text
        key: String,
        /// Offending token
        token: String,
        /// Why it was rejected
        reason: String,
    },

    /// A decoded category value outside {0, 1} under the `reject` policy
    #[error("Category {column:?} has out-of-range value {value} in row {row} ({key})")]
    OutOfRangeCategory {
        /// Zero-based row ordinal in the joined table
        row: usize,
        /// Join-key value of that row, rendered as text
        key: String,
        /// Category column name
        column: String,
        /// Decoded value
        value: i64,
    },

    /// The destination store cannot be created or opened for writing
    #[error("Destination not writable: {}: {reason}", .path.display())]
    DestinationUnwritable {
        /// Destination path
        path: PathBuf,
        /// Why it could not be used
        reason: String,
    },

    /// The target relation exists and the if-exists policy is `fail`
    #[error("Table {table:?} already exists in {}", .path.display())]
    RelationExists {
        /// Relation name
        table: String,
        /// Destination path
        path: PathBuf,
    },

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience type alias for Result with `EtlError`
pub type Result<T> = std::result::Result<T, EtlError>;

impl EtlError {
    /// Short stable label used for metrics and structured logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SourceNotFound { .. } => "source_not_found",
            Self::Csv { .. } => "csv",
            Self::Schema(_) => "schema",
            Self::MalformedCategory { .. } => "malformed_category",
            Self::OutOfRangeCategory { .. } => "out_of_range_category",
            Self::DestinationUnwritable { .. } => "destination_unwritable",
            Self::RelationExists { .. } => "relation_exists",
            Self::Database(_) => "database",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}
