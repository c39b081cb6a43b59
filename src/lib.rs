//! Disaster ETL - Message Category Normalization
//!
//! A Rust library that turns a messages file and a packed categories file
//! into one flat, labeled table stored in SQLite.
//!
//! # Features
//!
//! - Inner join of two CSV inputs on a shared key
//! - Decoding of `name-digit;name-digit` category strings into integer columns
//! - Full-row deduplication
//! - Configurable handling of non-binary labels and of existing output tables

/// Configuration management
pub mod config;
/// SQLite output and the table sink abstraction
pub mod db;
/// Error types
pub mod error;
/// CSV loading and joins
pub mod loader;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Category decoding and deduplication
pub mod normalizer;
/// Stage orchestration
pub mod pipeline;
/// Output schema definitions and SQL builders
pub mod schema;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use db::{SqliteSink, TableSink, WriteOptions};
pub use error::{EtlError, Result};
pub use models::{Column, ColumnType, IfExists, OutOfRangePolicy, Table, Value};
pub use normalizer::{NormalizeOptions, NormalizeReport, Normalizer};
pub use pipeline::{LoadStats, Pipeline, PipelineReport, Stage};
