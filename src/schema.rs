//! Output relation schema definitions
//!
//! This module provides the default names used for the output relation and
//! builds the SQL statements the writer runs against SQLite.

use crate::models::Column;

/// Output relation defaults
pub mod output {
    /// Default relation name
    pub const DEFAULT_TABLE: &str = "disaster_messages_tbl";
    /// Default join key shared by both inputs
    pub const DEFAULT_JOIN_KEY: &str = "id";
    /// Default name of the packed category column
    pub const DEFAULT_CATEGORY_COLUMN: &str = "categories";
    /// Default separator between packed category tokens
    pub const DEFAULT_TOKEN_DELIMITER: &str = ";";
}

/// Quote an identifier for SQLite, doubling embedded quotes.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `CREATE TABLE` statement for the given columns
#[must_use]
pub fn create_table_sql(table: &str, columns: &[Column]) -> String {
    let defs: Vec<String> = columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.column_type.sql_type()))
        .collect();
    format!("CREATE TABLE {} ({})", quote_ident(table), defs.join(", "))
}

/// `DROP TABLE` statement
#[must_use]
pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(table))
}

/// Parameterised `INSERT` statement naming every column explicitly
#[must_use]
pub fn insert_sql(table: &str, columns: &[Column]) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote_ident(&c.name)).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names.join(", "),
        placeholders.join(", ")
    )
}

/// Lookup of a table by name in the SQLite catalog
pub const TABLE_EXISTS_SQL: &str = "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)";
