//! SQLite persistence for the normalized table.
//!
//! The writer creates (or replaces, or appends to) a single named relation in
//! a SQLite file. Column types follow the in-memory column types.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OpenFlags, ToSql};
use tracing::{debug, info};

use crate::error::{EtlError, Result};
use crate::models::{IfExists, Table, Value};
use crate::schema::{self, output, quote_ident};

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Self::Integer(n) => ToSqlOutput::Borrowed(ValueRef::Integer(*n)),
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// Options for writing the output relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Relation name
    pub table_name: String,
    /// Behaviour when the relation already exists
    pub if_exists: IfExists,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            table_name: output::DEFAULT_TABLE.to_string(),
            if_exists: IfExists::default(),
        }
    }
}

/// Destination for a finished table
pub trait TableSink {
    /// Persist every row of `table`; returns the number of rows written.
    fn write_table(&mut self, table: &Table, options: &WriteOptions) -> Result<usize>;
}

/// Table sink backed by a SQLite file
pub struct SqliteSink {
    conn: Connection,
    path: PathBuf,
}

impl SqliteSink {
    /// Open or create the SQLite file at `path`.
    ///
    /// The parent directory must already exist; nothing is created besides
    /// the database file itself.
    pub fn open(path: &Path) -> Result<Self> {
        let unwritable = |reason: String| EtlError::DestinationUnwritable {
            path: path.to_path_buf(),
            reason,
        };

        if path.as_os_str().is_empty() {
            return Err(unwritable("empty path".to_string()));
        }
        if path.is_dir() {
            return Err(unwritable("path is a directory".to_string()));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                return Err(unwritable(format!("directory {} does not exist", parent.display())));
            }
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
        let conn = Connection::open_with_flags(path, flags).map_err(|e| unwritable(e.to_string()))?;
        // Opening is lazy; take the write lock once so permission problems surface here.
        conn.execute_batch("BEGIN IMMEDIATE; ROLLBACK;")
            .map_err(|e| unwritable(e.to_string()))?;

        debug!(path = %path.display(), "Opened destination database");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Destination path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Underlying connection, for inspection
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Whether a relation named `table` exists
    pub fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(self.conn.query_row(schema::TABLE_EXISTS_SQL, params![table], |row| row.get(0))?)
    }

    /// Column names of an existing relation, in declaration order
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// Number of rows currently stored in `table`
    pub fn row_count(&self, table: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

impl TableSink for SqliteSink {
    fn write_table(&mut self, table: &Table, options: &WriteOptions) -> Result<usize> {
        let name = options.table_name.as_str();
        let exists = self.table_exists(name)?;

        if exists {
            match options.if_exists {
                IfExists::Fail => {
                    return Err(EtlError::RelationExists {
                        table: name.to_string(),
                        path: self.path.clone(),
                    });
                }
                IfExists::Append => {
                    let present: HashSet<String> = self.table_columns(name)?.into_iter().collect();
                    if let Some(missing) = table.columns.iter().find(|c| !present.contains(&c.name)) {
                        return Err(EtlError::Schema(format!(
                            "cannot append: table {name:?} has no column {:?}",
                            missing.name
                        )));
                    }
                }
                IfExists::Replace => {}
            }
        }

        let tx = self.conn.transaction()?;
        if exists && options.if_exists == IfExists::Replace {
            tx.execute_batch(&schema::drop_table_sql(name))?;
        }
        if !exists || options.if_exists == IfExists::Replace {
            tx.execute_batch(&schema::create_table_sql(name, &table.columns))?;
        }

        let mut written = 0;
        {
            let mut stmt = tx.prepare(&schema::insert_sql(name, &table.columns))?;
            for row in &table.rows {
                stmt.execute(rusqlite::params_from_iter(row.iter()))?;
                written += 1;
            }
        }
        tx.commit()?;

        info!(
            table = name,
            rows = written,
            mode = %options.if_exists,
            path = %self.path.display(),
            "Wrote output table"
        );
        Ok(written)
    }
}

/// Open `path` and write `table` into it.
pub fn save_table(table: &Table, path: &Path, options: &WriteOptions) -> Result<usize> {
    let mut sink = SqliteSink::open(path)?;
    sink.write_table(table, options)
}
