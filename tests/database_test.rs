use disaster_etl::db::{save_table, SqliteSink, TableSink, WriteOptions};
use disaster_etl::error::EtlError;
use disaster_etl::models::{Column, ColumnType, IfExists, Table, Value};
use rusqlite::Connection;
use tempfile::tempdir;

fn cleaned(rows: &[(i64, &str, i64)]) -> Table {
    Table::new(
        vec![
            Column::new("id", ColumnType::Integer),
            Column::new("message", ColumnType::Text),
            Column::new("related", ColumnType::Integer),
        ],
        rows.iter()
            .map(|(id, msg, related)| vec![Value::Integer(*id), Value::from(*msg), Value::Integer(*related)])
            .collect(),
    )
    .expect("Failed to build table")
}

fn options(if_exists: IfExists) -> WriteOptions {
    WriteOptions {
        if_exists,
        ..WriteOptions::default()
    }
}

#[test]
fn test_database_creation_and_column_types() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("DisasterResponse.db");

    let written = save_table(&cleaned(&[(1, "help", 1)]), &db_path, &WriteOptions::default())
        .expect("Failed to write table");
    assert_eq!(written, 1);

    let conn = Connection::open(&db_path).expect("Failed to open database");
    let types: Vec<(String, String)> = conn
        .prepare("PRAGMA table_info(disaster_messages_tbl)")
        .expect("Failed to prepare")
        .query_map([], |row| Ok((row.get(1)?, row.get(2)?)))
        .expect("Failed to query")
        .collect::<Result<_, _>>()
        .expect("Failed to read rows");
    assert_eq!(
        types,
        vec![
            ("id".to_string(), "INTEGER".to_string()),
            ("message".to_string(), "TEXT".to_string()),
            ("related".to_string(), "INTEGER".to_string()),
        ]
    );

    let stored: String = conn
        .query_row("SELECT typeof(related) FROM disaster_messages_tbl", [], |row| row.get(0))
        .expect("Failed to read value type");
    assert_eq!(stored, "integer");
}

#[test]
fn test_existing_table_fails_by_default() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("out.db");

    save_table(&cleaned(&[(1, "help", 1)]), &db_path, &WriteOptions::default()).expect("first write");
    let err = save_table(&cleaned(&[(2, "food", 0)]), &db_path, &WriteOptions::default()).unwrap_err();
    assert!(matches!(err, EtlError::RelationExists { .. }));

    // the failed run leaves the earlier contents alone
    let sink = SqliteSink::open(&db_path).expect("Failed to open sink");
    assert_eq!(sink.row_count("disaster_messages_tbl").expect("count"), 1);
}

#[test]
fn test_replace_recreates_table() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("out.db");

    save_table(&cleaned(&[(1, "help", 1), (2, "food", 0)]), &db_path, &WriteOptions::default())
        .expect("first write");
    save_table(&cleaned(&[(3, "water", 1)]), &db_path, &options(IfExists::Replace)).expect("replace");

    let sink = SqliteSink::open(&db_path).expect("Failed to open sink");
    assert_eq!(sink.row_count("disaster_messages_tbl").expect("count"), 1);
}

#[test]
fn test_append_adds_rows() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("out.db");

    let mut sink = SqliteSink::open(&db_path).expect("Failed to open sink");
    sink.write_table(&cleaned(&[(1, "help", 1)]), &WriteOptions::default())
        .expect("first write");
    sink.write_table(&cleaned(&[(2, "food", 0)]), &options(IfExists::Append))
        .expect("append");
    assert_eq!(sink.row_count("disaster_messages_tbl").expect("count"), 2);
}

#[test]
fn test_append_with_unknown_column_fails() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("out.db");

    let mut sink = SqliteSink::open(&db_path).expect("Failed to open sink");
    sink.write_table(&cleaned(&[(1, "help", 1)]), &WriteOptions::default())
        .expect("first write");

    let wider = Table::new(
        vec![
            Column::new("id", ColumnType::Integer),
            Column::new("offer", ColumnType::Integer),
        ],
        vec![vec![Value::Integer(2), Value::Integer(0)]],
    )
    .expect("Failed to build table");
    let err = sink.write_table(&wider, &options(IfExists::Append)).unwrap_err();
    assert!(matches!(err, EtlError::Schema(_)));
}

#[test]
fn test_custom_table_name() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("out.db");

    let opts = WriteOptions {
        table_name: "Disasters".to_string(),
        if_exists: IfExists::Fail,
    };
    save_table(&cleaned(&[(1, "help", 1)]), &db_path, &opts).expect("write");

    let sink = SqliteSink::open(&db_path).expect("Failed to open sink");
    assert!(sink.table_exists("Disasters").expect("lookup"));
    assert!(!sink.table_exists("disaster_messages_tbl").expect("lookup"));
}

#[test]
fn test_directory_destination_is_unwritable() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let err = SqliteSink::open(temp_dir.path()).err().expect("expected an error");
    assert!(matches!(err, EtlError::DestinationUnwritable { .. }));
}
