//! Tests that drive the `disaster-etl` binary end to end

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use rusqlite::Connection;
use tempfile::{tempdir, TempDir};

struct Inputs {
    dir: TempDir,
    messages: PathBuf,
    categories: PathBuf,
    database: PathBuf,
}

fn inputs() -> Inputs {
    let dir = tempdir().expect("Failed to create temp directory");
    let messages = dir.path().join("messages.csv");
    let categories = dir.path().join("categories.csv");
    fs::write(&messages, "id,message\n1,help\n2,food\n2,food\n").expect("Failed to write messages");
    fs::write(
        &categories,
        "id,categories\n1,related-1;request-0\n2,related-2;request-1\n",
    )
    .expect("Failed to write categories");
    let database = dir.path().join("DisasterResponse.db");
    Inputs {
        dir,
        messages,
        categories,
        database,
    }
}

fn disaster_etl(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_disaster-etl"))
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to run disaster-etl")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

fn run_default(inputs: &Inputs, extra: &[&str]) -> Output {
    let mut args = vec![
        path_arg(&inputs.messages),
        path_arg(&inputs.categories),
        path_arg(&inputs.database),
    ];
    args.extend_from_slice(extra);
    disaster_etl(inputs.dir.path(), &args)
}

fn count_rows(database: &Path, table: &str) -> i64 {
    let conn = Connection::open(database).expect("Failed to open database");
    conn.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| row.get(0))
        .expect("Failed to count rows")
}

#[test]
fn test_missing_arguments_exit_with_usage() {
    let dir = tempdir().expect("Failed to create temp directory");
    let output = disaster_etl(dir.path(), &["messages.csv"]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage:"), "stderr was: {stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn test_run_prints_progress_and_writes_table() {
    let inputs = inputs();
    let output = run_default(&inputs, &[]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let expected = format!(
        "Loading data...\n    MESSAGES: {}\n    CATEGORIES: {}\nCleaning data...\nSaving data...\n    DATABASE: {}\nCleaned data saved to database!\n",
        inputs.messages.display(),
        inputs.categories.display(),
        inputs.database.display()
    );
    assert_eq!(stdout, expected);
    assert_eq!(count_rows(&inputs.database, "disaster_messages_tbl"), 2);

    let conn = Connection::open(&inputs.database).expect("Failed to open database");
    let related: i64 = conn
        .query_row("SELECT related FROM disaster_messages_tbl WHERE id = 2", [], |row| row.get(0))
        .expect("Failed to read related");
    assert_eq!(related, 2);
}

#[test]
fn test_redirected_stderr_has_no_colour_codes() {
    let inputs = inputs();
    let output = run_default(&inputs, &["--log-level", "debug"]);

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.is_empty());
    assert!(!stderr.contains('\u{1b}'), "stderr was: {stderr}");
}

#[test]
fn test_second_run_fails_unless_replacing() {
    let inputs = inputs();
    assert!(run_default(&inputs, &[]).status.success());

    let second = run_default(&inputs, &[]);
    assert!(!second.status.success());
    let stderr = String::from_utf8_lossy(&second.stderr);
    assert!(stderr.contains("already exists"), "stderr was: {stderr}");

    let replaced = run_default(&inputs, &["--if-exists", "replace"]);
    assert!(replaced.status.success());
    assert_eq!(count_rows(&inputs.database, "disaster_messages_tbl"), 2);
}

#[test]
fn test_custom_table_name() {
    let inputs = inputs();
    let output = run_default(&inputs, &["--table", "Disasters"]);

    assert!(output.status.success());
    assert_eq!(count_rows(&inputs.database, "Disasters"), 2);
}

#[test]
fn test_reject_policy_exits_non_zero_without_writing() {
    let inputs = inputs();
    let output = run_default(&inputs, &["--out-of-range", "reject"]);

    assert!(!output.status.success());
    assert!(!inputs.database.exists());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Cleaning data..."));
    assert!(!stdout.contains("Saving data..."));
}

#[test]
fn test_report_json_follows_progress_lines() {
    let inputs = inputs();
    let output = run_default(&inputs, &["--report-json"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let start = stdout.find('{').expect("report JSON on stdout");
    assert!(stdout[..start].ends_with("Cleaned data saved to database!\n"));

    let report: serde_json::Value = serde_json::from_str(&stdout[start..]).expect("Failed to parse report");
    assert_eq!(report["rows_written"], 2);
    assert_eq!(report["joined_rows"], 3);
    assert_eq!(report["table_name"], "disaster_messages_tbl");
    assert_eq!(report["normalize"]["duplicates_removed"], 1);
    assert_eq!(report["normalize"]["out_of_range_values"], 2);
}

#[test]
fn test_print_config_needs_no_paths() {
    let dir = tempdir().expect("Failed to create temp directory");
    let output = disaster_etl(dir.path(), &["--print-config", "--if-exists", "append"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("table_name: disaster_messages_tbl"));
    assert!(stdout.contains("if_exists: append"));
    assert!(!dir.path().join("DisasterResponse.db").exists());
}
