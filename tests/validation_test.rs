//! Comprehensive unit tests for validation.rs module

use std::path::Path;

use disaster_etl::validation::InputValidator;

#[test]
fn test_validate_identifier_valid() {
    assert!(InputValidator::validate_identifier("disaster_messages_tbl").is_ok());
    assert!(InputValidator::validate_identifier("_private").is_ok());
    assert!(InputValidator::validate_identifier("Disasters2").is_ok());
}

#[test]
fn test_validate_identifier_empty() {
    assert!(InputValidator::validate_identifier("").is_err());
}

#[test]
fn test_validate_identifier_leading_digit() {
    assert!(InputValidator::validate_identifier("1table").is_err());
}

#[test]
fn test_validate_identifier_injection() {
    assert!(InputValidator::validate_identifier("t; DROP TABLE x").is_err());
    assert!(InputValidator::validate_identifier("t\"x").is_err());
}

#[test]
fn test_validate_identifier_reserved_prefix() {
    assert!(InputValidator::validate_identifier("sqlite_master").is_err());
}

#[test]
fn test_validate_identifier_too_long() {
    let name = "a".repeat(129);
    assert!(InputValidator::validate_identifier(&name).is_err());
}

#[test]
fn test_validate_identifier_exactly_128_chars() {
    let name = "a".repeat(128);
    assert!(InputValidator::validate_identifier(&name).is_ok());
}

#[test]
fn test_validate_delimiter() {
    assert!(InputValidator::validate_delimiter(";").is_ok());
    assert!(InputValidator::validate_delimiter("|").is_ok());
    assert!(InputValidator::validate_delimiter("").is_err());
    assert!(InputValidator::validate_delimiter("-").is_err());
    assert!(InputValidator::validate_delimiter("1").is_err());
}

#[test]
fn test_validate_file_path() {
    assert!(InputValidator::validate_file_path(Path::new("data/messages.csv")).is_ok());
    assert!(InputValidator::validate_file_path(Path::new("")).is_err());
    assert!(InputValidator::validate_file_path(Path::new("   ")).is_err());
}

#[test]
fn test_validate_file_path_too_long() {
    let long = "a".repeat(4097);
    assert!(InputValidator::validate_file_path(Path::new(&long)).is_err());
}

#[test]
fn test_validate_run_paths_rejects_overwriting_input() {
    let messages = Path::new("messages.csv");
    let categories = Path::new("categories.csv");
    assert!(InputValidator::validate_run_paths(messages, categories, Path::new("out.db")).is_ok());
    assert!(InputValidator::validate_run_paths(messages, categories, messages).is_err());
}
