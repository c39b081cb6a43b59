use std::path::Path;
use std::sync::OnceLock;

use anyhow::{anyhow, Result};
use regex::Regex;

/// Longest identifier accepted for tables and key columns
pub const MAX_IDENTIFIER_LEN: usize = 128;

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern compiles"))
}

/// Validation utilities for command-line and configuration input
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate an input or output file path
    pub fn validate_file_path(path: &Path) -> Result<()> {
        let path_str = path.to_string_lossy();
        if path_str.trim().is_empty() {
            return Err(anyhow!("File path cannot be empty"));
        }

        if path_str.contains('\0') {
            return Err(anyhow!("File path contains a null byte"));
        }

        // Check path length
        if path_str.len() > 4096 {
            return Err(anyhow!("File path too long (max 4096 characters)"));
        }

        Ok(())
    }

    /// Validate a SQL identifier used for the output table or a configured column
    pub fn validate_identifier(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(anyhow!("Identifier cannot be empty"));
        }

        if name.len() > MAX_IDENTIFIER_LEN {
            return Err(anyhow!("Identifier too long (max {MAX_IDENTIFIER_LEN} characters)"));
        }

        if !identifier_re().is_match(name) {
            return Err(anyhow!(
                "Invalid identifier {name:?}: use letters, digits and underscores, not starting with a digit"
            ));
        }

        if name.to_ascii_lowercase().starts_with("sqlite_") {
            return Err(anyhow!("Identifier {name:?} uses the reserved sqlite_ prefix"));
        }

        Ok(())
    }

    /// Validate the category token delimiter
    pub fn validate_delimiter(delimiter: &str) -> Result<()> {
        if delimiter.is_empty() {
            return Err(anyhow!("Token delimiter cannot be empty"));
        }

        // The delimiter may not collide with the name/value separator
        if delimiter.contains('-') {
            return Err(anyhow!("Token delimiter cannot contain '-'"));
        }

        if delimiter.chars().any(|c| c.is_ascii_digit()) {
            return Err(anyhow!("Token delimiter cannot contain digits"));
        }

        Ok(())
    }

    /// Validate that the three pipeline paths are usable and distinct
    pub fn validate_run_paths(messages: &Path, categories: &Path, destination: &Path) -> Result<()> {
        Self::validate_file_path(messages)?;
        Self::validate_file_path(categories)?;
        Self::validate_file_path(destination)?;

        if destination == messages || destination == categories {
            return Err(anyhow!(
                "Destination {} would overwrite an input file",
                destination.display()
            ));
        }

        Ok(())
    }
}
