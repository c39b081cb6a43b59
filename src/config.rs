use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::db::WriteOptions;
use crate::error::EtlError;
use crate::models::{IfExists, OutOfRangePolicy};
use crate::normalizer::NormalizeOptions;
use crate::schema::output;
use crate::validation::InputValidator;

/// Prefix for environment overrides, e.g. `DISASTER_ETL__OUTPUT__TABLE_NAME`
pub const ENV_PREFIX: &str = "DISASTER_ETL";

/// Application configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub join_key: String,
    pub category_column: String,
    pub token_delimiter: String,
    pub out_of_range: OutOfRangePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub table_name: String,
    pub if_exists: IfExists,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub format: String, // "json" or "text"
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig {
                join_key: output::DEFAULT_JOIN_KEY.to_string(),
                category_column: output::DEFAULT_CATEGORY_COLUMN.to_string(),
                token_delimiter: output::DEFAULT_TOKEN_DELIMITER.to_string(),
                out_of_range: OutOfRangePolicy::PassThrough,
            },
            output: OutputConfig {
                table_name: output::DEFAULT_TABLE.to_string(),
                if_exists: IfExists::Fail,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, layering `extra_file` above the standard locations
    pub fn load_from(extra_file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        // Start with default values
        for (key, value) in Self::default() {
            builder = builder.set_default(key, value)?;
        }
        builder = builder
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));
        if let Some(path) = extra_file {
            builder = builder.add_source(File::from(path).required(true));
        }
        let config = builder
            // Add environment variables with prefix
            .add_source(Environment::with_prefix(ENV_PREFIX).prefix_separator("__").separator("__"))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {}", e))?;

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), EtlError> {
        let invalid = |e: anyhow::Error| EtlError::InvalidConfig(e.to_string());
        InputValidator::validate_identifier(&self.pipeline.join_key).map_err(invalid)?;
        InputValidator::validate_identifier(&self.pipeline.category_column).map_err(invalid)?;
        InputValidator::validate_delimiter(&self.pipeline.token_delimiter).map_err(invalid)?;
        InputValidator::validate_identifier(&self.output.table_name).map_err(invalid)?;

        if self.pipeline.join_key == self.pipeline.category_column {
            return Err(EtlError::InvalidConfig(format!(
                "join_key and category_column must differ (both are {:?})",
                self.pipeline.join_key
            )));
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(EtlError::InvalidConfig(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level, valid_levels
            )));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(EtlError::InvalidConfig(format!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format, valid_formats
            )));
        }

        Ok(())
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }

    /// Options for the normalizer stage
    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            category_column: self.pipeline.category_column.clone(),
            token_delimiter: self.pipeline.token_delimiter.clone(),
            key_column: self.pipeline.join_key.clone(),
            out_of_range: self.pipeline.out_of_range,
        }
    }

    /// Options for the writer stage
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            table_name: self.output.table_name.clone(),
            if_exists: self.output.if_exists,
        }
    }

    /// Render the effective configuration as YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

impl IntoIterator for AppConfig {
    type Item = (String, config::Value);
    type IntoIter = std::collections::hash_map::IntoIter<String, config::Value>;

    fn into_iter(self) -> Self::IntoIter {
        let mut map = HashMap::new();

        // Flatten the configuration into key-value pairs
        map.insert("pipeline.join_key".to_string(), config::Value::from(self.pipeline.join_key));
        map.insert("pipeline.category_column".to_string(), config::Value::from(self.pipeline.category_column));
        map.insert("pipeline.token_delimiter".to_string(), config::Value::from(self.pipeline.token_delimiter));
        map.insert("pipeline.out_of_range".to_string(), config::Value::from(self.pipeline.out_of_range.as_str()));

        map.insert("output.table_name".to_string(), config::Value::from(self.output.table_name));
        map.insert("output.if_exists".to_string(), config::Value::from(self.output.if_exists.as_str()));

        map.insert("logging.level".to_string(), config::Value::from(self.logging.level));
        if let Some(file_path) = self.logging.file_path {
            map.insert("logging.file_path".to_string(), config::Value::from(file_path));
        }
        map.insert("logging.format".to_string(), config::Value::from(self.logging.format));

        map.into_iter()
    }
}
