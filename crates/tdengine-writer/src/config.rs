// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Writer job configuration.
//!
//! Supports both programmatic (builder) and file-based (TOML) configuration.
//!
//! ```toml
//! jdbc_url = "jdbc:TAOS-RS://localhost:6041/test"
//! username = "root"
//! password = "taosdata"
//! batch_size = 500
//! table = ["weather"]
//! column = ["ts", "temperature", "location"]
//!
//! [schema]
//! precision = "ms"
//!
//! [[schema.tables]]
//! name = "weather"
//! kind = "normal"
//! columns = [
//!     { field = "ts", type = "TIMESTAMP", is_primary_key = true },
//!     { field = "temperature", type = "DOUBLE" },
//!     { field = "location", type = "NCHAR(64)" },
//! ]
//! ```

use crate::columns::ConfiguredColumns;
use crate::error::WriterError;
use crate::schema::{StaticSchemaLoader, TableSchema, TimestampPrecision};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Default number of records per batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for WriterError {
    fn from(err: ConfigError) -> Self {
        WriterError::Config(err.to_string())
    }
}

/// Writer job configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WriterConfig {
    /// Connection URL (`jdbc:TAOS-RS://host:port/db`).
    pub jdbc_url: String,

    /// Connection user.
    #[serde(default = "default_username")]
    pub username: String,

    /// Connection password.
    #[serde(default = "default_password")]
    pub password: String,

    /// Records per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Destination tables.
    #[serde(default)]
    pub table: Vec<String>,

    /// Column names supplied by the record stream, in record order.
    #[serde(default)]
    pub column: Vec<String>,

    /// Drop sub table rows whose tag cells differ from the table's tags.
    #[serde(default)]
    pub ignore_tags_unmatched: bool,

    /// Declared destination metadata.
    #[serde(default)]
    pub schema: Option<SchemaConfig>,
}

/// Declared destination metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaConfig {
    /// Database timestamp precision (`ms`, `us`, `ns`).
    #[serde(default)]
    pub precision: TimestampPrecision,

    /// Table descriptions.
    #[serde(default)]
    pub tables: Vec<TableSchema>,
}

fn default_username() -> String {
    "root".to_string()
}

fn default_password() -> String {
    "taosdata".to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            jdbc_url: String::new(),
            username: default_username(),
            password: default_password(),
            batch_size: DEFAULT_BATCH_SIZE,
            table: Vec::new(),
            column: Vec::new(),
            ignore_tags_unmatched: false,
            schema: None,
        }
    }
}

impl WriterConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Create a new config builder.
    pub fn builder() -> WriterConfigBuilder {
        WriterConfigBuilder::default()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jdbc_url.trim().is_empty() {
            return Err(ConfigError::Invalid("jdbc_url is empty".into()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be positive".into()));
        }
        if self.table.is_empty() {
            return Err(ConfigError::Invalid("No table configured".into()));
        }
        if self.column.is_empty() {
            return Err(ConfigError::Invalid("No column configured".into()));
        }

        let mut seen = HashSet::new();
        for column in &self.column {
            if !seen.insert(column.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "Column {} is configured twice",
                    column
                )));
            }
        }

        if let Some(schema) = &self.schema {
            for table in &self.table {
                if !schema.tables.iter().any(|t| &t.name == table) {
                    return Err(ConfigError::Invalid(format!(
                        "Table {} has no [[schema.tables]] entry",
                        table
                    )));
                }
            }
        }

        Ok(())
    }

    /// Configured column list.
    pub fn columns(&self) -> ConfiguredColumns {
        ConfiguredColumns::new(self.column.clone())
    }

    /// Loader serving the declared `[schema]` section.
    pub fn schema_loader(&self) -> Result<StaticSchemaLoader, ConfigError> {
        let schema = self
            .schema
            .as_ref()
            .ok_or_else(|| ConfigError::Invalid("No [schema] section".into()))?;
        Ok(StaticSchemaLoader::new(
            schema.precision,
            schema.tables.clone(),
        ))
    }
}

/// Config builder for fluent API.
#[derive(Debug, Default)]
pub struct WriterConfigBuilder {
    jdbc_url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    batch_size: Option<usize>,
    table: Vec<String>,
    column: Vec<String>,
    ignore_tags_unmatched: Option<bool>,
    schema: Option<SchemaConfig>,
}

impl WriterConfigBuilder {
    /// Set the connection URL.
    pub fn jdbc_url(mut self, url: impl Into<String>) -> Self {
        self.jdbc_url = Some(url.into());
        self
    }

    /// Set user and password.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the number of records per batch.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Add a destination table.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table.push(table.into());
        self
    }

    /// Set the record column list.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Drop sub table rows with unmatched tags (default: false).
    pub fn ignore_tags_unmatched(mut self, ignore: bool) -> Self {
        self.ignore_tags_unmatched = Some(ignore);
        self
    }

    /// Declare destination metadata.
    pub fn schema(mut self, precision: TimestampPrecision, tables: Vec<TableSchema>) -> Self {
        self.schema = Some(SchemaConfig { precision, tables });
        self
    }

    /// Build the configuration.
    pub fn build(self) -> WriterConfig {
        let defaults = WriterConfig::default();

        WriterConfig {
            jdbc_url: self.jdbc_url.unwrap_or(defaults.jdbc_url),
            username: self.username.unwrap_or(defaults.username),
            password: self.password.unwrap_or(defaults.password),
            batch_size: self.batch_size.unwrap_or(defaults.batch_size),
            table: self.table,
            column: self.column,
            ignore_tags_unmatched: self
                .ignore_tags_unmatched
                .unwrap_or(defaults.ignore_tags_unmatched),
            schema: self.schema,
        }
    }
}
