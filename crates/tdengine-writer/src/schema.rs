// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Destination metadata: table kinds, column descriptions, and the
//! database-wide timestamp precision.
//!
//! Metadata is resolved once per run by a [`SchemaLoader`] and treated as
//! read-only afterwards.

use crate::error::WriterError;
use crate::transport::Transport;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Kind of a destination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    /// Schema template; rows fan out into sub tables.
    #[serde(alias = "stable", alias = "sup")]
    Super,
    /// Instance of a super table bound to fixed tag values.
    Sub,
    /// Standalone table.
    #[serde(alias = "nml")]
    Normal,
}

/// Declared storage type of a column, parsed from the type name reported by
/// the server (`"TIMESTAMP"`, `"NCHAR(32)"`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Timestamp,
    Bool,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    UTinyInt,
    USmallInt,
    UInt,
    UBigInt,
    Float,
    Double,
    /// `BINARY` / `VARCHAR`.
    Binary,
    Nchar,
    Json,
    Other(String),
}

impl ColumnType {
    /// Parse a declared type name. Length suffixes such as `(32)` are ignored.
    pub fn parse(declared: &str) -> Self {
        let upper = declared.trim().to_ascii_uppercase();
        let base = upper
            .split('(')
            .next()
            .unwrap_or_default()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        match base.as_str() {
            "TIMESTAMP" => ColumnType::Timestamp,
            "BOOL" | "BOOLEAN" => ColumnType::Bool,
            "TINYINT" => ColumnType::TinyInt,
            "SMALLINT" => ColumnType::SmallInt,
            "INT" | "INTEGER" => ColumnType::Int,
            "BIGINT" => ColumnType::BigInt,
            "TINYINT UNSIGNED" => ColumnType::UTinyInt,
            "SMALLINT UNSIGNED" => ColumnType::USmallInt,
            "INT UNSIGNED" => ColumnType::UInt,
            "BIGINT UNSIGNED" => ColumnType::UBigInt,
            "FLOAT" => ColumnType::Float,
            "DOUBLE" => ColumnType::Double,
            "BINARY" | "VARCHAR" => ColumnType::Binary,
            "NCHAR" => ColumnType::Nchar,
            "JSON" => ColumnType::Json,
            _ => ColumnType::Other(upper),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Bool => "BOOL",
            ColumnType::TinyInt => "TINYINT",
            ColumnType::SmallInt => "SMALLINT",
            ColumnType::Int => "INT",
            ColumnType::BigInt => "BIGINT",
            ColumnType::UTinyInt => "TINYINT UNSIGNED",
            ColumnType::USmallInt => "SMALLINT UNSIGNED",
            ColumnType::UInt => "INT UNSIGNED",
            ColumnType::UBigInt => "BIGINT UNSIGNED",
            ColumnType::Float => "FLOAT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Binary => "BINARY",
            ColumnType::Nchar => "NCHAR",
            ColumnType::Json => "JSON",
            ColumnType::Other(name) => name,
        };
        f.write_str(name)
    }
}

/// Tag value a sub table is bound to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp { timestamp_ms: i64 },
    Bytes { bytes: Vec<u8> },
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Bool(v) => write!(f, "{}", v),
            TagValue::Int(v) => write!(f, "{}", v),
            TagValue::Float(v) => write!(f, "{}", v),
            TagValue::Text(v) => f.write_str(v),
            TagValue::Timestamp { timestamp_ms } => write!(f, "{}", timestamp_ms),
            TagValue::Bytes { bytes } => f.write_str(&String::from_utf8_lossy(bytes)),
        }
    }
}

/// Description of one destination column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    /// Column name.
    pub field: String,

    /// Declared type name as reported by the server.
    #[serde(rename = "type")]
    pub declared_type: String,

    /// Column is a tag.
    #[serde(default)]
    pub is_tag: bool,

    /// Column is the primary timestamp key.
    #[serde(default)]
    pub is_primary_key: bool,

    /// Bound tag value (sub tables only). `None` is the NULL binding.
    #[serde(default)]
    pub value: Option<TagValue>,
}

impl ColumnMeta {
    /// Plain data column.
    pub fn field(field: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            declared_type: declared_type.into(),
            is_tag: false,
            is_primary_key: false,
            value: None,
        }
    }

    /// Primary timestamp column.
    pub fn primary_key(field: impl Into<String>) -> Self {
        Self {
            is_primary_key: true,
            ..Self::field(field, "TIMESTAMP")
        }
    }

    /// Tag column without a bound value.
    pub fn tag(field: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            is_tag: true,
            ..Self::field(field, declared_type)
        }
    }

    /// Bind a tag value (sub tables).
    pub fn with_value(mut self, value: TagValue) -> Self {
        self.value = Some(value);
        self
    }

    /// Parsed declared type.
    pub fn column_type(&self) -> ColumnType {
        ColumnType::parse(&self.declared_type)
    }
}

/// Destination table description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMeta {
    /// Table name.
    pub name: String,
    /// Table kind.
    pub kind: TableKind,
}

/// Time unit the database uses for integer timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampPrecision {
    Millisecond,
    Microsecond,
    Nanosecond,
    /// Not configured; timestamps travel as strings.
    #[default]
    Unspecified,
}

impl TimestampPrecision {
    /// Parse the precision name used by the server (`ms`, `us`, `ns`).
    ///
    /// Unknown or empty names map to [`TimestampPrecision::Unspecified`].
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "ms" | "milli" | "millisecond" | "milliseconds" => Self::Millisecond,
            "us" | "micro" | "microsecond" | "microseconds" => Self::Microsecond,
            "ns" | "nano" | "nanosecond" | "nanoseconds" => Self::Nanosecond,
            _ => Self::Unspecified,
        }
    }

    /// Factor from epoch milliseconds to this precision.
    ///
    /// `None` for [`TimestampPrecision::Unspecified`].
    pub fn millis_factor(self) -> Option<i64> {
        match self {
            Self::Millisecond => Some(1),
            Self::Microsecond => Some(1_000),
            Self::Nanosecond => Some(1_000_000),
            Self::Unspecified => None,
        }
    }

    /// Scale epoch milliseconds, treating an unspecified precision as
    /// milliseconds.
    pub fn scale_millis(self, millis: i64) -> i64 {
        millis.saturating_mul(self.millis_factor().unwrap_or(1))
    }
}

impl<'de> Deserialize<'de> for TimestampPrecision {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::parse(&name))
    }
}

/// Metadata of every destination table, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    tables: HashMap<String, TableMeta>,
    columns: HashMap<String, Vec<ColumnMeta>>,
    precision: TimestampPrecision,
}

impl Schema {
    /// Create an empty schema with the given precision.
    pub fn new(precision: TimestampPrecision) -> Self {
        Self {
            precision,
            ..Self::default()
        }
    }

    /// Register a table and its columns in declaration order.
    pub fn with_table(mut self, meta: TableMeta, columns: Vec<ColumnMeta>) -> Self {
        self.columns.insert(meta.name.clone(), columns);
        self.tables.insert(meta.name.clone(), meta);
        self
    }

    /// Table description.
    pub fn table(&self, name: &str) -> Result<&TableMeta, WriterError> {
        self.tables
            .get(name)
            .ok_or_else(|| WriterError::Metadata(format!("no table meta for {}", name)))
    }

    /// Column descriptions in declaration order.
    pub fn columns(&self, name: &str) -> Result<&[ColumnMeta], WriterError> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| WriterError::Metadata(format!("no column meta for {}", name)))
    }

    /// Database timestamp precision.
    pub fn precision(&self) -> TimestampPrecision {
        self.precision
    }
}

/// Resolves destination metadata.
pub trait SchemaLoader {
    /// Load metadata for every table in `tables`.
    ///
    /// Called once, on the connection the run writes through.
    fn load(&self, transport: &mut dyn Transport, tables: &[String]) -> Result<Schema, WriterError>;
}

/// One table entry of a declared schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Table kind.
    pub kind: TableKind,
    /// Columns in declaration order.
    pub columns: Vec<ColumnMeta>,
}

/// Loader serving metadata declared up front (job file, tests).
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaLoader {
    precision: TimestampPrecision,
    tables: Vec<TableSchema>,
}

impl StaticSchemaLoader {
    /// Create a loader from declared tables.
    pub fn new(precision: TimestampPrecision, tables: Vec<TableSchema>) -> Self {
        Self { precision, tables }
    }
}

impl SchemaLoader for StaticSchemaLoader {
    fn load(&self, _transport: &mut dyn Transport, tables: &[String]) -> Result<Schema, WriterError> {
        let mut schema = Schema::new(self.precision);
        for name in tables {
            let declared = self
                .tables
                .iter()
                .find(|t| &t.name == name)
                .ok_or_else(|| WriterError::Metadata(format!("table {} is not declared", name)))?;

            for column in &declared.columns {
                if column.is_tag && column.is_primary_key {
                    return Err(WriterError::Metadata(format!(
                        "column {}.{} cannot be both tag and primary key",
                        name, column.field
                    )));
                }
            }

            schema = schema.with_table(
                TableMeta {
                    name: declared.name.clone(),
                    kind: declared.kind,
                },
                declared.columns.clone(),
            );
        }
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    #[test]
    fn test_column_type_parse() {
        assert_eq!(ColumnType::parse("TIMESTAMP"), ColumnType::Timestamp);
        assert_eq!(ColumnType::parse("nchar(32)"), ColumnType::Nchar);
        assert_eq!(ColumnType::parse("BINARY(16)"), ColumnType::Binary);
        assert_eq!(ColumnType::parse("VARCHAR(16)"), ColumnType::Binary);
        assert_eq!(ColumnType::parse("INT UNSIGNED"), ColumnType::UInt);
        assert_eq!(ColumnType::parse("tinyint  unsigned"), ColumnType::UTinyInt);
        assert_eq!(
            ColumnType::parse("GEOMETRY(64)"),
            ColumnType::Other("GEOMETRY(64)".to_string())
        );
    }

    #[test]
    fn test_precision_parse_and_scale() {
        assert_eq!(TimestampPrecision::parse("ms"), TimestampPrecision::Millisecond);
        assert_eq!(TimestampPrecision::parse("US"), TimestampPrecision::Microsecond);
        assert_eq!(TimestampPrecision::parse("ns"), TimestampPrecision::Nanosecond);
        assert_eq!(TimestampPrecision::parse(""), TimestampPrecision::Unspecified);

        assert_eq!(TimestampPrecision::Microsecond.scale_millis(5), 5_000);
        assert_eq!(TimestampPrecision::Unspecified.scale_millis(5), 5);
        assert_eq!(TimestampPrecision::Unspecified.millis_factor(), None);
    }

    #[test]
    fn test_static_loader_resolves_requested_tables() {
        let loader = StaticSchemaLoader::new(
            TimestampPrecision::Millisecond,
            vec![TableSchema {
                name: "weather".to_string(),
                kind: TableKind::Normal,
                columns: vec![ColumnMeta::primary_key("ts"), ColumnMeta::field("f1", "INT")],
            }],
        );
        let mut transport = MemoryTransport::new();

        let schema = loader
            .load(&mut transport, &["weather".to_string()])
            .expect("load");
        assert_eq!(schema.table("weather").expect("table").kind, TableKind::Normal);
        assert_eq!(schema.columns("weather").expect("columns").len(), 2);
        assert_eq!(schema.precision(), TimestampPrecision::Millisecond);

        let err = loader
            .load(&mut transport, &["missing".to_string()])
            .unwrap_err();
        assert!(matches!(err, WriterError::Metadata(_)));
    }

    #[test]
    fn test_static_loader_rejects_tag_primary_key() {
        let mut bad = ColumnMeta::primary_key("ts");
        bad.is_tag = true;
        let loader = StaticSchemaLoader::new(
            TimestampPrecision::Millisecond,
            vec![TableSchema {
                name: "stb".to_string(),
                kind: TableKind::Super,
                columns: vec![bad],
            }],
        );

        let err = loader
            .load(&mut MemoryTransport::new(), &["stb".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("cannot be both tag and primary key"));
    }

    #[test]
    fn test_tag_value_deserialize_untagged() {
        #[derive(Deserialize)]
        struct Holder {
            value: TagValue,
        }

        let parse = |s: &str| toml::from_str::<Holder>(s).expect("parse").value;
        assert_eq!(parse("value = true"), TagValue::Bool(true));
        assert_eq!(parse("value = 7"), TagValue::Int(7));
        assert_eq!(parse("value = 1.5"), TagValue::Float(1.5));
        assert_eq!(parse("value = \"A\""), TagValue::Text("A".to_string()));
        assert_eq!(
            parse("value = { timestamp_ms = 1000 }"),
            TagValue::Timestamp { timestamp_ms: 1000 }
        );
    }
}
