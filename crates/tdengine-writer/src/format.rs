// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cell to literal conversion.
//!
//! Two target syntaxes share the same inputs (cell, destination column,
//! timestamp precision) but differ in their rules:
//!
//! - SQL mode produces literals for `insert into ... values (...)`.
//! - Line mode produces schemaless field values, each carrying a type suffix
//!   so the server does not have to infer the wire width.
//!
//! Each mode is a rule table keyed by `(CellKind, ColumnType)`. Rendering a
//! rule is a separate step, so the tables can be checked exhaustively.

use crate::error::WriterError;
use crate::record::{Cell, CellKind};
use crate::schema::{ColumnMeta, ColumnType, TimestampPrecision};
use chrono::{DateTime, NaiveDateTime};

const NULL: &str = "NULL";

/// SQL-literal rendering rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlRule {
    /// `NULL`.
    Null,
    /// Epoch scaled to the database precision.
    ScaledEpoch,
    /// Single-quoted date text (precision unspecified).
    QuotedDate,
    /// Double-quoted text handed to a TIMESTAMP column.
    TimestampText,
    /// Single-quoted, escaped text. Empty text becomes `NULL`.
    QuotedText,
    /// Value text, unquoted.
    Raw,
}

/// Select the SQL rule for a cell kind and destination column.
pub fn sql_rule(kind: CellKind, column: &ColumnType, precision: TimestampPrecision) -> SqlRule {
    match kind {
        CellKind::Null | CellKind::Bad => SqlRule::Null,
        CellKind::Date if precision.millis_factor().is_some() => SqlRule::ScaledEpoch,
        CellKind::Date => SqlRule::QuotedDate,
        CellKind::String | CellKind::Bytes if *column == ColumnType::Timestamp => {
            SqlRule::TimestampText
        }
        CellKind::String | CellKind::Bytes => SqlRule::QuotedText,
        CellKind::Bool | CellKind::Int | CellKind::Long | CellKind::Double => SqlRule::Raw,
    }
}

/// Render a cell as a SQL literal for `column`.
pub fn sql_literal(cell: &Cell, column: &ColumnMeta, precision: TimestampPrecision) -> String {
    let rule = sql_rule(cell.kind(), &column.column_type(), precision);
    let text = match cell.as_text() {
        Some(text) => text,
        None => return NULL.to_string(),
    };

    match rule {
        SqlRule::Null => NULL.to_string(),
        SqlRule::ScaledEpoch => match cell {
            Cell::Date(ms) => precision.scale_millis(*ms).to_string(),
            _ => text,
        },
        SqlRule::QuotedDate => format!("'{}'", text),
        SqlRule::TimestampText => format!("\"{}\"", text),
        SqlRule::QuotedText if text.is_empty() => NULL.to_string(),
        SqlRule::QuotedText => format!("'{}'", escape_sql(&text)),
        SqlRule::Raw if text.is_empty() => NULL.to_string(),
        SqlRule::Raw => text,
    }
}

fn escape_sql(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Schemaless field rendering rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRule {
    /// `NULL`.
    Null,
    /// `L'<text>'`.
    WideDate,
    /// Scaled epoch followed by `i64`.
    EpochI64,
    /// Value text followed by a width suffix.
    Suffixed(&'static str),
    /// `"<text>"`, double quotes escaped.
    Quoted,
    /// `L"<text>"`, double quotes escaped.
    WideQuoted,
    /// Text followed by `i64` (text destined to a TIMESTAMP column).
    TextI64,
    /// Value text, unquoted.
    Raw,
}

/// Width suffix of a numeric destination type.
fn numeric_suffix(column: &ColumnType) -> Option<&'static str> {
    let suffix = match column {
        ColumnType::Float => "f32",
        ColumnType::Double => "f64",
        ColumnType::TinyInt => "i8",
        ColumnType::SmallInt => "i16",
        ColumnType::Int => "i32",
        ColumnType::BigInt | ColumnType::Timestamp => "i64",
        ColumnType::UTinyInt => "u8",
        ColumnType::USmallInt => "u16",
        ColumnType::UInt => "u32",
        ColumnType::UBigInt => "u64",
        _ => return None,
    };
    Some(suffix)
}

/// Select the line rule for a cell kind and destination column.
pub fn line_rule(kind: CellKind, column: &ColumnType) -> LineRule {
    match kind {
        CellKind::Null | CellKind::Bad => LineRule::Null,
        CellKind::Date if *column == ColumnType::Timestamp => LineRule::EpochI64,
        CellKind::Date => LineRule::WideDate,
        CellKind::Int | CellKind::Long | CellKind::Double => match column {
            ColumnType::Binary => LineRule::Quoted,
            ColumnType::Nchar => LineRule::WideQuoted,
            other => numeric_suffix(other).map_or(LineRule::Raw, LineRule::Suffixed),
        },
        CellKind::String | CellKind::Bytes => match column {
            ColumnType::Timestamp => LineRule::TextI64,
            ColumnType::Binary => LineRule::Quoted,
            ColumnType::Nchar => LineRule::WideQuoted,
            _ => LineRule::Raw,
        },
        CellKind::Bool => LineRule::Raw,
    }
}

/// Render a cell as a schemaless field value for `column`.
pub fn line_value(cell: &Cell, column: &ColumnMeta, precision: TimestampPrecision) -> String {
    let kind = cell.kind();
    let rule = line_rule(kind, &column.column_type());
    let text = match cell.as_text() {
        Some(text) => text,
        None => return NULL.to_string(),
    };
    let textual = matches!(kind, CellKind::String | CellKind::Bytes);

    match rule {
        LineRule::Null => NULL.to_string(),
        _ if textual && text.is_empty() => NULL.to_string(),
        LineRule::WideDate => format!("L'{}'", text),
        LineRule::EpochI64 => match cell {
            Cell::Date(ms) => format!("{}i64", precision.scale_millis(*ms)),
            _ => format!("{}i64", text),
        },
        LineRule::Suffixed(suffix) => format!("{}{}", text, suffix),
        LineRule::Quoted => format!("\"{}\"", escape_line(&text)),
        LineRule::WideQuoted => format!("L\"{}\"", escape_line(&text)),
        LineRule::TextI64 => format!("{}i64", text),
        LineRule::Raw if textual => escape_line(&text),
        LineRule::Raw => text,
    }
}

fn escape_line(s: &str) -> String {
    s.replace('"', "\\\"")
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

/// Timestamp segment of a schemaless line.
///
/// Dates and parsed timestamp text are scaled to `precision` (milliseconds
/// when unspecified). Integer text and integer cells are taken as already
/// expressed in the database precision.
pub fn line_timestamp(
    cell: &Cell,
    column: &ColumnMeta,
    precision: TimestampPrecision,
) -> Result<i64, WriterError> {
    match cell {
        Cell::Date(ms) => Ok(precision.scale_millis(*ms)),
        Cell::Int(v) | Cell::Long(v) => Ok(*v),
        Cell::Double(v) => Ok(v.trunc() as i64),
        Cell::String(text) => parse_timestamp_text(text)
            .map(|parsed| match parsed {
                ParsedTimestamp::Raw(v) => v,
                ParsedTimestamp::Millis(ms) => precision.scale_millis(ms),
            })
            .ok_or_else(|| WriterError::unsupported(cell.kind(), &column.field)),
        other => Err(WriterError::unsupported(other.kind(), &column.field)),
    }
}

enum ParsedTimestamp {
    Raw(i64),
    Millis(i64),
}

fn parse_timestamp_text(text: &str) -> Option<ParsedTimestamp> {
    let text = text.trim();
    if let Ok(v) = text.parse::<i64>() {
        return Some(ParsedTimestamp::Raw(v));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(ParsedTimestamp::Millis(dt.timestamp_millis()));
    }
    NAIVE_FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(text, fmt)
            .ok()
            .map(|dt| ParsedTimestamp::Millis(dt.and_utc().timestamp_millis()))
    })
}
