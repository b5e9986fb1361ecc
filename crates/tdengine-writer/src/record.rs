// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Records, cells, and the two external collaborators of the write path:
//! the pull-based [`RecordSource`] and the [`DirtyRecordCollector`].
//!
//! A record carries no column names. Cell position `i` belongs to the `i`-th
//! entry of the configured column list.

use crate::error::WriterError;
use chrono::DateTime;
use std::collections::VecDeque;
use std::fmt;

/// One typed cell of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// SQL NULL.
    Null,
    /// Value the reader could not convert; the raw text is kept.
    Bad(String),
    /// Boolean.
    Bool(bool),
    /// Integer read from a 32-bit (or narrower) source column.
    Int(i64),
    /// 64-bit integer.
    Long(i64),
    /// Floating point value.
    Double(f64),
    /// UTF-8 text.
    String(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Point in time, epoch milliseconds.
    Date(i64),
}

/// Runtime kind of a [`Cell`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Null,
    Bad,
    Bool,
    Int,
    Long,
    Double,
    String,
    Bytes,
    Date,
}

impl CellKind {
    /// Every kind, in declaration order.
    pub const ALL: [CellKind; 9] = [
        CellKind::Null,
        CellKind::Bad,
        CellKind::Bool,
        CellKind::Int,
        CellKind::Long,
        CellKind::Double,
        CellKind::String,
        CellKind::Bytes,
        CellKind::Date,
    ];
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CellKind::Null => "NULL",
            CellKind::Bad => "BAD",
            CellKind::Bool => "BOOL",
            CellKind::Int => "INT",
            CellKind::Long => "LONG",
            CellKind::Double => "DOUBLE",
            CellKind::String => "STRING",
            CellKind::Bytes => "BYTES",
            CellKind::Date => "DATE",
        };
        f.write_str(name)
    }
}

/// Text layout used when a date cell is rendered as a string.
const DATE_TEXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

impl Cell {
    /// Runtime kind of this cell.
    pub fn kind(&self) -> CellKind {
        match self {
            Cell::Null => CellKind::Null,
            Cell::Bad(_) => CellKind::Bad,
            Cell::Bool(_) => CellKind::Bool,
            Cell::Int(_) => CellKind::Int,
            Cell::Long(_) => CellKind::Long,
            Cell::Double(_) => CellKind::Double,
            Cell::String(_) => CellKind::String,
            Cell::Bytes(_) => CellKind::Bytes,
            Cell::Date(_) => CellKind::Date,
        }
    }

    /// Textual rendering of the cell. `None` for NULL.
    ///
    /// Dates render as `YYYY-MM-DD HH:MM:SS.mmm` in UTC; bytes are decoded
    /// as UTF-8 with replacement characters.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Bad(raw) => Some(raw.clone()),
            Cell::Bool(v) => Some(v.to_string()),
            Cell::Int(v) | Cell::Long(v) => Some(v.to_string()),
            Cell::Double(v) => Some(v.to_string()),
            Cell::String(v) => Some(v.clone()),
            Cell::Bytes(v) => Some(String::from_utf8_lossy(v).into_owned()),
            Cell::Date(ms) => Some(
                DateTime::from_timestamp_millis(*ms)
                    .map(|dt| dt.format(DATE_TEXT_FORMAT).to_string())
                    .unwrap_or_else(|| ms.to_string()),
            ),
        }
    }

    /// Shorthand for `Cell::String`.
    pub fn text(s: impl Into<String>) -> Self {
        Cell::String(s.into())
    }
}

/// An ordered sequence of cells, one per configured column.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    cells: Vec<Cell>,
}

impl Record {
    /// Create a record from its cells.
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    /// Cell at a configured column position.
    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// All cells.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the record has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl From<Vec<Cell>> for Record {
    fn from(cells: Vec<Cell>) -> Self {
        Self::new(cells)
    }
}

/// Pull-based upstream record stream.
pub trait RecordSource {
    /// Next record, or `Ok(None)` once the stream is exhausted.
    fn next_record(&mut self) -> Result<Option<Record>, WriterError>;
}

/// In-memory record source.
#[derive(Debug, Default)]
pub struct VecSource {
    records: VecDeque<Record>,
}

impl VecSource {
    /// Create a source that yields `records` in order.
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: records.into(),
        }
    }

    /// Records not pulled yet.
    pub fn remaining(&self) -> usize {
        self.records.len()
    }
}

impl RecordSource for VecSource {
    fn next_record(&mut self) -> Result<Option<Record>, WriterError> {
        Ok(self.records.pop_front())
    }
}

/// Sink for rows that could not be written even on their own.
pub trait DirtyRecordCollector {
    /// Report one unrecoverable row together with the error it raised.
    fn collect_dirty(&mut self, record: &Record, error: &WriterError);
}

/// A dirty row captured by [`DirtyRecords`].
#[derive(Debug, Clone)]
pub struct DirtyRecord {
    /// The row as it was received.
    pub record: Record,
    /// Rendered error message.
    pub error: String,
}

/// Collector that keeps dirty rows in memory.
#[derive(Debug, Default)]
pub struct DirtyRecords {
    entries: Vec<DirtyRecord>,
}

impl DirtyRecords {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows collected so far.
    pub fn entries(&self) -> &[DirtyRecord] {
        &self.entries
    }

    /// Number of rows collected so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no row has been collected.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DirtyRecordCollector for DirtyRecords {
    fn collect_dirty(&mut self, record: &Record, error: &WriterError) {
        self.entries.push(DirtyRecord {
            record: record.clone(),
            error: error.to_string(),
        });
    }
}

/// Collector that only logs dirty rows.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingCollector;

impl DirtyRecordCollector for LoggingCollector {
    fn collect_dirty(&mut self, record: &Record, error: &WriterError) {
        tracing::error!(cells = ?record.cells(), %error, "dirty record");
    }
}
