// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! JSON-lines record input and dirty record output.
//!
//! One record per line, as a JSON array with one element per configured
//! column:
//!
//! ```text
//! [1626624000000, 21.5, "paris", null]
//! [{"date": 1626624000000}, {"bytes": [1, 2]}, {"bad": "n/a"}, true]
//! ```
//!
//! Plain JSON scalars map to `Null`, `Bool`, `Long`, `Double` and `String`
//! cells. The `date`, `bytes`, `bad` and `int` objects select the other cell
//! kinds.

use crate::error::WriterError;
use crate::record::{Cell, DirtyRecordCollector, Record, RecordSource};
use serde_json::{json, Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Record source reading JSON arrays, one per line.
#[derive(Debug)]
pub struct JsonLinesSource<R> {
    reader: R,
    line: String,
    line_number: usize,
}

impl JsonLinesSource<BufReader<File>> {
    /// Open a file.
    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> JsonLinesSource<R> {
    /// Read records from `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_number: 0,
        }
    }
}

impl<R: BufRead> RecordSource for JsonLinesSource<R> {
    fn next_record(&mut self) -> Result<Option<Record>, WriterError> {
        loop {
            self.line.clear();
            let read = self
                .reader
                .read_line(&mut self.line)
                .map_err(|e| WriterError::Source(format!("line {}: {}", self.line_number + 1, e)))?;
            if read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let text = self.line.trim();
            if text.is_empty() {
                continue;
            }
            return parse_record(text)
                .map(Some)
                .map_err(|e| WriterError::Source(format!("line {}: {}", self.line_number, e)));
        }
    }
}

fn parse_record(text: &str) -> Result<Record, String> {
    let value: Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(json_to_cell)
            .collect::<Result<Vec<_>, _>>()
            .map(Record::new),
        other => Err(format!("expected a JSON array, got {}", other)),
    }
}

/// Convert one JSON value to a cell.
pub fn json_to_cell(value: Value) -> Result<Cell, String> {
    match value {
        Value::Null => Ok(Cell::Null),
        Value::Bool(v) => Ok(Cell::Bool(v)),
        Value::Number(n) => match n.as_i64() {
            Some(v) => Ok(Cell::Long(v)),
            None => n
                .as_f64()
                .map(Cell::Double)
                .ok_or_else(|| format!("unsupported number {}", n)),
        },
        Value::String(v) => Ok(Cell::String(v)),
        Value::Array(_) => Err("nested arrays are not supported".to_string()),
        Value::Object(map) => tagged_cell(map),
    }
}

fn tagged_cell(map: Map<String, Value>) -> Result<Cell, String> {
    let mut entries = map.into_iter();
    let (key, value) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        _ => return Err("cell objects must have exactly one key".to_string()),
    };

    match (key.as_str(), value) {
        ("date", Value::Number(n)) => n
            .as_i64()
            .map(Cell::Date)
            .ok_or_else(|| format!("invalid date {}", n)),
        ("int", Value::Number(n)) => n
            .as_i64()
            .map(Cell::Int)
            .ok_or_else(|| format!("invalid int {}", n)),
        ("bad", Value::String(raw)) => Ok(Cell::Bad(raw)),
        ("bytes", Value::Array(items)) => items
            .into_iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| format!("invalid byte {}", item))
            })
            .collect::<Result<Vec<u8>, _>>()
            .map(Cell::Bytes),
        (key, value) => Err(format!("unsupported cell {{\"{}\": {}}}", key, value)),
    }
}

/// Convert a cell to the JSON form [`json_to_cell`] reads back.
pub fn cell_to_json(cell: &Cell) -> Value {
    match cell {
        Cell::Null => Value::Null,
        Cell::Bad(raw) => json!({ "bad": raw }),
        Cell::Bool(v) => json!(v),
        Cell::Int(v) => json!({ "int": v }),
        Cell::Long(v) => json!(v),
        Cell::Double(v) => json!(v),
        Cell::String(v) => json!(v),
        Cell::Bytes(v) => json!({ "bytes": v }),
        Cell::Date(ms) => json!({ "date": ms }),
    }
}

/// Dirty record collector appending one JSON object per line:
/// `{"record": [...], "error": "..."}`.
#[derive(Debug)]
pub struct DirtyFileWriter<W: Write> {
    writer: W,
    written: usize,
}

impl DirtyFileWriter<File> {
    /// Create (or truncate) a file.
    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> DirtyFileWriter<W> {
    /// Write to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(mut self) -> std::io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn append(&mut self, record: &Record, error: &WriterError) -> std::io::Result<()> {
        let cells: Vec<Value> = record.cells().iter().map(cell_to_json).collect();
        let entry = json!({ "record": cells, "error": error.to_string() });
        writeln!(self.writer, "{}", entry)?;
        self.writer.flush()
    }
}

impl<W: Write> DirtyRecordCollector for DirtyFileWriter<W> {
    fn collect_dirty(&mut self, record: &Record, error: &WriterError) {
        tracing::error!(cells = ?record.cells(), %error, "dirty record");
        match self.append(record, error) {
            Ok(()) => self.written += 1,
            Err(e) => tracing::error!(error = %e, "failed to write dirty record"),
        }
    }
}
