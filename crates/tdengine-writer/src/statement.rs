// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Statement building.
//!
//! A [`TablePlan`] fixes which columns take part in each statement part.
//! [`StatementBuilder`] turns one batch of records into the statement the
//! plan's route calls for:
//!
//! | Route               | Output |
//! |---------------------|--------|
//! | `SuperBySql`        | `insert into <tb> using <stb> tags(..) values(..) ...` |
//! | `SuperBySchemaless` | one line per record, submitted as one batch |
//! | `SubTable`          | `insert into <tb> (..) values (..)(..)`, filtered rows |
//! | `NormalTable`       | `insert into <tb> (..) values (..)(..)` |

use crate::columns::{column_list, BoundColumn, Route, TablePlan, TBNAME};
use crate::error::WriterError;
use crate::format::{line_timestamp, line_value, sql_literal};
use crate::record::{Cell, Record};
use crate::schema::TimestampPrecision;
use crate::tags::tag_matches;
use std::fmt;

/// Schemaless protocol variant of a [`LineBatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemalessProtocol {
    /// InfluxDB-style line protocol.
    #[default]
    Line,
}

impl fmt::Display for SchemalessProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemalessProtocol::Line => f.write_str("line"),
        }
    }
}

/// A batch of schemaless lines with the precision of their timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct LineBatch {
    pub lines: Vec<String>,
    pub protocol: SchemalessProtocol,
    pub precision: TimestampPrecision,
}

/// Statement produced for one table and one batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// One SQL statement covering `rows` records.
    Sql { sql: String, rows: usize },
    /// Schemaless lines.
    Lines(LineBatch),
    /// No record of the batch belongs to the table.
    Empty,
}

impl Statement {
    /// Number of records the statement writes.
    pub fn rows(&self) -> usize {
        match self {
            Statement::Sql { rows, .. } => *rows,
            Statement::Lines(batch) => batch.lines.len(),
            Statement::Empty => 0,
        }
    }
}

/// Renders record batches into statements.
#[derive(Debug, Clone, Copy)]
pub struct StatementBuilder {
    precision: TimestampPrecision,
    ignore_tags_unmatched: bool,
}

impl StatementBuilder {
    /// Create a builder.
    ///
    /// With `ignore_tags_unmatched`, sub table rows whose tag cells differ
    /// from the table's bound tag values are dropped.
    pub fn new(precision: TimestampPrecision, ignore_tags_unmatched: bool) -> Self {
        Self {
            precision,
            ignore_tags_unmatched,
        }
    }

    /// Build the statement writing `records` to the plan's table.
    pub fn build(&self, plan: &TablePlan, records: &[Record]) -> Result<Statement, WriterError> {
        if records.is_empty() {
            return Ok(Statement::Empty);
        }
        match plan.route {
            Route::SuperBySql => self.super_by_sql(plan, records),
            Route::SuperBySchemaless => self.super_by_schemaless(plan, records),
            Route::SubTable => self.sub_table(plan, records),
            Route::NormalTable => self.multi_row(plan, &plan.all, records.iter()),
        }
    }

    /// Comma-separated SQL literals of `columns` for one record.
    pub fn render_tuple(
        &self,
        columns: &[BoundColumn],
        record: &Record,
    ) -> Result<String, WriterError> {
        let literals = columns
            .iter()
            .map(|c| Ok(sql_literal(c.cell(record)?, &c.meta, self.precision)))
            .collect::<Result<Vec<_>, WriterError>>()?;
        Ok(literals.join(","))
    }

    fn super_by_sql(&self, plan: &TablePlan, records: &[Record]) -> Result<Statement, WriterError> {
        let mut sql = String::from("insert into");
        for record in records {
            let tbname = sub_table_name(plan, record)?;
            sql.push_str(&format!(
                " {} using {} tags({}) values({})",
                tbname,
                plan.table,
                self.render_tuple(&plan.tags, record)?,
                self.render_tuple(&plan.values, record)?
            ));
        }
        Ok(Statement::Sql {
            sql,
            rows: records.len(),
        })
    }

    fn super_by_schemaless(
        &self,
        plan: &TablePlan,
        records: &[Record],
    ) -> Result<Statement, WriterError> {
        let ts = plan.timestamp.as_ref().ok_or_else(|| {
            WriterError::Metadata(format!("table {} has no primary key column", plan.table))
        })?;

        let lines = records
            .iter()
            .map(|record| self.line(plan, ts, record))
            .collect::<Result<Vec<_>, WriterError>>()?;

        Ok(Statement::Lines(LineBatch {
            lines,
            protocol: SchemalessProtocol::Line,
            precision: match self.precision {
                TimestampPrecision::Unspecified => TimestampPrecision::Millisecond,
                other => other,
            },
        }))
    }

    /// `table[,tag=value...] field=value[,...] timestamp`
    fn line(
        &self,
        plan: &TablePlan,
        ts: &BoundColumn,
        record: &Record,
    ) -> Result<String, WriterError> {
        let mut line = escape_measurement(&plan.table);

        for tag in &plan.tags {
            if let Some(value) = tag.cell(record)?.as_text() {
                line.push(',');
                line.push_str(&escape_key(&tag.meta.field));
                line.push('=');
                line.push_str(&escape_tag_value(&value));
            }
        }

        let fields = plan
            .fields()
            .map(|c| {
                Ok(format!(
                    "{}={}",
                    escape_key(&c.meta.field),
                    line_value(c.cell(record)?, &c.meta, self.precision)
                ))
            })
            .collect::<Result<Vec<_>, WriterError>>()?;
        line.push(' ');
        line.push_str(&fields.join(","));

        let timestamp = line_timestamp(ts.cell(record)?, &ts.meta, self.precision)?;
        line.push(' ');
        line.push_str(&timestamp.to_string());
        Ok(line)
    }

    fn sub_table(&self, plan: &TablePlan, records: &[Record]) -> Result<Statement, WriterError> {
        let mut selected = Vec::with_capacity(records.len());
        for record in records {
            if let Some(index) = plan.tbname {
                let name = record.get(index).and_then(Cell::as_text);
                if name.as_deref() != Some(plan.table.as_str()) {
                    continue;
                }
            }
            if self.ignore_tags_unmatched && !self.tags_match(plan, record)? {
                tracing::debug!(table = %plan.table, "skip record with unmatched tags");
                continue;
            }
            selected.push(record);
        }

        if selected.is_empty() {
            return Ok(Statement::Empty);
        }
        self.multi_row(plan, &plan.values, selected.into_iter())
    }

    fn tags_match(&self, plan: &TablePlan, record: &Record) -> Result<bool, WriterError> {
        for tag in &plan.tags {
            if !tag_matches(tag.cell(record)?, tag.meta.value.as_ref()) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// `insert into <table> (<columns>) values (..)(..)`
    fn multi_row<'r>(
        &self,
        plan: &TablePlan,
        columns: &[BoundColumn],
        records: impl Iterator<Item = &'r Record>,
    ) -> Result<Statement, WriterError> {
        let mut values = String::new();
        let mut rows = 0;
        for record in records {
            values.push('(');
            values.push_str(&self.render_tuple(columns, record)?);
            values.push(')');
            rows += 1;
        }
        Ok(Statement::Sql {
            sql: format!(
                "insert into {} {} values {}",
                plan.table,
                column_list(columns),
                values
            ),
            rows,
        })
    }
}

fn sub_table_name(plan: &TablePlan, record: &Record) -> Result<String, WriterError> {
    let index = plan.tbname.ok_or_else(|| WriterError::Configuration {
        column: TBNAME.to_string(),
        columns: Vec::new(),
    })?;
    let cell = record.get(index).ok_or_else(|| WriterError::MissingCell {
        index,
        field: TBNAME.to_string(),
    })?;
    match cell.as_text() {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(WriterError::unsupported(cell.kind(), TBNAME)),
    }
}

/// Escape a measurement (table) name.
fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

/// Escape a tag or field key.
fn escape_key(s: &str) -> String {
    s.replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

/// Escape a tag value.
fn escape_tag_value(s: &str) -> String {
    s.replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}
