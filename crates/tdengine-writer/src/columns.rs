// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Mapping between record positions and destination columns.
//!
//! [`ConfiguredColumns`] is the ordered column list the record stream
//! supplies. [`TablePlan`] selects, for one destination table, the columns
//! that take part in each statement part (tags, values, timestamp) in
//! declaration order, with their record positions resolved up front.

use crate::error::WriterError;
use crate::record::{Cell, Record};
use crate::schema::{ColumnMeta, TableKind, TableMeta};

/// Name of the pseudo-column carrying the destination sub table name.
pub const TBNAME: &str = "tbname";

/// Ordered list of column names supplied by the record stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredColumns {
    names: Vec<String>,
}

impl ConfiguredColumns {
    /// Create the list in record order.
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Record position of `name`.
    pub fn index_of(&self, name: &str) -> Result<usize, WriterError> {
        self.names
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| WriterError::Configuration {
                column: name.to_string(),
                columns: self.names.clone(),
            })
    }

    /// Check if `name` is configured.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|c| c == name)
    }

    /// Check if the `tbname` pseudo-column is configured.
    pub fn has_tbname(&self) -> bool {
        self.contains(TBNAME)
    }

    /// Column names in record order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of configured columns.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if no column is configured.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A destination column paired with the record position feeding it.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundColumn {
    /// Destination column description.
    pub meta: ColumnMeta,
    /// Position in the record.
    pub index: usize,
}

impl BoundColumn {
    /// Cell feeding this column.
    pub fn cell<'r>(&self, record: &'r Record) -> Result<&'r Cell, WriterError> {
        record.get(self.index).ok_or_else(|| WriterError::MissingCell {
            index: self.index,
            field: self.meta.field.clone(),
        })
    }
}

/// How rows reach a destination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `insert into <tbname> using <stb> tags(...) values(...)` per row.
    SuperBySql,
    /// Schemaless lines, one per row.
    SuperBySchemaless,
    /// Multi-row insert into a sub table, filtered by name and tags.
    SubTable,
    /// Multi-row insert into a normal table.
    NormalTable,
}

/// Per-table column selection, resolved once per run.
#[derive(Debug, Clone, PartialEq)]
pub struct TablePlan {
    /// Table name.
    pub table: String,
    /// Statement shape.
    pub route: Route,
    /// Configured tag columns, declaration order.
    pub tags: Vec<BoundColumn>,
    /// Configured non-tag columns, declaration order.
    pub values: Vec<BoundColumn>,
    /// Every configured column, declaration order.
    pub all: Vec<BoundColumn>,
    /// Primary timestamp column (schemaless route only).
    pub timestamp: Option<BoundColumn>,
    /// Record position of `tbname`, when configured.
    pub tbname: Option<usize>,
}

impl TablePlan {
    /// Classify a table and bind its configured columns.
    ///
    /// Fails with [`WriterError::Configuration`] when the route needs a column
    /// the record stream does not supply.
    pub fn new(
        meta: &TableMeta,
        columns: &[ColumnMeta],
        configured: &ConfiguredColumns,
    ) -> Result<Self, WriterError> {
        let route = match meta.kind {
            TableKind::Super if configured.has_tbname() => Route::SuperBySql,
            TableKind::Super => Route::SuperBySchemaless,
            TableKind::Sub => Route::SubTable,
            TableKind::Normal => Route::NormalTable,
        };

        let mut tags = Vec::new();
        let mut values = Vec::new();
        let mut all = Vec::new();
        for column in columns.iter().filter(|c| configured.contains(&c.field)) {
            let bound = BoundColumn {
                meta: column.clone(),
                index: configured.index_of(&column.field)?,
            };
            if column.is_tag {
                tags.push(bound.clone());
            } else {
                values.push(bound.clone());
            }
            all.push(bound);
        }

        let timestamp = if route == Route::SuperBySchemaless {
            let pk = columns.iter().find(|c| c.is_primary_key).ok_or_else(|| {
                WriterError::Metadata(format!("table {} has no primary key column", meta.name))
            })?;
            Some(BoundColumn {
                meta: pk.clone(),
                index: configured.index_of(&pk.field)?,
            })
        } else {
            None
        };

        let tbname = if configured.has_tbname() {
            Some(configured.index_of(TBNAME)?)
        } else {
            None
        };

        Ok(Self {
            table: meta.name.clone(),
            route,
            tags,
            values,
            all,
            timestamp,
            tbname,
        })
    }

    /// Schemaless field columns: non-tag columns other than the timestamp.
    pub fn fields(&self) -> impl Iterator<Item = &BoundColumn> {
        self.values.iter().filter(|c| !c.meta.is_primary_key)
    }
}

/// Render a column-name list: `(ts,f1,f2)`.
pub fn column_list(columns: &[BoundColumn]) -> String {
    let names: Vec<&str> = columns.iter().map(|c| c.meta.field.as_str()).collect();
    format!("({})", names.join(","))
}
