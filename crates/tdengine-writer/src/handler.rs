// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Write orchestration.
//!
//! [`DataHandler::handle`] drains a record source into fixed-size batches and
//! writes every batch to every destination table. A batch that fails is
//! retried one record at a time; records that still fail go to the dirty
//! record collector and the run continues.

use crate::buffer::BatchBuffer;
use crate::columns::TablePlan;
use crate::config::WriterConfig;
use crate::error::WriterError;
use crate::executor::BatchExecutor;
use crate::record::{DirtyRecordCollector, Record, RecordSource};
use crate::schema::{Schema, SchemaLoader};
use crate::statement::StatementBuilder;
use crate::transport::{Connector, Transport};
use serde::Serialize;

/// Outcome of one [`DataHandler::handle`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    /// Records pulled from the source.
    pub total_records: u64,
    /// Rows reported written, summed over tables.
    pub affected_rows: u64,
    /// Records handed to the dirty record collector.
    pub dirty_records: u64,
}

/// Writes a record stream to the configured tables.
pub struct DataHandler<C, L> {
    config: WriterConfig,
    connector: C,
    loader: L,
    schema: Option<Schema>,
}

impl<C: Connector, L: SchemaLoader> DataHandler<C, L> {
    /// Create a handler. Nothing is opened until [`handle`](Self::handle).
    pub fn new(config: WriterConfig, connector: C, loader: L) -> Self {
        Self {
            config,
            connector,
            loader,
            schema: None,
        }
    }

    /// Metadata loaded by a previous run, if any.
    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    /// Write every record of `source`.
    ///
    /// Fails only on fatal errors: connection, metadata, configured column
    /// lookup, or source failures. The connection is released on return.
    pub fn handle(
        &mut self,
        source: &mut dyn RecordSource,
        collector: &mut dyn DirtyRecordCollector,
    ) -> Result<WriteSummary, WriterError> {
        let connection = self
            .connector
            .connect(
                &self.config.jdbc_url,
                &self.config.username,
                &self.config.password,
            )
            .map_err(|source| WriterError::Connection {
                url: self.config.jdbc_url.clone(),
                source,
            })?;
        tracing::info!(url = %self.config.jdbc_url, "connected");

        let mut executor = BatchExecutor::new(connection);
        let plans = self.plans(executor.transport_mut())?;
        let precision = self
            .schema
            .as_ref()
            .map(Schema::precision)
            .unwrap_or_default();

        let mut writer = BatchWriter {
            executor,
            builder: StatementBuilder::new(precision, self.config.ignore_tags_unmatched),
            plans: &plans,
        };
        let mut buffer = BatchBuffer::new(self.config.batch_size);
        let mut summary = WriteSummary::default();

        while let Some(record) = source.next_record()? {
            if let Some(batch) = buffer.push(record) {
                writer.write(&batch, collector, &mut summary)?;
            }
        }
        let tail = buffer.flush();
        if !tail.is_empty() {
            writer.write(&tail, collector, &mut summary)?;
        }
        summary.total_records = buffer.seen();

        if summary.affected_rows != summary.total_records {
            tracing::error!(
                affected = summary.affected_rows,
                total = summary.total_records,
                "affected rows do not match records received"
            );
        }
        tracing::info!(
            total = summary.total_records,
            affected = summary.affected_rows,
            dirty = summary.dirty_records,
            "write finished"
        );
        Ok(summary)
    }

    /// Load metadata on first use and bind every destination table.
    fn plans(&mut self, transport: &mut dyn Transport) -> Result<Vec<TablePlan>, WriterError> {
        if self.schema.is_none() {
            let schema = self.loader.load(transport, &self.config.table)?;
            tracing::info!(
                tables = self.config.table.len(),
                precision = ?schema.precision(),
                "table metadata loaded"
            );
            self.schema = Some(schema);
        }
        let schema = self
            .schema
            .as_ref()
            .ok_or_else(|| WriterError::Metadata("table metadata not loaded".into()))?;

        let columns = self.config.columns();
        self.config
            .table
            .iter()
            .map(|table| TablePlan::new(schema.table(table)?, schema.columns(table)?, &columns))
            .collect()
    }
}

struct BatchWriter<'a, T: Transport> {
    executor: BatchExecutor<T>,
    builder: StatementBuilder,
    plans: &'a [TablePlan],
}

impl<T: Transport> BatchWriter<'_, T> {
    /// Write one batch to every table.
    fn write_batch(&mut self, records: &[Record]) -> Result<u64, WriterError> {
        let mut affected = 0;
        for plan in self.plans {
            let statement = self.builder.build(plan, records)?;
            affected += self.executor.run(&statement)? as u64;
        }
        Ok(affected)
    }

    /// Write a batch, falling back to one record at a time on failure.
    fn write(
        &mut self,
        batch: &[Record],
        collector: &mut dyn DirtyRecordCollector,
        summary: &mut WriteSummary,
    ) -> Result<(), WriterError> {
        let err = match self.write_batch(batch) {
            Ok(affected) => {
                summary.affected_rows += affected;
                return Ok(());
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => err,
        };

        tracing::warn!(error = %err, records = batch.len(), "use one row insert");
        for record in batch {
            match self.write_batch(std::slice::from_ref(record)) {
                Ok(affected) => summary.affected_rows += affected,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    collector.collect_dirty(record, &err);
                    summary.dirty_records += 1;
                }
            }
        }
        Ok(())
    }
}
