// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runs built statements on the run's connection.

use crate::error::WriterError;
use crate::statement::Statement;
use crate::transport::Transport;

/// Owns the connection for the duration of a run.
///
/// The connection is released when the executor is dropped.
#[derive(Debug)]
pub struct BatchExecutor<T: Transport> {
    transport: T,
}

impl<T: Transport> BatchExecutor<T> {
    /// Wrap an open connection.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Execute a statement and return the affected-row count.
    ///
    /// Schemaless batches are one opaque write. The server reports no row
    /// count for them, so the number of submitted lines is returned.
    pub fn run(&mut self, statement: &Statement) -> Result<usize, WriterError> {
        match statement {
            Statement::Empty => Ok(0),
            Statement::Sql { sql, .. } => {
                tracing::debug!(">>> {}", sql);
                Ok(self.transport.execute(sql)?)
            }
            Statement::Lines(batch) => {
                tracing::debug!(
                    lines = batch.lines.len(),
                    protocol = %batch.protocol,
                    precision = ?batch.precision,
                    ">>> schemaless write"
                );
                self.transport.write_lines(batch)?;
                tracing::warn!(
                    lines = batch.lines.len(),
                    "schemaless write does not report affected rows, counting submitted lines"
                );
                Ok(batch.lines.len())
            }
        }
    }

    /// Underlying connection.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
