// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for the writer.
//!
//! Batch-level failures ([`WriterError::UnsupportedType`],
//! [`WriterError::Transport`]) are recovered by the orchestrator through
//! row-at-a-time retry. Everything else aborts the run.

use thiserror::Error;

/// Failure reported by a [`Transport`](crate::transport::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("server error {code}: {desc}")]
    Server { code: i64, desc: String },

    #[error("malformed response: {0}")]
    Response(String),

    #[error("{0}")]
    Rejected(String),
}

/// Errors raised while writing records.
#[derive(Debug, Error)]
pub enum WriterError {
    /// A column needed by a destination table is not part of the configured
    /// column list.
    #[error("cannot find col: {column} in columns: {columns:?}")]
    Configuration {
        column: String,
        columns: Vec<String>,
    },

    /// A cell has no formatting rule for its destination column.
    #[error("invalid column type: {kind} {field}")]
    UnsupportedType { kind: String, field: String },

    /// The record is shorter than the configured column list.
    #[error("record has no cell at position {index} (column {field})")]
    MissingCell { index: usize, field: String },

    /// Statement execution failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Could not open the connection.
    #[error("connection to {url} failed: {source}")]
    Connection {
        url: String,
        #[source]
        source: TransportError,
    },

    /// Table or column metadata could not be resolved.
    #[error("metadata error: {0}")]
    Metadata(String),

    /// The upstream record source failed.
    #[error("record source error: {0}")]
    Source(String),

    /// Invalid job configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl WriterError {
    /// Build an [`WriterError::UnsupportedType`] for a cell kind and field.
    pub fn unsupported(kind: impl std::fmt::Display, field: impl Into<String>) -> Self {
        Self::UnsupportedType {
            kind: kind.to_string(),
            field: field.into(),
        }
    }

    /// Returns true for errors that abort the whole run instead of
    /// triggering row-level fallback.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::UnsupportedType { .. } | Self::MissingCell { .. } | Self::Transport(_)
        )
    }
}
