// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! TDengine batch writer
//!
//! Writes a stream of positional records into TDengine super tables, sub
//! tables and normal tables.
//!
//! This crate provides:
//! - Value formatting for SQL inserts and schemaless line protocol
//! - Four statement encoders selected per table kind
//! - Fixed-size batching with row-at-a-time fallback and dirty record
//!   isolation
//! - A REST transport for taosAdapter and an in-memory transport
//! - TOML job configuration
//!
//! # Overview
//!
//! ```text
//! RecordSource --> BatchBuffer --> StatementBuilder --> BatchExecutor --> Transport
//!                                       |                    |
//!                                  TablePlan           (on failure) row fallback
//!                                                            |
//!                                                   DirtyRecordCollector
//! ```

pub mod buffer;
pub mod columns;
pub mod config;
pub mod error;
pub mod executor;
pub mod format;
pub mod handler;
pub mod record;
pub mod rest;
pub mod schema;
pub mod source;
pub mod statement;
pub mod tags;
pub mod transport;

pub use columns::{ConfiguredColumns, Route, TablePlan};
pub use config::WriterConfig;
pub use error::{TransportError, WriterError};
pub use executor::BatchExecutor;
pub use handler::{DataHandler, WriteSummary};
pub use record::{Cell, DirtyRecordCollector, DirtyRecords, Record, RecordSource, VecSource};
pub use rest::RestConnector;
pub use schema::{ColumnMeta, Schema, SchemaLoader, StaticSchemaLoader, TableKind, TimestampPrecision};
pub use statement::{Statement, StatementBuilder};
pub use transport::{Connector, MemoryConnector, MemoryTransport, Transport};
