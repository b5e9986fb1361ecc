// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability over pedantic
#![allow(clippy::unreadable_literal)] // Large test constants
#![allow(clippy::too_many_lines)] // Test code

//! End-to-end write tests through the in-memory connector.

use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;
use tdengine_writer::schema::{TableSchema, TagValue};
use tdengine_writer::source::{DirtyFileWriter, JsonLinesSource};
use tdengine_writer::transport::MemoryLog;
use tdengine_writer::{
    Cell, ColumnMeta, DataHandler, DirtyRecords, MemoryConnector, Record, StaticSchemaLoader,
    TableKind, TimestampPrecision, VecSource, WriteSummary, WriterConfig, WriterError,
};

fn config(tables: &[&str], columns: &[&str], batch_size: usize) -> WriterConfig {
    let mut builder = WriterConfig::builder()
        .jdbc_url("jdbc:TAOS-RS://localhost:6041/test")
        .batch_size(batch_size)
        .columns(columns.iter().copied())
        .ignore_tags_unmatched(true);
    for table in tables {
        builder = builder.table(*table);
    }
    builder.build()
}

fn run(
    config: WriterConfig,
    connector: MemoryConnector,
    tables: Vec<TableSchema>,
    records: Vec<Record>,
) -> (Result<WriteSummary, WriterError>, DirtyRecords, Rc<RefCell<MemoryLog>>) {
    let log = connector.log();
    let loader = StaticSchemaLoader::new(TimestampPrecision::Millisecond, tables);
    let mut handler = DataHandler::new(config, connector, loader);
    let mut dirty = DirtyRecords::new();
    let result = handler.handle(&mut VecSource::new(records), &mut dirty);
    (result, dirty, log)
}

fn normal_table() -> TableSchema {
    TableSchema {
        name: "tbl".to_string(),
        kind: TableKind::Normal,
        columns: vec![
            ColumnMeta::primary_key("ts"),
            ColumnMeta::field("f1", "NCHAR(16)"),
            ColumnMeta::field("t1", "NCHAR(16)"),
        ],
    }
}

fn row(ts: i64, f1: &str, t1: &str) -> Record {
    Record::new(vec![Cell::Long(ts), Cell::text(f1), Cell::text(t1)])
}

#[test]
fn test_normal_table_example_statement() {
    let (result, dirty, log) = run(
        config(&["tbl"], &["ts", "f1", "t1"], 1000),
        MemoryConnector::new(),
        vec![normal_table()],
        vec![row(1000, "x", "A"), row(2000, "y", "B")],
    );

    let summary = result.expect("handle");
    assert_eq!(summary.affected_rows, 2);
    assert!(dirty.is_empty());
    assert_eq!(
        log.borrow().statements,
        vec!["insert into tbl (ts,f1,t1) values (1000,'x','A')(2000,'y','B')".to_string()]
    );
}

#[test]
fn test_tuples_replay_in_record_order() {
    let records: Vec<Record> = (1..=7)
        .map(|i| row(i * 1000, &format!("v{}", i), "A"))
        .collect();
    let (result, _, log) = run(
        config(&["tbl"], &["ts", "f1", "t1"], 3),
        MemoryConnector::new(),
        vec![normal_table()],
        records,
    );

    assert_eq!(result.expect("handle").affected_rows, 7);
    let expected: Vec<String> = (1..=7)
        .map(|i| format!("{},'v{}','A'", i * 1000, i))
        .collect();
    assert_eq!(log.borrow().tuples(), expected);
    assert_eq!(log.borrow().statements.len(), 3);
}

#[test]
fn test_fallback_recovers_whole_batch() {
    // Multi-row statements fail, single-row statements succeed.
    let connector = MemoryConnector::new().rejecting(|sql| sql.contains(")("));
    let (result, dirty, log) = run(
        config(&["tbl"], &["ts", "f1", "t1"], 4),
        connector,
        vec![normal_table()],
        (1..=4).map(|i| row(i, "x", "A")).collect(),
    );

    let summary = result.expect("handle");
    assert_eq!(summary.affected_rows, 4);
    assert_eq!(summary.dirty_records, 0);
    assert!(dirty.is_empty());
    let log = log.borrow();
    assert_eq!(log.rejected, 1);
    assert_eq!(log.statements.len(), 4);
}

#[test]
fn test_failing_row_is_isolated() {
    let connector = MemoryConnector::new().rejecting(|sql| sql.contains("'row3'"));
    let records: Vec<Record> = (1..=5)
        .map(|i| row(i * 1000, &format!("row{}", i), "A"))
        .collect();
    let (result, dirty, log) = run(
        config(&["tbl"], &["ts", "f1", "t1"], 5),
        connector,
        vec![normal_table()],
        records.clone(),
    );

    let summary = result.expect("handle");
    assert_eq!(
        summary,
        WriteSummary {
            total_records: 5,
            affected_rows: 4,
            dirty_records: 1,
        }
    );
    assert_eq!(dirty.len(), 1);
    assert_eq!(dirty.entries()[0].record, records[2]);
    assert!(dirty.entries()[0].error.contains("row3"));
    assert_eq!(log.borrow().released, 1);
}

fn sub_table() -> TableSchema {
    TableSchema {
        name: "d1".to_string(),
        kind: TableKind::Sub,
        columns: vec![
            ColumnMeta::primary_key("ts"),
            ColumnMeta::field("f1", "NCHAR(16)"),
            ColumnMeta::tag("t1", "NCHAR(16)").with_value(TagValue::Text("A".to_string())),
        ],
    }
}

#[test]
fn test_sub_table_keeps_only_matching_tags() {
    let (result, dirty, log) = run(
        config(&["d1"], &["ts", "f1", "t1"], 10),
        MemoryConnector::new(),
        vec![sub_table()],
        vec![row(1, "a", "A"), row(2, "b", "B"), row(3, "c", "A"), row(4, "d", "B")],
    );

    let summary = result.expect("handle");
    assert_eq!(summary.affected_rows, 2);
    assert_eq!(summary.total_records, 4);
    assert!(dirty.is_empty());
    assert_eq!(
        log.borrow().statements,
        vec!["insert into d1 (ts,f1) values (1,'a')(3,'c')".to_string()]
    );
}

#[test]
fn test_every_batch_goes_to_every_table() {
    let (result, _, log) = run(
        config(&["tbl", "d1"], &["ts", "f1", "t1"], 2),
        MemoryConnector::new(),
        vec![normal_table(), sub_table()],
        vec![row(1, "a", "A"), row(2, "b", "A"), row(3, "c", "B")],
    );

    assert_eq!(result.expect("handle").affected_rows, 5);
    let log = log.borrow();
    let tables: Vec<&str> = log
        .statements
        .iter()
        .map(|sql| sql.split_whitespace().nth(2).unwrap_or_default())
        .collect();
    // Second batch has no row for d1, so no statement is sent for it.
    assert_eq!(tables, vec!["tbl", "d1", "tbl"]);
}

fn super_table() -> TableSchema {
    TableSchema {
        name: "meters".to_string(),
        kind: TableKind::Super,
        columns: vec![
            ColumnMeta::primary_key("ts"),
            ColumnMeta::field("current", "FLOAT"),
            ColumnMeta::tag("location", "NCHAR(32)"),
        ],
    }
}

#[test]
fn test_super_table_with_tbname_uses_sql() {
    let records = vec![
        Record::new(vec![
            Cell::text("d1001"),
            Cell::Date(1000),
            Cell::Double(10.5),
            Cell::text("paris"),
        ]),
        Record::new(vec![
            Cell::text("d1002"),
            Cell::Date(2000),
            Cell::Double(11.0),
            Cell::text("lyon"),
        ]),
    ];
    let (result, _, log) = run(
        config(&["meters"], &["tbname", "ts", "current", "location"], 10),
        MemoryConnector::new(),
        vec![super_table()],
        records,
    );

    assert_eq!(result.expect("handle").affected_rows, 2);
    assert_eq!(
        log.borrow().statements,
        vec![
            "insert into d1001 using meters tags('paris') values(1000,10.5) \
             d1002 using meters tags('lyon') values(2000,11)"
                .to_string()
        ]
    );
}

#[test]
fn test_super_table_without_tbname_uses_schemaless() {
    let records = vec![Record::new(vec![
        Cell::Date(1000),
        Cell::Double(10.5),
        Cell::text("new york"),
    ])];
    let (result, _, log) = run(
        config(&["meters"], &["ts", "current", "location"], 10),
        MemoryConnector::new(),
        vec![super_table()],
        records,
    );

    assert_eq!(result.expect("handle").affected_rows, 1);
    let log = log.borrow();
    assert!(log.statements.is_empty());
    assert_eq!(
        log.lines(),
        vec!["meters,location=new\\ york current=10.5f32 1000".to_string()]
    );
    assert_eq!(log.line_batches[0].precision, TimestampPrecision::Millisecond);
}

#[test]
fn test_schemaless_bad_timestamp_goes_to_dirty() {
    let records = vec![
        Record::new(vec![Cell::Date(1000), Cell::Double(1.0), Cell::text("a")]),
        Record::new(vec![Cell::Bool(true), Cell::Double(2.0), Cell::text("b")]),
    ];
    let (result, dirty, log) = run(
        config(&["meters"], &["ts", "current", "location"], 10),
        MemoryConnector::new(),
        vec![super_table()],
        records,
    );

    let summary = result.expect("handle");
    assert_eq!(summary.affected_rows, 1);
    assert_eq!(summary.dirty_records, 1);
    assert_eq!(dirty.entries()[0].error, "invalid column type: BOOL ts");
    assert_eq!(log.borrow().lines().len(), 1);
}

#[test]
fn test_configured_column_missing_aborts_before_writing() {
    let (result, _, log) = run(
        config(&["meters"], &["current", "location"], 10),
        MemoryConnector::new(),
        vec![super_table()],
        vec![Record::new(vec![Cell::Double(1.0), Cell::text("a")])],
    );

    let err = result.unwrap_err();
    assert_eq!(
        err.to_string(),
        "cannot find col: ts in columns: [\"current\", \"location\"]"
    );
    let log = log.borrow();
    assert!(log.statements.is_empty() && log.line_batches.is_empty());
    assert_eq!(log.opened, log.released);
}

#[test]
fn test_json_lines_to_dirty_file() {
    let input = "[1000, \"ok\", \"A\"]\n[2000, \"boom\", \"A\"]\n";
    let connector = MemoryConnector::new().rejecting(|sql| sql.contains("'boom'"));
    let log = connector.log();
    let loader = StaticSchemaLoader::new(TimestampPrecision::Millisecond, vec![normal_table()]);
    let mut handler = DataHandler::new(config(&["tbl"], &["ts", "f1", "t1"], 10), connector, loader);

    let mut source = JsonLinesSource::new(Cursor::new(input));
    let mut dirty = DirtyFileWriter::new(Vec::new());
    let summary = handler.handle(&mut source, &mut dirty).expect("handle");

    assert_eq!(summary.affected_rows, 1);
    assert_eq!(dirty.written(), 1);
    let output = String::from_utf8(dirty.into_inner().expect("flush")).expect("utf8");
    assert!(output.contains("\"boom\""));
    assert_eq!(log.borrow().tuples(), vec!["1000,'ok','A'".to_string()]);
}
