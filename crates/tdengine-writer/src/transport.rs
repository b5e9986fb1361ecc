// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Statement-execution transport abstraction.
//!
//! The writer only needs two operations from a connection: run a textual SQL
//! statement and get the affected-row count back, and submit a batch of
//! schemaless lines. [`Connector`] opens one connection per run.
//!
//! [`MemoryTransport`] is an in-process implementation that records what it
//! receives. It backs the tests and the CLI dry-run mode.

use crate::error::TransportError;
use crate::statement::LineBatch;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A live connection able to execute statements.
pub trait Transport {
    /// Execute one SQL statement, returning the affected-row count.
    fn execute(&mut self, sql: &str) -> Result<usize, TransportError>;

    /// Submit a batch of schemaless lines. No row count is reported.
    fn write_lines(&mut self, batch: &LineBatch) -> Result<(), TransportError>;
}

/// Opens connections.
pub trait Connector {
    /// Connection type produced by this connector.
    type Connection: Transport;

    /// Open a connection. The caller owns it for the whole run.
    fn connect(
        &self,
        url: &str,
        username: &str,
        password: &str,
    ) -> Result<Self::Connection, TransportError>;
}

/// Everything a [`MemoryTransport`] observed.
#[derive(Debug, Default)]
pub struct MemoryLog {
    /// SQL statements that succeeded, in execution order.
    pub statements: Vec<String>,
    /// Line batches that succeeded, in submission order.
    pub line_batches: Vec<LineBatch>,
    /// Number of statements or batches rejected.
    pub rejected: usize,
    /// Connections opened.
    pub opened: usize,
    /// Connections dropped.
    pub released: usize,
}

impl MemoryLog {
    /// Value tuples of every successful statement, in order.
    pub fn tuples(&self) -> Vec<String> {
        self.statements
            .iter()
            .flat_map(|sql| split_tuples(sql))
            .collect()
    }

    /// Lines of every successful batch, in order.
    pub fn lines(&self) -> Vec<String> {
        self.line_batches
            .iter()
            .flat_map(|b| b.lines.iter().cloned())
            .collect()
    }
}

type RejectFn = Rc<dyn Fn(&str) -> bool>;

/// Recording transport.
///
/// Each SQL statement "affects" as many rows as it has value tuples. A
/// rejection predicate makes matching statements (or batches containing a
/// matching line) fail with [`TransportError::Rejected`].
pub struct MemoryTransport {
    log: Rc<RefCell<MemoryLog>>,
    reject: Option<RejectFn>,
}

impl MemoryTransport {
    /// Create a transport that accepts everything.
    pub fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(MemoryLog::default())),
            reject: None,
        }
    }

    /// Reject statements for which `predicate` returns true.
    pub fn rejecting(mut self, predicate: impl Fn(&str) -> bool + 'static) -> Self {
        self.reject = Some(Rc::new(predicate));
        self
    }

    /// Shared handle to the recorded activity.
    pub fn log(&self) -> Rc<RefCell<MemoryLog>> {
        Rc::clone(&self.log)
    }

    fn is_rejected(&self, text: &str) -> bool {
        self.reject.as_ref().is_some_and(|reject| reject(text))
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("log", &self.log)
            .field("rejecting", &self.reject.is_some())
            .finish()
    }
}

impl Transport for MemoryTransport {
    fn execute(&mut self, sql: &str) -> Result<usize, TransportError> {
        if self.is_rejected(sql) {
            self.log.borrow_mut().rejected += 1;
            return Err(TransportError::Rejected(format!("rejected: {}", sql)));
        }
        let affected = split_tuples(sql).len();
        self.log.borrow_mut().statements.push(sql.to_string());
        Ok(affected)
    }

    fn write_lines(&mut self, batch: &LineBatch) -> Result<(), TransportError> {
        if let Some(line) = batch.lines.iter().find(|l| self.is_rejected(l)) {
            self.log.borrow_mut().rejected += 1;
            return Err(TransportError::Rejected(format!("rejected: {}", line)));
        }
        self.log.borrow_mut().line_batches.push(batch.clone());
        Ok(())
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        self.log.borrow_mut().released += 1;
    }
}

/// Connector handing out [`MemoryTransport`]s that share one [`MemoryLog`].
pub struct MemoryConnector {
    log: Rc<RefCell<MemoryLog>>,
    reject: Option<RejectFn>,
    refuse: bool,
}

impl MemoryConnector {
    /// Create a connector whose connections accept everything.
    pub fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(MemoryLog::default())),
            reject: None,
            refuse: false,
        }
    }

    /// Connections reject statements for which `predicate` returns true.
    pub fn rejecting(mut self, predicate: impl Fn(&str) -> bool + 'static) -> Self {
        self.reject = Some(Rc::new(predicate));
        self
    }

    /// Every `connect` call fails.
    pub fn refusing(mut self) -> Self {
        self.refuse = true;
        self
    }

    /// Shared handle to the recorded activity.
    pub fn log(&self) -> Rc<RefCell<MemoryLog>> {
        Rc::clone(&self.log)
    }
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryConnector")
            .field("log", &self.log)
            .field("rejecting", &self.reject.is_some())
            .field("refuse", &self.refuse)
            .finish()
    }
}

impl Connector for MemoryConnector {
    type Connection = MemoryTransport;

    fn connect(
        &self,
        url: &str,
        _username: &str,
        _password: &str,
    ) -> Result<MemoryTransport, TransportError> {
        if self.refuse {
            return Err(TransportError::Rejected(format!("refused: {}", url)));
        }
        self.log.borrow_mut().opened += 1;
        Ok(MemoryTransport {
            log: Rc::clone(&self.log),
            reject: self.reject.clone(),
        })
    }
}

/// Split an insert statement into the contents of its value tuples.
///
/// A tuple is a top-level parenthesised group following the `values`
/// keyword, or directly following another tuple. Quoted literals are skipped,
/// so parentheses inside strings do not count.
pub fn split_tuples(sql: &str) -> Vec<String> {
    let mut tuples = Vec::new();
    let mut current = String::new();
    let mut word = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut after_values = false;
    let mut capturing = false;

    for c in sql.chars() {
        if let Some(q) = quote {
            if capturing {
                current.push(c);
            }
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' => {
                quote = Some(c);
                if capturing {
                    current.push(c);
                }
            }
            '(' => {
                if depth == 0 {
                    if !word.is_empty() {
                        after_values = word.eq_ignore_ascii_case("values");
                        word.clear();
                    }
                    capturing = after_values;
                } else if capturing {
                    current.push(c);
                }
                depth += 1;
            }
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if capturing {
                        tuples.push(std::mem::take(&mut current));
                    }
                    capturing = false;
                } else if capturing {
                    current.push(c);
                }
            }
            c if depth == 0 && (c.is_alphanumeric() || c == '_') => word.push(c),
            _ if depth == 0 => {
                if !word.is_empty() {
                    after_values = word.eq_ignore_ascii_case("values");
                    word.clear();
                }
            }
            c => {
                if capturing {
                    current.push(c);
                }
            }
        }
    }

    tuples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TimestampPrecision;
    use crate::statement::SchemalessProtocol;

    #[test]
    fn test_split_tuples_normal_insert() {
        let sql = "insert into tbl (ts,f1,t1) values (1000,'x','A')(2000,'y','B')";
        assert_eq!(split_tuples(sql), vec!["1000,'x','A'", "2000,'y','B'"]);
    }

    #[test]
    fn test_split_tuples_ignores_tags_and_quoted_parens() {
        let sql = "insert into tb1 using stb tags('A') values(1000,'a(b)') \
                   tb2 using stb tags('B') values(2000,'it\\'s)')";
        assert_eq!(split_tuples(sql), vec!["1000,'a(b)'", "2000,'it\\'s)'"]);
    }

    #[test]
    fn test_memory_transport_counts_tuples() {
        let mut transport = MemoryTransport::new();
        let affected = transport
            .execute("insert into t (ts) values (1)(2)(3)")
            .expect("execute");
        assert_eq!(affected, 3);
        assert_eq!(transport.log().borrow().statements.len(), 1);
    }

    #[test]
    fn test_memory_transport_rejects_matching_statements() {
        let mut transport = MemoryTransport::new().rejecting(|sql| sql.contains("bad"));
        assert!(transport.execute("insert into t (f) values ('bad')").is_err());
        assert!(transport.execute("insert into t (f) values ('ok')").is_ok());

        let batch = LineBatch {
            lines: vec!["stb f1=1i32 1".to_string(), "stb f1=bad 2".to_string()],
            protocol: SchemalessProtocol::Line,
            precision: TimestampPrecision::Millisecond,
        };
        assert!(transport.write_lines(&batch).is_err());

        let log = transport.log();
        let log = log.borrow();
        assert_eq!(log.rejected, 2);
        assert_eq!(log.statements.len(), 1);
        assert!(log.line_batches.is_empty());
    }

    #[test]
    fn test_memory_connector_tracks_open_and_release() {
        let connector = MemoryConnector::new();
        let log = connector.log();
        {
            let _conn = connector.connect("mem://", "root", "taosdata").expect("connect");
            assert_eq!(log.borrow().opened, 1);
            assert_eq!(log.borrow().released, 0);
        }
        assert_eq!(log.borrow().released, 1);

        assert!(MemoryConnector::new()
            .refusing()
            .connect("mem://", "root", "taosdata")
            .is_err());
    }
}
