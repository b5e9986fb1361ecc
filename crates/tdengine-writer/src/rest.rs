// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! REST transport to a taosAdapter endpoint.
//!
//! - SQL: `POST <base>/rest/sql/<db>`, statement as the body, basic auth.
//! - Schemaless: `POST <base>/influxdb/v1/write?db=<db>&precision=<p>`,
//!   newline-separated lines.

use crate::error::TransportError;
use crate::schema::TimestampPrecision;
use crate::statement::LineBatch;
use crate::transport::{Connector, Transport};
use reqwest::blocking::{Client, Response};
use serde_json::Value;
use std::time::Duration;

const JDBC_REST_PREFIX: &str = "jdbc:TAOS-RS://";
const JDBC_NATIVE_PREFIX: &str = "jdbc:TAOS://";

/// Statement sent on connect to check the endpoint and credentials.
const PING_SQL: &str = "select server_version()";

/// Database endpoint parsed from a connection URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestEndpoint {
    /// `http://host:port`.
    pub base_url: String,
    /// Database name.
    pub database: String,
}

impl RestEndpoint {
    /// Parse `jdbc:TAOS-RS://host:port/db[?params]`.
    ///
    /// Native `jdbc:TAOS://` URLs need the client driver and are rejected.
    pub fn from_jdbc_url(url: &str) -> Result<Self, TransportError> {
        let url = url.trim();
        if starts_with_ignore_case(url, JDBC_NATIVE_PREFIX) {
            return Err(TransportError::Rejected(format!(
                "native connection is not supported, use {}: {}",
                JDBC_REST_PREFIX, url
            )));
        }
        if !starts_with_ignore_case(url, JDBC_REST_PREFIX) {
            return Err(TransportError::Rejected(format!("unsupported URL: {}", url)));
        }

        let rest = &url[JDBC_REST_PREFIX.len()..];
        let rest = rest.split('?').next().unwrap_or_default();
        let (authority, database) = rest.split_once('/').unwrap_or((rest, ""));
        let database = database.trim_end_matches('/');

        if authority.is_empty() {
            return Err(TransportError::Rejected(format!("missing host: {}", url)));
        }
        if database.is_empty() || database.contains('/') {
            return Err(TransportError::Rejected(format!("missing database: {}", url)));
        }

        Ok(Self {
            base_url: format!("http://{}", authority),
            database: database.to_string(),
        })
    }

    /// SQL endpoint.
    pub fn sql_url(&self) -> String {
        format!("{}/rest/sql/{}", self.base_url, self.database)
    }

    /// Schemaless endpoint for a batch precision.
    pub fn line_url(&self, precision: TimestampPrecision) -> String {
        let mut url = format!("{}/influxdb/v1/write?db={}", self.base_url, self.database);
        let unit = match precision {
            TimestampPrecision::Millisecond => Some("ms"),
            TimestampPrecision::Microsecond => Some("u"),
            TimestampPrecision::Nanosecond => Some("ns"),
            TimestampPrecision::Unspecified => None,
        };
        if let Some(unit) = unit {
            url.push_str("&precision=");
            url.push_str(unit);
        }
        url
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Opens [`RestTransport`] connections.
#[derive(Debug, Clone, Default)]
pub struct RestConnector {
    timeout: Option<Duration>,
}

impl RestConnector {
    /// Create a connector without request timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Connector for RestConnector {
    type Connection = RestTransport;

    fn connect(
        &self,
        url: &str,
        username: &str,
        password: &str,
    ) -> Result<RestTransport, TransportError> {
        let endpoint = RestEndpoint::from_jdbc_url(url)?;
        let mut builder = Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let mut transport = RestTransport {
            client: builder.build()?,
            endpoint,
            username: username.to_string(),
            password: password.to_string(),
        };
        transport.execute(PING_SQL)?;
        tracing::debug!(url = %transport.endpoint.sql_url(), "REST endpoint reachable");
        Ok(transport)
    }
}

/// Blocking HTTP connection to taosAdapter.
#[derive(Debug)]
pub struct RestTransport {
    client: Client,
    endpoint: RestEndpoint,
    username: String,
    password: String,
}

impl RestTransport {
    /// Endpoint this transport writes to.
    pub fn endpoint(&self) -> &RestEndpoint {
        &self.endpoint
    }

    fn post(&self, url: &str, body: String) -> Result<Response, TransportError> {
        Ok(self
            .client
            .post(url)
            .basic_auth(&self.username, Some(&self.password))
            .body(body)
            .send()?)
    }
}

impl Transport for RestTransport {
    fn execute(&mut self, sql: &str) -> Result<usize, TransportError> {
        let response = self.post(&self.endpoint.sql_url(), sql.to_string())?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(server_error(&body).unwrap_or(TransportError::Status {
                status: status.as_u16(),
                body,
            }));
        }
        let reply: Value = response.json()?;
        affected_rows(&reply)
    }

    fn write_lines(&mut self, batch: &LineBatch) -> Result<(), TransportError> {
        let url = self.endpoint.line_url(batch.precision);
        let response = self.post(&url, batch.lines.join("\n"))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().unwrap_or_default();
        Err(server_error(&body).unwrap_or(TransportError::Status {
            status: status.as_u16(),
            body,
        }))
    }
}

/// Error carried by a JSON reply body, if any.
fn server_error(body: &str) -> Option<TransportError> {
    let reply: Value = serde_json::from_str(body).ok()?;
    reply_error(&reply)
}

fn reply_error(reply: &Value) -> Option<TransportError> {
    let code = reply.get("code").and_then(Value::as_i64).unwrap_or(0);
    let failed = code != 0 || reply.get("status").and_then(Value::as_str) == Some("error");
    if !failed {
        return None;
    }
    let desc = reply
        .get("desc")
        .or_else(|| reply.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    Some(TransportError::Server { code, desc })
}

/// Affected-row count of a successful SQL reply (`data[0][0]`).
fn affected_rows(reply: &Value) -> Result<usize, TransportError> {
    if let Some(err) = reply_error(reply) {
        return Err(err);
    }
    let first = reply
        .get("data")
        .and_then(|data| data.get(0))
        .and_then(|row| row.get(0));
    match first {
        Some(value) => Ok(value.as_u64().map_or(0, |n| n as usize)),
        None if reply.get("data").is_some() => Ok(0),
        None => Err(TransportError::Response(format!(
            "no data in reply: {}",
            reply
        ))),
    }
}
