//! Live Oracle implementation of the source boundary.
//!
//! Compiled only with the `oracle-client` feature. Connects with an easy
//! connect address (`host:port/service`), sets a per-call timeout so a hung
//! instance fails the current category instead of stalling the run, and
//! coerces every column into [`SqlValue`].

use std::time::Duration;

use anyhow::{Context, Result};

use super::{Params, Row, SourceConnection, SqlValue};

/// Per-query call timeout. A timed-out query surfaces as a category
/// failure in the dispatcher, not as a fatal error.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct OracleSource {
    conn: oracle::Connection,
}

impl OracleSource {
    /// Open a session as `username` against `address`.
    pub fn connect(address: &str, username: &str, password: &str) -> Result<Self> {
        let conn = oracle::Connection::connect(username, password, address)
            .with_context(|| format!("cannot connect to {}@{}", username, address))?;
        conn.set_call_timeout(Some(CALL_TIMEOUT))
            .context("cannot set call timeout")?;
        Ok(OracleSource { conn })
    }

    fn convert(value: &oracle::SqlValue) -> SqlValue {
        if value.is_null().unwrap_or(true) {
            return SqlValue::Null;
        }
        if let Ok(v) = value.get::<i64>() {
            return SqlValue::Int(v);
        }
        if let Ok(v) = value.get::<f64>() {
            return SqlValue::Float(v);
        }
        if let Ok(v) = value.get::<String>() {
            return SqlValue::Text(v);
        }
        SqlValue::Null
    }
}

impl SourceConnection for OracleSource {
    fn current_user(&self) -> Result<String> {
        let row = self
            .conn
            .query_row("SELECT USER FROM DUAL", &[])
            .context("cannot read current user")?;
        let user: String = row.get(0).context("current user column")?;
        Ok(user)
    }

    fn query(&self, sql: &str, params: Params) -> Result<Vec<Row>> {
        let named: Vec<(&str, &dyn oracle::sql_type::ToSql)> = params
            .iter()
            .map(|(name, value)| (*name, value as &dyn oracle::sql_type::ToSql))
            .collect();
        let rows = self
            .conn
            .query_named(sql, &named)
            .with_context(|| format!("query failed: {}", first_line(sql)))?;

        let mut out = Vec::new();
        for row in rows {
            let row = row.context("row fetch failed")?;
            let values = row.sql_values().iter().map(Self::convert).collect();
            out.push(Row::new(values));
        }
        Ok(out)
    }
}

fn first_line(sql: &str) -> &str {
    sql.trim_start().lines().next().unwrap_or("")
}
