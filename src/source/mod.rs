//! Source-instance boundary.
//!
//! The classifier, scope resolver and extraction dispatcher are written
//! against [`SourceConnection`] so they run identically over a live Oracle
//! session and over canned fixtures in tests. The live client lives in
//! [`oracle_client`] behind the `oracle-client` feature.

use anyhow::Result;

#[cfg(feature = "oracle-client")]
pub mod oracle_client;

#[cfg(feature = "oracle-client")]
pub use oracle_client::OracleSource;

/// One cell of a metadata-query result row.
///
/// Catalog views return a small value universe; everything downstream is
/// normalized into named records, so lenient coercion here is fine.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    pub fn as_i64(&self) -> i64 {
        match self {
            SqlValue::Null => 0,
            SqlValue::Int(v) => *v,
            SqlValue::Float(v) => *v as i64,
            SqlValue::Text(s) => s.trim().parse().unwrap_or(0),
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            SqlValue::Null => 0.0,
            SqlValue::Int(v) => *v as f64,
            SqlValue::Float(v) => *v,
            SqlValue::Text(s) => s.trim().parse().unwrap_or(0.0),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            SqlValue::Null => String::new(),
            SqlValue::Int(v) => v.to_string(),
            SqlValue::Float(v) => v.to_string(),
            SqlValue::Text(s) => s.clone(),
        }
    }

    pub fn as_opt_text(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            other => Some(other.as_text()),
        }
    }
}

/// One result row. Accessors are positional against the column order of
/// the query that produced the row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub values: Vec<SqlValue>,
}

impl Row {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Row { values }
    }

    fn value(&self, idx: usize) -> &SqlValue {
        self.values.get(idx).unwrap_or(&SqlValue::Null)
    }

    pub fn text(&self, idx: usize) -> String {
        self.value(idx).as_text()
    }

    pub fn opt_text(&self, idx: usize) -> Option<String> {
        self.value(idx).as_opt_text()
    }

    pub fn int(&self, idx: usize) -> i64 {
        self.value(idx).as_i64()
    }

    pub fn float(&self, idx: usize) -> f64 {
        self.value(idx).as_f64()
    }
}

/// Named bind parameters for a metadata query.
pub type Params<'a> = &'a [(&'a str, &'a str)];

/// A synchronous session against one source instance.
///
/// All metadata access goes through `query`; a failing query is scored or
/// recovered by the caller, never retried here.
pub trait SourceConnection {
    /// The authenticated principal's schema name.
    fn current_user(&self) -> Result<String>;

    /// Run one metadata query with named bind parameters.
    fn query(&self, sql: &str, params: Params) -> Result<Vec<Row>>;
}
