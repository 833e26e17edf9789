//! Value and column type definitions
//!
//! Supported types:
//! - string, uri, html, id: UTF-8 text
//! - integer: 64-bit signed integer
//! - decimal: 64-bit floating point
//! - datetime: UTC timestamp
//! - boolean

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Declared type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Integer,
    Decimal,
    DateTime,
    Boolean,
    Uri,
    Html,
    Id,
}

impl ColumnType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Integer => "integer",
            ColumnType::Decimal => "decimal",
            ColumnType::DateTime => "datetime",
            ColumnType::Boolean => "boolean",
            ColumnType::Uri => "uri",
            ColumnType::Html => "html",
            ColumnType::Id => "id",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A typed value, used both for query literals and for stored properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    String(String),
    Long(i64),
    Double(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    Uri(String),
    Html(String),
    Id(String),
}

impl Value {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Long(_) => "long",
            Value::Double(_) => "double",
            Value::Boolean(_) => "boolean",
            Value::DateTime(_) => "datetime",
            Value::Uri(_) => "uri",
            Value::Html(_) => "html",
            Value::Id(_) => "id",
        }
    }

    /// Returns the text if this is a textual value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Uri(s) | Value::Html(s) | Value::Id(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the numeric value widened to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Long(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns true for string, uri, html and id values
    pub fn is_textual(&self) -> bool {
        self.as_str().is_some()
    }

    /// Returns true for long and double values
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Long(_) | Value::Double(_))
    }

    /// Text form used for LIKE matching, full-text indexing and length
    pub fn to_text(&self) -> String {
        match self {
            Value::String(s) | Value::Uri(s) | Value::Html(s) | Value::Id(s) => s.clone(),
            Value::Long(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::Boolean(v) => v.to_string(),
            Value::DateTime(v) => v.to_rfc3339(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) | Value::Uri(s) | Value::Html(s) | Value::Id(s) => {
                write!(f, "'{}'", s.replace('\'', "''"))
            }
            Value::DateTime(v) => write!(f, "TIMESTAMP '{}'", v.to_rfc3339()),
            other => f.write_str(&other.to_text()),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Long(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}
