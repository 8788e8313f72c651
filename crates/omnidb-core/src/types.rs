//! Value and metadata types shared by the core and every backend

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Outcome of a `result()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultStatus {
    /// No data became ready within the timeout; call again
    Timeout,
    /// A statement completed without producing rows
    NoRows,
    /// A chunk of rows is buffered and ready for `row_fetch`
    Rows,
    /// No further result sets
    Done,
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::NoRows => write!(f, "NOROWS"),
            Self::Rows => write!(f, "ROWS"),
            Self::Done => write!(f, "DONE"),
        }
    }
}

/// Outcome of a `row_fetch()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    /// The cursor moved onto a row
    Row,
    /// The current chunk is exhausted
    Done,
}

/// Authentication scheme passed to `bind`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindMethod {
    /// Plain user name and credential
    #[default]
    Simple,
    /// SASL with the named mechanism
    Sasl { mechanism: String },
}

impl fmt::Display for BindMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Sasl { mechanism } => write!(f, "sasl/{}", mechanism),
        }
    }
}

/// Generic column type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Decimal,
    Real,
    Double,
    Char,
    VarChar,
    Clob,
    Blob,
    Date,
    Time,
    Timestamp,
    Unknown,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boolean => "BOOLEAN",
            Self::SmallInt => "SMALLINT",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Decimal => "DECIMAL",
            Self::Real => "REAL",
            Self::Double => "DOUBLE",
            Self::Char => "CHAR",
            Self::VarChar => "VARCHAR",
            Self::Clob => "CLOB",
            Self::Blob => "BLOB",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Timestamp => "TIMESTAMP",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Column metadata, fixed once the first chunk of a result set arrives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub column_type: ColumnType,
    pub ordinal: usize,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, column_type: ColumnType, ordinal: usize) -> Self {
        Self {
            name: name.into(),
            column_type,
            ordinal,
        }
    }
}

/// Field value for dynamic typing
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Check if null
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Real(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get as raw bytes
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Text(s) => Some(s.as_bytes()),
            Self::Blob(b) => Some(b),
            _ => None,
        }
    }

    /// Textual rendering, `None` for NULL
    ///
    /// Text borrows; numbers are formatted; blobs are decoded lossily.
    pub fn to_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Null => None,
            Self::Integer(i) => Some(Cow::Owned(i.to_string())),
            Self::Real(f) => Some(Cow::Owned(f.to_string())),
            Self::Text(s) => Some(Cow::Borrowed(s)),
            Self::Blob(b) => Some(String::from_utf8_lossy(b)),
        }
    }

    /// Length in bytes of the field's native representation
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Null => 0,
            Self::Text(s) => s.len(),
            Self::Blob(b) => b.len(),
            other => other.to_text().map(|t| t.len()).unwrap_or(0),
        }
    }

    /// Type tag describing this value when no declared type is available
    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::Null => ColumnType::Unknown,
            Self::Integer(_) => ColumnType::Integer,
            Self::Real(_) => ColumnType::Double,
            Self::Text(_) => ColumnType::VarChar,
            Self::Blob(_) => ColumnType::Blob,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Real(f)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::Blob(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// One buffered row
pub type Row = Vec<Value>;
