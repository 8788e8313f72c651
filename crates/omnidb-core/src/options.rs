//! Per-handle option subsystem
//!
//! Options are keyed by a numeric `OptionId`. Ids below [`BACKEND_OPTION_BASE`]
//! are reserved for generic options understood by every caller; backends
//! declare their own tunables at or above it. Each backend describes the ids
//! it supports through [`OptionSpec`], which fixes the value kind, whether
//! the option may be written, and an optional default.

use crate::error::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// First id available to backend-specific options
pub const BACKEND_OPTION_BASE: u32 = 0x1000;

/// Numeric option key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OptionId(pub u32);

impl OptionId {
    pub const API_VERSION: OptionId = OptionId(0x0000);
    pub const THREAD_SAFE: OptionId = OptionId(0x0001);
    pub const TLS: OptionId = OptionId(0x0010);
    pub const MULTI_STATEMENTS: OptionId = OptionId(0x0020);
    pub const PAGED_RESULTS: OptionId = OptionId(0x0021);
    pub const COMPRESS: OptionId = OptionId(0x0022);
    pub const MODE: OptionId = OptionId(0x0023);
    pub const CONNECT_TIMEOUT: OptionId = OptionId(0x0024);

    const GENERIC: [(OptionId, &'static str); 8] = [
        (Self::API_VERSION, "api_version"),
        (Self::THREAD_SAFE, "thread_safe"),
        (Self::TLS, "tls"),
        (Self::MULTI_STATEMENTS, "multi_statements"),
        (Self::PAGED_RESULTS, "paged_results"),
        (Self::COMPRESS, "compress"),
        (Self::MODE, "mode"),
        (Self::CONNECT_TIMEOUT, "connect_timeout"),
    ];

    /// True if the id lies in the range reserved for generic options
    pub fn is_generic(self) -> bool {
        self.0 < BACKEND_OPTION_BASE
    }

    /// Name of a generic option
    pub fn name(self) -> Option<&'static str> {
        Self::GENERIC
            .iter()
            .find(|(id, _)| *id == self)
            .map(|(_, name)| *name)
    }

    /// Look up a generic option by name, or parse a numeric id (`0x1000`, `4096`)
    pub fn from_name(name: &str) -> Option<OptionId> {
        let lower = name.trim().to_ascii_lowercase();
        if let Some((id, _)) = Self::GENERIC.iter().find(|(_, n)| *n == lower) {
            return Some(*id);
        }
        match lower.strip_prefix("0x") {
            Some(hex) => u32::from_str_radix(hex, 16).ok().map(OptionId),
            None => lower.parse().ok().map(OptionId),
        }
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "0x{:04x}", self.0),
        }
    }
}

/// Shape of an option's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionKind {
    Int,
    Text,
    Flag,
}

/// Typed option value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Flag(bool),
    Int(i64),
    Text(String),
}

impl OptionValue {
    pub fn kind(&self) -> OptionKind {
        match self {
            Self::Int(_) => OptionKind::Int,
            Self::Text(_) => OptionKind::Text,
            Self::Flag(_) => OptionKind::Flag,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Parse user input into a value of the given kind
    pub fn parse(kind: OptionKind, input: &str) -> DbResult<Self> {
        let input = input.trim();
        match kind {
            OptionKind::Int => input
                .parse()
                .map(Self::Int)
                .map_err(|_| DbError::invalid_option(format!("'{}' is not an integer", input))),
            OptionKind::Flag => match input.to_ascii_lowercase().as_str() {
                "1" | "on" | "true" | "yes" => Ok(Self::Flag(true)),
                "0" | "off" | "false" | "no" => Ok(Self::Flag(false)),
                _ => Err(DbError::invalid_option(format!(
                    "'{}' is not a boolean flag",
                    input
                ))),
            },
            OptionKind::Text => Ok(Self::Text(input.to_string())),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Text(s) => write!(f, "{}", s),
            Self::Flag(b) => write!(f, "{}", if *b { "on" } else { "off" }),
        }
    }
}

/// Whether callers may change an option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionAccess {
    ReadOnly,
    ReadWrite,
}

/// Backend-declared description of one supported option
#[derive(Debug, Clone, PartialEq)]
pub struct OptionSpec {
    pub kind: OptionKind,
    pub access: OptionAccess,
    pub default: Option<OptionValue>,
}

impl OptionSpec {
    /// Read-only option reporting a fixed value
    pub fn read_only(value: OptionValue) -> Self {
        Self {
            kind: value.kind(),
            access: OptionAccess::ReadOnly,
            default: Some(value),
        }
    }

    /// Writable option with a default
    pub fn read_write(default: OptionValue) -> Self {
        Self {
            kind: default.kind(),
            access: OptionAccess::ReadWrite,
            default: Some(default),
        }
    }

    /// Writable option without a default
    pub fn unset(kind: OptionKind) -> Self {
        Self {
            kind,
            access: OptionAccess::ReadWrite,
            default: None,
        }
    }

    /// Check that `value` may be stored under `id`
    pub fn validate(&self, id: OptionId, value: &OptionValue) -> DbResult<()> {
        if self.access == OptionAccess::ReadOnly {
            return Err(DbError::not_supported(format!(
                "option {} is read-only",
                id
            )));
        }
        if value.kind() != self.kind {
            return Err(DbError::invalid_option(format!(
                "option {} expects {:?}, got {:?}",
                id,
                self.kind,
                value.kind()
            )));
        }
        Ok(())
    }
}

/// Values explicitly set on a handle
#[derive(Debug, Clone, Default)]
pub struct OptionTable {
    values: HashMap<OptionId, OptionValue>,
}

impl OptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, overwriting any previous one
    pub fn set(&mut self, id: OptionId, value: OptionValue) -> Option<OptionValue> {
        self.values.insert(id, value)
    }

    /// Value set for `id`, falling back to the declared default
    pub fn get(&self, id: OptionId, spec: &OptionSpec) -> DbResult<OptionValue> {
        self.values
            .get(&id)
            .or(spec.default.as_ref())
            .cloned()
            .ok_or_else(|| DbError::not_found(format!("option {} has no value", id)))
    }

    pub fn is_set(&self, id: OptionId) -> bool {
        self.values.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
