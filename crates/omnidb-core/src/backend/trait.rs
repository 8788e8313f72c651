//! Backend trait definition
//!
//! Defines the operation set every database backend implements. The core
//! calls these only in the lifecycle states where they are valid, so a
//! backend never has to guard against out-of-order calls itself.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::DbError;
use crate::options::{OptionId, OptionSpec, OptionValue};
use crate::types::{BindMethod, ColumnMeta, Row};

/// What one `Backend::result` call produced
#[derive(Debug, Clone, PartialEq)]
pub enum Fetch {
    /// Nothing ready within the timeout
    Timeout,
    /// A statement finished without rows
    NoRows { rows_affected: u64 },
    /// A chunk of rows. `columns` is `Some` on the first chunk of a result
    /// set and `None` on continuation chunks of the same set.
    Rows {
        columns: Option<Vec<ColumnMeta>>,
        rows: Vec<Row>,
    },
    /// All statements of the query are consumed
    Done,
}

/// Database backend trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send {
    /// Name the backend is registered under
    fn name(&self) -> &'static str;

    /// Record transport parameters. Must not authenticate.
    async fn init(&mut self, host: &str, port: &str) -> Result<(), DbError>;

    /// Authenticate and select the database
    async fn bind(
        &mut self,
        database: &str,
        user: &str,
        credential: &str,
        method: &BindMethod,
    ) -> Result<(), DbError>;

    /// Log out; the backend may be bound again afterwards
    async fn unbind(&mut self) -> Result<(), DbError>;

    /// Release every resource held by the backend
    async fn finish(&mut self) -> Result<(), DbError>;

    /// Describe a supported option, `None` if the id is unknown
    fn describe_option(&self, id: OptionId) -> Option<OptionSpec>;

    /// Apply a validated option value
    fn apply_option(&mut self, id: OptionId, value: &OptionValue) -> Result<(), DbError>;

    /// Register statement text for execution
    async fn query(&mut self, text: &str) -> Result<(), DbError>;

    /// Advance execution and hand back at most `chunk_size` rows
    /// (`0` = all remaining rows of the current result set)
    async fn result(
        &mut self,
        timeout: Option<Duration>,
        chunk_size: usize,
    ) -> Result<Fetch, DbError>;

    /// Discard pending rows and statements of the current query
    async fn result_finish(&mut self) -> Result<(), DbError>;
}
