//! Connection handle
//!
//! A `Handle` owns exactly one backend for its whole life and drives it
//! through the lifecycle `Init → Bound → QueryActive → ResultOpen → Bound →
//! Unbound → Finished`. Every operation is checked against the current
//! state first; out-of-order calls fail with [`DbError::Use`] without
//! reaching the backend.
//!
//! Failures are returned directly and also recorded as the handle's last
//! error, which is only overwritten by the next failure.
//!
//! # Example
//! ```ignore
//! let mut handle = registry.create("sqlite3", "", "").await?;
//! handle.bind(":memory:", "", "", BindMethod::Simple).await?;
//! handle.query("SELECT 1;").await?;
//! while handle.result(None, 25).await? != ResultStatus::Done {
//!     while handle.row_fetch()? == RowStatus::Row {
//!         println!("{:?}", handle.field_value(0)?);
//!     }
//! }
//! handle.result_finish().await?;
//! handle.finish().await?;
//! ```

mod result;
mod state;


use std::borrow::Cow;
use std::cell::RefCell;
use std::time::Duration;

use crate::backend::{Backend, Fetch};
use crate::error::{DbError, DbResult, ErrorClass, LastError};
use crate::options::{OptionId, OptionSpec, OptionTable, OptionValue};
use crate::sql;
use crate::types::{BindMethod, ColumnMeta, ColumnType, ResultStatus, RowStatus, Value};

pub use result::{Cursor, ResultSet};
pub use state::{HandleState, Operation};

/// A live connection bound to one backend
pub struct Handle {
    backend_name: String,
    backend: Box<dyn Backend>,
    state: HandleState,
    options: OptionTable,
    result: ResultSet,
    exhausted: bool,
    last_error: RefCell<Option<LastError>>,
}

impl Handle {
    /// Initialize `backend` with transport parameters
    ///
    /// Any failure is reported as [`DbError::Connect`].
    pub async fn init(mut backend: Box<dyn Backend>, host: &str, port: &str) -> DbResult<Self> {
        let backend_name = backend.name().to_string();
        tracing::debug!(backend = %backend_name, host, port, "initializing handle");

        if let Err(e) = backend.init(host, port).await {
            tracing::warn!(backend = %backend_name, error = %e, "backend init failed");
            return Err(match e {
                DbError::Connect { .. } => e,
                other => DbError::connect(other.message()),
            });
        }

        Ok(Self {
            backend_name,
            backend,
            state: HandleState::Init,
            options: OptionTable::new(),
            result: ResultSet::new(),
            exhausted: false,
            last_error: RefCell::new(None),
        })
    }

    /// Name of the backend behind this handle
    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    /// Current lifecycle state
    pub fn state(&self) -> HandleState {
        self.state
    }

    /// Record `error` as the last error and hand it back
    fn fail(&self, error: DbError) -> DbError {
        tracing::debug!(
            backend = %self.backend_name,
            code = error.error_code(),
            class = %error.class(),
            "{}",
            error
        );
        *self.last_error.borrow_mut() = Some(LastError::from(&error));
        error
    }

    fn guard(&self, op: Operation) -> DbResult<()> {
        if self.state.permits(op) {
            Ok(())
        } else {
            Err(self.fail(DbError::usage(format!(
                "{} not permitted while handle is {}",
                op, self.state
            ))))
        }
    }

    fn checked<'a, T>(
        &'a self,
        op: Operation,
        f: impl FnOnce(&'a ResultSet) -> DbResult<T>,
    ) -> DbResult<T> {
        self.guard(op)?;
        f(&self.result).map_err(|e| self.fail(e))
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Authenticate and select a database
    pub async fn bind(
        &mut self,
        database: &str,
        user: &str,
        credential: &str,
        method: BindMethod,
    ) -> DbResult<()> {
        self.guard(Operation::Bind)?;
        match self.backend.bind(database, user, credential, &method).await {
            Ok(()) => {
                tracing::info!(backend = %self.backend_name, database, %method, "handle bound");
                self.state = HandleState::Bound;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Log out. A no-op when the handle is not bound.
    pub async fn unbind(&mut self) -> DbResult<()> {
        self.guard(Operation::Unbind)?;
        if self.state != HandleState::Bound {
            return Ok(());
        }
        match self.backend.unbind().await {
            Ok(()) => {
                tracing::debug!(backend = %self.backend_name, "handle unbound");
                self.state = HandleState::Unbound;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Release every backend resource. Calling it again is a no-op.
    ///
    /// An open result and a bound session are abandoned best-effort first.
    pub async fn finish(&mut self) -> DbResult<()> {
        if self.state == HandleState::Finished {
            return Ok(());
        }

        if matches!(self.state, HandleState::QueryActive | HandleState::ResultOpen) {
            if let Err(e) = self.backend.result_finish().await {
                tracing::warn!(backend = %self.backend_name, error = %e, "abandoning result failed");
            }
            self.state = HandleState::Bound;
        }
        if self.state == HandleState::Bound {
            if let Err(e) = self.backend.unbind().await {
                tracing::warn!(backend = %self.backend_name, error = %e, "implicit unbind failed");
            }
        }

        let outcome = self.backend.finish().await;
        self.state = HandleState::Finished;
        self.result.mark_done();
        tracing::info!(backend = %self.backend_name, "handle finished");
        outcome.map_err(|e| self.fail(e))
    }

    // =========================================================================
    // Options
    // =========================================================================

    /// How the backend treats `id`, `None` if it does not support it
    pub fn describe_option(&self, id: OptionId) -> Option<OptionSpec> {
        self.backend.describe_option(id)
    }

    /// Read an option: the value set on this handle, else the backend default
    pub fn get_option(&self, id: OptionId) -> DbResult<OptionValue> {
        self.guard(Operation::GetOption)?;
        let spec = self.backend.describe_option(id).ok_or_else(|| {
            self.fail(DbError::not_supported(format!(
                "option {} is not supported by {}",
                id, self.backend_name
            )))
        })?;
        self.options.get(id, &spec).map_err(|e| self.fail(e))
    }

    /// Set an option, overwriting any previous value
    pub fn set_option(&mut self, id: OptionId, value: OptionValue) -> DbResult<()> {
        self.guard(Operation::SetOption)?;
        let spec = match self.backend.describe_option(id) {
            Some(spec) => spec,
            None => {
                return Err(self.fail(DbError::not_supported(format!(
                    "option {} is not supported by {}",
                    id, self.backend_name
                ))));
            }
        };
        if let Err(e) = spec
            .validate(id, &value)
            .and_then(|_| self.backend.apply_option(id, &value))
        {
            return Err(self.fail(e));
        }
        tracing::debug!(backend = %self.backend_name, option = %id, value = %value, "option set");
        self.options.set(id, value);
        Ok(())
    }

    // =========================================================================
    // Errors
    // =========================================================================

    /// Message of the last failure, empty if nothing failed yet
    pub fn error(&self) -> String {
        self.last_error
            .borrow()
            .as_ref()
            .map(|e| e.message.clone())
            .unwrap_or_default()
    }

    /// Classification of the last failure
    pub fn error_type(&self) -> ErrorClass {
        self.last_error
            .borrow()
            .as_ref()
            .map(|e| e.class)
            .unwrap_or(ErrorClass::Unknown)
    }

    /// Full last-error record
    pub fn last_error(&self) -> Option<LastError> {
        self.last_error.borrow().clone()
    }

    // =========================================================================
    // Statements and results
    // =========================================================================

    /// Register one or more `;`-separated statements
    ///
    /// Nothing runs to completion here; execution is driven by [`Handle::result`].
    pub async fn query(&mut self, text: &str) -> DbResult<()> {
        self.guard(Operation::Query)?;
        if !sql::has_content(text) {
            return Err(self.fail(DbError::usage("query text is empty")));
        }
        if let Err(e) = self.backend.query(text).await {
            return Err(self.fail(e));
        }
        self.state = HandleState::QueryActive;
        self.result = ResultSet::new();
        self.exhausted = false;
        Ok(())
    }

    /// Advance execution and buffer the next chunk
    ///
    /// `timeout = None` waits until data is ready; `Some(Duration::ZERO)`
    /// polls. `chunk_size = 0` buffers the rest of the current result set.
    pub async fn result(
        &mut self,
        timeout: Option<Duration>,
        chunk_size: usize,
    ) -> DbResult<ResultStatus> {
        self.guard(Operation::Result)?;
        if self.exhausted {
            return Ok(ResultStatus::Done);
        }

        let fetch = match self.backend.result(timeout, chunk_size).await {
            Ok(fetch) => fetch,
            Err(e) => {
                // a failed batch reports DONE until result_finish
                self.state = HandleState::ResultOpen;
                self.exhausted = true;
                self.result.mark_done();
                return Err(self.fail(e));
            }
        };

        if let Fetch::Rows { rows, .. } = &fetch {
            if chunk_size > 0 && rows.len() > chunk_size {
                tracing::warn!(
                    backend = %self.backend_name,
                    delivered = rows.len(),
                    chunk_size,
                    "backend exceeded requested chunk size"
                );
            }
        }

        match self.result.apply(fetch) {
            Ok(ResultStatus::Timeout) => Ok(ResultStatus::Timeout),
            Ok(status) => {
                self.state = HandleState::ResultOpen;
                self.exhausted = status == ResultStatus::Done;
                Ok(status)
            }
            Err(e) => {
                self.state = HandleState::ResultOpen;
                self.exhausted = true;
                Err(self.fail(e))
            }
        }
    }

    /// Discard the rest of the query and return to the bound state
    pub async fn result_finish(&mut self) -> DbResult<()> {
        self.guard(Operation::ResultFinish)?;
        let outcome = self.backend.result_finish().await;
        self.result = ResultSet::new();
        self.exhausted = false;
        self.state = HandleState::Bound;
        outcome.map_err(|e| self.fail(e))
    }

    /// Move the cursor to the next row of the current chunk
    ///
    /// [`RowStatus::Done`] means the chunk is exhausted; more rows may
    /// follow after another [`Handle::result`] call.
    pub fn row_fetch(&mut self) -> DbResult<RowStatus> {
        self.guard(Operation::RowFetch)?;
        match self.result.row_fetch() {
            Ok(status) => Ok(status),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Rows changed by the last completed data-modifying statement
    pub fn rows_affected(&self) -> DbResult<u64> {
        self.checked(Operation::RowsAffected, |r| r.rows_affected())
    }

    pub fn column_count(&self) -> DbResult<usize> {
        self.checked(Operation::ColumnInfo, |r| r.column_count())
    }

    pub fn column_name(&self, pos: usize) -> DbResult<&str> {
        self.checked(Operation::ColumnInfo, |r| r.column_name(pos))
    }

    pub fn column_type(&self, pos: usize) -> DbResult<ColumnType> {
        self.checked(Operation::ColumnInfo, |r| r.column_type(pos))
    }

    pub fn columns(&self) -> DbResult<&[ColumnMeta]> {
        self.checked(Operation::ColumnInfo, |r| r.columns())
    }

    /// Zero-based chunk number within the current result set
    pub fn chunk_index(&self) -> DbResult<usize> {
        self.checked(Operation::ColumnInfo, |r| r.chunk_index())
    }

    /// Rows buffered in the current chunk
    pub fn chunk_len(&self) -> DbResult<usize> {
        self.checked(Operation::ColumnInfo, |r| r.chunk_len())
    }

    /// Zero-based result set number within the current query
    pub fn set_index(&self) -> DbResult<usize> {
        self.checked(Operation::ColumnInfo, |r| r.set_index())
    }

    pub fn field(&self, pos: usize) -> DbResult<&Value> {
        self.checked(Operation::FieldAccess, |r| r.field(pos))
    }

    pub fn field_isnull(&self, pos: usize) -> DbResult<bool> {
        self.checked(Operation::FieldAccess, |r| r.field_isnull(pos))
    }

    pub fn field_length(&self, pos: usize) -> DbResult<usize> {
        self.checked(Operation::FieldAccess, |r| r.field_length(pos))
    }

    pub fn field_value(&self, pos: usize) -> DbResult<Option<Cow<'_, str>>> {
        self.checked(Operation::FieldAccess, |r| r.field_value(pos))
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if self.state != HandleState::Finished {
            tracing::debug!(
                backend = %self.backend_name,
                state = %self.state,
                "handle dropped without finish"
            );
        }
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("backend", &self.backend_name)
            .field("state", &self.state)
            .field("options", &self.options.len())
            .finish()
    }
}
