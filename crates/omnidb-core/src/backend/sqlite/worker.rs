//! SQLite worker thread
//!
//! One thread owns the connection for as long as the backend is bound and
//! processes commands from an MPSC channel. A query only registers its
//! statements; each statement is prepared and stepped when a fetch request
//! arrives, and a row-returning statement stays open on the worker's stack
//! between chunks.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, InterruptHandle, Statement};
use tokio::sync::oneshot;

use crate::backend::Fetch;
use crate::error::{DbError, DbResult, ErrorClass};
use crate::types::{ColumnMeta, ColumnType, Row, Value};

// =============================================================================
// Commands
// =============================================================================

/// Per-query connection settings derived from handle options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Settings {
    pub busy_timeout: Duration,
    pub foreign_keys: bool,
}

pub(super) type FetchReply = oneshot::Receiver<DbResult<Fetch>>;

/// Commands sent to the worker
#[derive(Debug)]
pub(super) enum Command {
    /// Register the statements of a new query
    Query {
        statements: Vec<String>,
        settings: Settings,
    },
    /// Deliver the next event of the current query
    Fetch {
        chunk_size: usize,
        reply: oneshot::Sender<DbResult<Fetch>>,
    },
    /// Drop the rest of the current query
    Discard { reply: oneshot::Sender<()> },
    /// Close the connection and stop
    Shutdown { reply: oneshot::Sender<()> },
}

struct FetchRequest {
    chunk_size: usize,
    reply: oneshot::Sender<DbResult<Fetch>>,
}

impl FetchRequest {
    fn limit(&self) -> usize {
        if self.chunk_size == 0 {
            usize::MAX
        } else {
            self.chunk_size
        }
    }

    fn send(self, fetch: Fetch) {
        // receiver is gone when the caller gave up after a timeout
        let _ = self.reply.send(Ok(fetch));
    }

    fn fail(self, error: DbError) -> Step {
        tracing::debug!(error = %error, "sqlite statement failed");
        let _ = self.reply.send(Err(error));
        Step::Failed
    }
}

/// Outcome of driving one statement
enum Step {
    /// Statement complete; the fetch request for the next one is in hand
    Next(FetchRequest),
    /// Statement failed and the error went to the caller
    Failed,
    /// A non-fetch command arrived, or the channel closed (`None`)
    Ended(Option<Command>),
}

// =============================================================================
// Handle
// =============================================================================

/// Caller side of a running worker
pub(super) struct WorkerHandle {
    tx: Sender<Command>,
    interrupt: InterruptHandle,
    thread: JoinHandle<()>,
}

fn worker_gone() -> DbError {
    DbError::backend("sqlite worker is not running", ErrorClass::Unknown)
}

impl WorkerHandle {
    /// Move `conn` onto a new worker thread
    pub(super) fn spawn(conn: Connection) -> DbResult<Self> {
        let (tx, rx) = mpsc::channel();
        let interrupt = conn.get_interrupt_handle();
        let thread = thread::Builder::new()
            .name("omnidb-sqlite".to_string())
            .spawn(move || run(conn, rx))
            .map_err(|e| {
                DbError::backend(
                    format!("failed to start sqlite worker: {}", e),
                    ErrorClass::Transient,
                )
            })?;
        Ok(Self {
            tx,
            interrupt,
            thread,
        })
    }

    pub(super) fn query(&self, statements: Vec<String>, settings: Settings) -> DbResult<()> {
        self.tx
            .send(Command::Query {
                statements,
                settings,
            })
            .map_err(|_| worker_gone())
    }

    /// Ask for the next event; the reply arrives on the returned receiver
    pub(super) fn fetch(&self, chunk_size: usize) -> DbResult<FetchReply> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Fetch { chunk_size, reply })
            .map_err(|_| worker_gone())?;
        Ok(rx)
    }

    /// Abort the statement currently stepping, if any
    pub(super) fn interrupt(&self) {
        self.interrupt.interrupt();
    }

    pub(super) async fn discard(&self) -> DbResult<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Discard { reply })
            .map_err(|_| worker_gone())?;
        rx.await.map_err(|_| worker_gone())
    }

    /// Close the connection and wait for the thread to exit
    pub(super) async fn shutdown(self) -> DbResult<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Shutdown { reply })
            .map_err(|_| worker_gone())?;
        rx.await.map_err(|_| worker_gone())?;

        let thread = self.thread;
        match tokio::task::spawn_blocking(move || thread.join()).await {
            Ok(Ok(())) => Ok(()),
            _ => Err(DbError::backend(
                "sqlite worker panicked",
                ErrorClass::Unknown,
            )),
        }
    }
}

// =============================================================================
// Worker loop
// =============================================================================

fn run(conn: Connection, rx: Receiver<Command>) {
    tracing::debug!("sqlite worker started");

    let mut next = None;
    let mut shutdown = None;
    loop {
        let cmd = match next.take() {
            Some(cmd) => cmd,
            None => match rx.recv() {
                Ok(cmd) => cmd,
                Err(_) => break,
            },
        };

        match cmd {
            Command::Query {
                statements,
                settings,
            } => match run_batch(&conn, &rx, &statements, settings) {
                Some(cmd) => next = Some(cmd),
                None => break,
            },
            Command::Fetch { reply, .. } => {
                let _ = reply.send(Ok(Fetch::Done));
            }
            Command::Discard { reply } => {
                let _ = reply.send(());
            }
            Command::Shutdown { reply } => {
                shutdown = Some(reply);
                break;
            }
        }
    }

    if let Err((_, e)) = conn.close() {
        tracing::warn!(error = %e, "closing sqlite connection failed");
    }
    tracing::debug!("sqlite worker stopped");

    if let Some(reply) = shutdown {
        let _ = reply.send(());
    }
}

fn next_fetch(rx: &Receiver<Command>) -> Result<FetchRequest, Option<Command>> {
    match rx.recv() {
        Ok(Command::Fetch { chunk_size, reply }) => Ok(FetchRequest { chunk_size, reply }),
        Ok(other) => Err(Some(other)),
        Err(_) => Err(None),
    }
}

fn wait(rx: &Receiver<Command>) -> Step {
    match next_fetch(rx) {
        Ok(request) => Step::Next(request),
        Err(end) => Step::Ended(end),
    }
}

/// Answer `Done` to every fetch until another command arrives
fn drain(rx: &Receiver<Command>) -> Option<Command> {
    loop {
        match next_fetch(rx) {
            Ok(request) => request.send(Fetch::Done),
            Err(end) => return end,
        }
    }
}

/// Drive one query to completion
///
/// Returns the command that ended it, or `None` once the channel closed.
fn run_batch(
    conn: &Connection,
    rx: &Receiver<Command>,
    statements: &[String],
    settings: Settings,
) -> Option<Command> {
    let mut request = match next_fetch(rx) {
        Ok(request) => request,
        Err(end) => return end,
    };

    if let Err(e) = apply_settings(conn, settings) {
        request.fail(e);
        return drain(rx);
    }

    for sql in statements {
        tracing::trace!(sql = %sql, "executing statement");
        request = match run_statement(conn, rx, sql, request) {
            Step::Next(request) => request,
            Step::Failed => return drain(rx),
            Step::Ended(end) => return end,
        };
    }

    request.send(Fetch::Done);
    drain(rx)
}

fn apply_settings(conn: &Connection, settings: Settings) -> DbResult<()> {
    conn.busy_timeout(settings.busy_timeout).map_err(classify)?;
    conn.pragma_update(None, "foreign_keys", settings.foreign_keys)
        .map_err(classify)
}

fn run_statement(
    conn: &Connection,
    rx: &Receiver<Command>,
    sql: &str,
    request: FetchRequest,
) -> Step {
    let mut stmt = match conn.prepare(sql) {
        Ok(stmt) => stmt,
        Err(e) => return request.fail(classify(e)),
    };

    if stmt.column_count() == 0 {
        let before = match total_changes(conn) {
            Ok(n) => n,
            Err(e) => return request.fail(e),
        };
        let changed = match stmt.execute([]) {
            Ok(changed) => changed as u64,
            Err(e) => return request.fail(classify(e)),
        };
        let rows_affected = match total_changes(conn) {
            Ok(after) if after > before => changed,
            Ok(_) => 0,
            Err(e) => return request.fail(e),
        };
        request.send(Fetch::NoRows { rows_affected });
        return wait(rx);
    }

    let width = stmt.column_count();
    let mut columns = Some(describe_columns(&stmt));
    let mut rows = match stmt.query([]) {
        Ok(rows) => rows,
        Err(e) => return request.fail(classify(e)),
    };

    let mut request = request;
    let mut lookahead: Option<DbResult<Row>> = None;
    loop {
        let limit = request.limit();
        let mut chunk = Vec::with_capacity(limit.min(256));
        match lookahead.take() {
            Some(Ok(row)) => chunk.push(row),
            Some(Err(e)) => return request.fail(e),
            None => {}
        }

        let mut exhausted = false;
        while chunk.len() < limit {
            match next_row(&mut rows, width) {
                Ok(Some(row)) => chunk.push(row),
                Ok(None) => {
                    exhausted = true;
                    break;
                }
                Err(e) => return request.fail(e),
            }
        }
        if !exhausted {
            // peek so the last chunk is not followed by an empty one
            match next_row(&mut rows, width) {
                Ok(Some(row)) => lookahead = Some(Ok(row)),
                Ok(None) => exhausted = true,
                Err(e) => lookahead = Some(Err(e)),
            }
        }

        if let Some(columns) = columns.as_mut() {
            refine_types(columns, &chunk);
        }
        request.send(Fetch::Rows {
            columns: columns.take(),
            rows: chunk,
        });

        request = match wait(rx) {
            Step::Next(next) => next,
            other => return other,
        };
        if exhausted {
            return Step::Next(request);
        }
    }
}

/// Rows changed by DML on this connection so far
///
/// `sqlite3_changes` keeps the last DML count across DDL and transaction
/// statements; the running total does not move for those.
fn total_changes(conn: &Connection) -> DbResult<i64> {
    conn.query_row("SELECT total_changes()", [], |row| row.get(0))
        .map_err(classify)
}

fn next_row(rows: &mut rusqlite::Rows<'_>, width: usize) -> DbResult<Option<Row>> {
    let Some(row) = rows.next().map_err(classify)? else {
        return Ok(None);
    };
    let mut values = Vec::with_capacity(width);
    for idx in 0..width {
        let value = match row.get_ref(idx).map_err(classify)? {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            // keep the stored bytes when the text is not valid UTF-8
            ValueRef::Text(t) => match std::str::from_utf8(t) {
                Ok(text) => Value::Text(text.to_string()),
                Err(_) => Value::Blob(t.to_vec()),
            },
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        };
        values.push(value);
    }
    Ok(Some(values))
}

// =============================================================================
// Metadata and errors
// =============================================================================

fn describe_columns(stmt: &Statement<'_>) -> Vec<ColumnMeta> {
    stmt.columns()
        .iter()
        .enumerate()
        .map(|(ordinal, col)| ColumnMeta::new(col.name(), declared_type(col.decl_type()), ordinal))
        .collect()
}

/// Map a declared column type to a generic tag using SQLite's affinity rules
pub(super) fn declared_type(decl: Option<&str>) -> ColumnType {
    let Some(decl) = decl else {
        return ColumnType::Unknown;
    };
    let decl = decl.to_ascii_uppercase();
    let has = |needle: &str| decl.contains(needle);

    if has("BOOL") {
        ColumnType::Boolean
    } else if has("BIGINT") {
        ColumnType::BigInt
    } else if has("SMALLINT") || has("TINYINT") {
        ColumnType::SmallInt
    } else if has("INT") {
        ColumnType::Integer
    } else if has("VARCHAR") {
        ColumnType::VarChar
    } else if has("CHAR") {
        ColumnType::Char
    } else if has("CLOB") || has("TEXT") {
        ColumnType::Clob
    } else if has("BLOB") {
        ColumnType::Blob
    } else if has("REAL") {
        ColumnType::Real
    } else if has("FLOA") || has("DOUB") {
        ColumnType::Double
    } else if has("DEC") || has("NUMERIC") {
        ColumnType::Decimal
    } else if has("TIMESTAMP") || has("DATETIME") {
        ColumnType::Timestamp
    } else if has("DATE") {
        ColumnType::Date
    } else if has("TIME") {
        ColumnType::Time
    } else {
        ColumnType::Unknown
    }
}

/// Fill in undeclared column types from the first row
fn refine_types(columns: &mut [ColumnMeta], chunk: &[Row]) {
    let Some(first) = chunk.first() else {
        return;
    };
    for (col, value) in columns.iter_mut().zip(first) {
        if col.column_type == ColumnType::Unknown {
            col.column_type = value.column_type();
        }
    }
}

/// Classify an engine error
pub(super) fn classify(err: rusqlite::Error) -> DbError {
    match &err {
        rusqlite::Error::SqliteFailure(code, msg) => {
            let message = msg.clone().unwrap_or_else(|| code.to_string());
            DbError::backend(message, class_of(code.code))
        }
        rusqlite::Error::SqlInputError { error, msg, .. } => {
            DbError::backend(msg.clone(), class_of(error.code))
        }
        _ => DbError::backend(err.to_string(), ErrorClass::Unknown),
    }
}

fn class_of(code: rusqlite::ErrorCode) -> ErrorClass {
    match code {
        rusqlite::ErrorCode::DatabaseBusy
        | rusqlite::ErrorCode::DatabaseLocked
        | rusqlite::ErrorCode::OperationInterrupted => ErrorClass::Transient,
        _ => ErrorClass::Permanent,
    }
}
