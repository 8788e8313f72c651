//! SQLite backend implementation
//!
//! Main backend struct and `Backend` trait implementation. The connection
//! itself lives on a worker thread, see [`super::worker`].

use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags};
use std::path::PathBuf;
use std::time::Duration;

use crate::backend::r#trait::{Backend, Fetch};
use crate::error::{DbError, DbResult, ErrorClass};
use crate::options::{BACKEND_OPTION_BASE, OptionId, OptionSpec, OptionValue};
use crate::sql;
use crate::types::BindMethod;

use super::worker::{FetchReply, Settings, WorkerHandle};

/// Busy timeout in milliseconds (Int)
pub const SQLITE_BUSY_TIMEOUT: OptionId = OptionId(BACKEND_OPTION_BASE);
/// Enforce foreign key constraints (Flag)
pub const SQLITE_FOREIGN_KEYS: OptionId = OptionId(BACKEND_OPTION_BASE + 1);

const DEFAULT_BUSY_TIMEOUT_MS: i64 = 5000;
const MEMORY_DATABASE: &str = ":memory:";

/// SQLite backend
pub struct SqliteBackend {
    directory: PathBuf,
    worker: Option<WorkerHandle>,
    /// Reply of a fetch the caller stopped waiting for
    pending: Option<FetchReply>,
    busy_timeout: Duration,
    foreign_keys: bool,
    multi_statements: bool,
}

impl Default for SqliteBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SqliteBackend {
    /// Name the backend is registered under
    pub const NAME: &'static str = "sqlite3";

    pub fn new() -> Self {
        Self {
            directory: PathBuf::from("."),
            worker: None,
            pending: None,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS as u64),
            foreign_keys: false,
            multi_statements: true,
        }
    }

    fn worker(&self) -> DbResult<&WorkerHandle> {
        self.worker
            .as_ref()
            .ok_or_else(|| DbError::usage("sqlite backend is not bound"))
    }

    fn settings(&self) -> Settings {
        Settings {
            busy_timeout: self.busy_timeout,
            foreign_keys: self.foreign_keys,
        }
    }

    async fn stop_worker(&mut self) -> DbResult<()> {
        self.pending = None;
        match self.worker.take() {
            Some(worker) => worker.shutdown().await,
            None => Ok(()),
        }
    }
}

fn open(path: Option<PathBuf>) -> Result<Connection, rusqlite::Error> {
    match path {
        None => Connection::open_in_memory(),
        Some(path) => Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        ),
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn init(&mut self, host: &str, port: &str) -> Result<(), DbError> {
        let directory = if host.is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(host)
        };

        match tokio::fs::metadata(&directory).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(DbError::connect(format!(
                    "{} is not a directory",
                    directory.display()
                )));
            }
            Err(e) => {
                return Err(DbError::connect(format!(
                    "cannot access {}: {}",
                    directory.display(),
                    e
                )));
            }
        }

        if !port.is_empty() {
            tracing::debug!(port, "sqlite ignores the port");
        }
        self.directory = directory;
        Ok(())
    }

    async fn bind(
        &mut self,
        database: &str,
        _user: &str,
        _credential: &str,
        method: &BindMethod,
    ) -> Result<(), DbError> {
        if *method != BindMethod::Simple {
            return Err(DbError::not_supported(format!(
                "bind method {} is not supported by sqlite3",
                method
            )));
        }

        let path = if database.is_empty() || database == MEMORY_DATABASE {
            None
        } else {
            Some(self.directory.join(database))
        };
        let target = path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| MEMORY_DATABASE.to_string());

        let conn = tokio::task::spawn_blocking(move || open(path))
            .await
            .map_err(|e| DbError::backend(e.to_string(), ErrorClass::Unknown))?
            .map_err(|e| DbError::auth(format!("cannot open {}: {}", target, e)))?;

        self.worker = Some(WorkerHandle::spawn(conn)?);
        tracing::debug!(database = %target, "sqlite database opened");
        Ok(())
    }

    async fn unbind(&mut self) -> Result<(), DbError> {
        self.stop_worker().await
    }

    async fn finish(&mut self) -> Result<(), DbError> {
        self.stop_worker().await
    }

    fn describe_option(&self, id: OptionId) -> Option<OptionSpec> {
        match id {
            OptionId::API_VERSION => Some(OptionSpec::read_only(OptionValue::Int(1))),
            OptionId::THREAD_SAFE => Some(OptionSpec::read_only(OptionValue::Flag(true))),
            OptionId::MULTI_STATEMENTS => Some(OptionSpec::read_write(OptionValue::Flag(true))),
            OptionId::PAGED_RESULTS => Some(OptionSpec::read_only(OptionValue::Flag(true))),
            SQLITE_BUSY_TIMEOUT => Some(OptionSpec::read_write(OptionValue::Int(
                DEFAULT_BUSY_TIMEOUT_MS,
            ))),
            SQLITE_FOREIGN_KEYS => Some(OptionSpec::read_write(OptionValue::Flag(false))),
            _ => None,
        }
    }

    fn apply_option(&mut self, id: OptionId, value: &OptionValue) -> Result<(), DbError> {
        match (id, value) {
            (OptionId::MULTI_STATEMENTS, OptionValue::Flag(on)) => self.multi_statements = *on,
            (SQLITE_FOREIGN_KEYS, OptionValue::Flag(on)) => self.foreign_keys = *on,
            (SQLITE_BUSY_TIMEOUT, OptionValue::Int(ms)) => {
                let ms = u64::try_from(*ms).map_err(|_| {
                    DbError::invalid_option(format!("busy timeout must not be negative, got {}", ms))
                })?;
                self.busy_timeout = Duration::from_millis(ms);
            }
            _ => {
                return Err(DbError::invalid_option(format!(
                    "{} cannot be set to {}",
                    id, value
                )));
            }
        }
        Ok(())
    }

    async fn query(&mut self, text: &str) -> Result<(), DbError> {
        let statements: Vec<String> = sql::split_statements(text)
            .into_iter()
            .map(str::to_string)
            .collect();
        if statements.len() > 1 && !self.multi_statements {
            return Err(DbError::permanent(format!(
                "query holds {} statements but multi_statements is off",
                statements.len()
            )));
        }

        let settings = self.settings();
        self.pending = None;
        self.worker()?.query(statements, settings)
    }

    async fn result(
        &mut self,
        timeout: Option<Duration>,
        chunk_size: usize,
    ) -> Result<Fetch, DbError> {
        let mut reply = match self.pending.take() {
            Some(reply) => reply,
            None => self.worker()?.fetch(chunk_size)?,
        };

        let outcome = match timeout {
            None => (&mut reply).await,
            Some(limit) => match tokio::time::timeout(limit, &mut reply).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    self.pending = Some(reply);
                    return Ok(Fetch::Timeout);
                }
            },
        };

        outcome.map_err(|_| DbError::backend("sqlite worker stopped", ErrorClass::Unknown))?
    }

    async fn result_finish(&mut self) -> Result<(), DbError> {
        let abandoned = self.pending.take().is_some();
        let worker = self.worker()?;
        if abandoned {
            tracing::debug!("interrupting statement still in progress");
            worker.interrupt();
        }
        worker.discard().await
    }
}
