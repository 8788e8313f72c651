//! Connection configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::BindMethod;

/// Default rows per `result()` call
pub const DEFAULT_CHUNK_SIZE: usize = 25;

/// Default backend name
pub const DEFAULT_BACKEND: &str = "sqlite3";

/// Everything needed to create and bind a handle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Registered backend name
    pub backend: String,
    /// Host (or directory, for file-based backends)
    pub host: String,
    /// Port as given by the user, interpreted by the backend
    pub port: String,
    /// Database to bind to
    pub database: String,
    pub username: String,
    pub password: String,
    /// Authentication method
    pub bind_method: BindMethod,
    /// Rows per chunk (0 = whole result set)
    pub chunk_size: usize,
    /// How long one `result()` call may wait; unset waits indefinitely
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub fetch_timeout: Option<Duration>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            host: String::new(),
            port: String::new(),
            database: String::new(),
            username: String::new(),
            password: String::new(),
            bind_method: BindMethod::Simple,
            chunk_size: DEFAULT_CHUNK_SIZE,
            fetch_timeout: None,
        }
    }
}

impl ConnectionConfig {
    /// Config for `backend` with everything else defaulted
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            ..Default::default()
        }
    }

    /// In-memory SQLite database
    pub fn sqlite_in_memory() -> Self {
        Self::new(DEFAULT_BACKEND).with_database(":memory:")
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = port.into();
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set username and password
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }
}
