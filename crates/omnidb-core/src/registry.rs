//! Backend registry
//!
//! Maps backend names to factories and owns handle creation. A process-wide
//! registry pre-populated with the built-in backends is available through
//! [`global_registry`].

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;

use crate::backend::Backend;
use crate::config::ConnectionConfig;
use crate::error::{DbError, DbResult};
use crate::handle::Handle;

/// Builds a fresh, uninitialized backend instance
pub type BackendFactory = Arc<dyn Fn() -> Box<dyn Backend> + Send + Sync>;

/// Registry of available backends
#[derive(Clone, Default)]
pub struct Registry {
    factories: HashMap<String, BackendFactory>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every backend compiled into this build
    pub fn with_builtin() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "sqlite")]
        registry.register(crate::backend::SqliteBackend::NAME, || {
            Box::new(crate::backend::SqliteBackend::new())
        });
        registry
    }

    /// Add a backend factory, replacing any previous one with that name
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Backend> + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!(backend = %name, "registering backend");
        self.factories.insert(name, Arc::new(factory));
    }

    /// Look up the factory registered under `name`
    pub fn resolve(&self, name: &str) -> DbResult<BackendFactory> {
        self.factories
            .get(name)
            .cloned()
            .ok_or_else(|| DbError::backend_not_found(name))
    }

    /// Registered backend names, sorted
    pub fn backend_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has_backend(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build and initialize a handle for the named backend
    ///
    /// An unknown backend is reported as a connect error, like any other
    /// failure to reach the server.
    pub async fn create(&self, name: &str, host: &str, port: &str) -> DbResult<Handle> {
        let factory = self
            .resolve(name)
            .map_err(|e| DbError::connect(e.to_string()))?;
        Handle::init(factory(), host, port).await
    }

    /// Finish a handle. Safe on an already finished handle.
    pub async fn destroy(&self, mut handle: Handle) -> DbResult<()> {
        handle.finish().await
    }

    /// Create a handle from `config` and bind it
    pub async fn connect(&self, config: &ConnectionConfig) -> DbResult<Handle> {
        let mut handle = self
            .create(&config.backend, &config.host, &config.port)
            .await?;
        if let Err(e) = handle
            .bind(
                &config.database,
                &config.username,
                &config.password,
                config.bind_method.clone(),
            )
            .await
        {
            if let Err(finish_err) = handle.finish().await {
                tracing::warn!(error = %finish_err, "finish after failed bind");
            }
            return Err(e);
        }
        Ok(handle)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("backends", &self.backend_names())
            .finish()
    }
}

/// Process-wide registry using LazyLock and a non-poisoning parking_lot lock
static GLOBAL_REGISTRY: LazyLock<RwLock<Registry>> =
    LazyLock::new(|| RwLock::new(Registry::with_builtin()));

/// Snapshot of the process-wide registry
///
/// The snapshot is detached from the global lock, so it can be held across
/// `.await` points.
pub fn global_registry() -> Registry {
    GLOBAL_REGISTRY.read().clone()
}

/// Register a backend in the process-wide registry
pub fn register_backend<F>(name: impl Into<String>, factory: F)
where
    F: Fn() -> Box<dyn Backend> + Send + Sync + 'static,
{
    GLOBAL_REGISTRY.write().register(name, factory);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::handle::HandleState;
    use crate::types::BindMethod;

    fn healthy_mock() -> Box<dyn Backend> {
        let mut mock = MockBackend::new();
        mock.expect_name().return_const("mock");
        mock.expect_init().returning(|_, _| Ok(()));
        mock.expect_bind().returning(|_, _, _, _| Ok(()));
        mock.expect_unbind().returning(|| Ok(()));
        mock.expect_finish().returning(|| Ok(()));
        Box::new(mock)
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = Registry::new();
        assert!(registry.backend_names().is_empty());

        registry.register("zeta", healthy_mock);
        registry.register("alpha", healthy_mock);
        assert_eq!(registry.backend_names(), vec!["alpha", "zeta"]);
        assert!(registry.resolve("alpha").is_ok());

        match registry.resolve("nosuch") {
            Err(DbError::BackendNotFound { name }) => assert_eq!(name, "nosuch"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_builtin_has_sqlite() {
        assert!(Registry::with_builtin().has_backend("sqlite3"));
        assert!(global_registry().has_backend("sqlite3"));
    }

    #[tokio::test]
    async fn test_create_unknown_backend_is_connect_error() {
        let registry = Registry::new();
        let err = registry.create("nosuch", "", "").await.unwrap_err();
        assert!(matches!(err, DbError::Connect { .. }));
        assert!(err.message().contains("nosuch"));
    }

    #[tokio::test]
    async fn test_create_and_destroy() {
        let mut registry = Registry::new();
        registry.register("mock", healthy_mock);

        let mut handle = registry.create("mock", "localhost", "1").await.unwrap();
        assert_eq!(handle.state(), HandleState::Init);
        handle.bind("db", "", "", BindMethod::Simple).await.unwrap();
        registry.destroy(handle).await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_binds() {
        let mut registry = Registry::new();
        registry.register("mock", healthy_mock);

        let config = ConnectionConfig::new("mock").with_database("db");
        let mut handle = registry.connect(&config).await.unwrap();
        assert_eq!(handle.state(), HandleState::Bound);
        handle.finish().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_bind_failure_finishes_handle() {
        let mut registry = Registry::new();
        registry.register("mock", || {
            let mut mock = MockBackend::new();
            mock.expect_name().return_const("mock");
            mock.expect_init().returning(|_, _| Ok(()));
            mock.expect_bind()
                .returning(|_, _, _, _| Err(DbError::auth("bad password")));
            mock.expect_finish().times(1).returning(|| Ok(()));
            Box::new(mock) as Box<dyn Backend>
        });

        let err = registry
            .connect(&ConnectionConfig::new("mock"))
            .await
            .unwrap_err();
        assert_eq!(err, DbError::auth("bad password"));
    }

    #[tokio::test]
    async fn test_global_register() {
        register_backend("global-mock", healthy_mock);
        let registry = global_registry();
        assert!(registry.has_backend("global-mock"));
        let handle = registry.create("global-mock", "", "").await.unwrap();
        registry.destroy(handle).await.unwrap();
    }
}
