//! Client configuration file loading

use anyhow::{Context, Result};
use omnidb_core::ConnectionConfig;
use std::fs;
use std::path::Path;

/// Load the connection configuration from a TOML file
///
/// Missing keys take their defaults; a missing file is an error.
pub fn load_config(path: &Path) -> Result<ConnectionConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("cannot read config file '{}'", path.display()))?;
    let config: ConnectionConfig = toml::from_str(&content)
        .with_context(|| format!("invalid config file '{}'", path.display()))?;

    tracing::debug!(
        backend = %config.backend,
        host = %config.host,
        database = %config.database,
        chunk_size = config.chunk_size,
        "configuration loaded"
    );
    Ok(config)
}
