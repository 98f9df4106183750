//! Configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::plugin::RuntimeConfig;

/// Kernel configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding plugin WASM modules (default: ./plugins).
    pub plugins_dir: String,

    /// Module filenames to load even without a registry row, comma
    /// separated in `PLUGIN_AUTOLOAD`.
    pub autoload: Vec<String>,

    /// PostgreSQL connection URL; absent means in-memory repositories.
    pub database_url: Option<String>,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Maximum concurrently allocated WASM instances (default: 100).
    pub max_instances: u32,

    /// Maximum memory pages per instance (default: 1024 = 64MB).
    pub max_memory_pages: u64,

    /// Hard upper bound on a single guest invocation, seconds (default: 10).
    pub guest_call_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let plugins_dir = env::var("PLUGINS_DIR").unwrap_or_else(|_| "./plugins".to_string());

        let autoload = env::var("PLUGIN_AUTOLOAD")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let database_url = env::var("DATABASE_URL").ok();

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let max_instances = env::var("PLUGIN_MAX_INSTANCES")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .context("PLUGIN_MAX_INSTANCES must be a valid u32")?;

        let max_memory_pages = env::var("PLUGIN_MAX_MEMORY_PAGES")
            .unwrap_or_else(|_| "1024".to_string())
            .parse()
            .context("PLUGIN_MAX_MEMORY_PAGES must be a valid u64")?;

        let guest_call_timeout_secs = env::var("PLUGIN_CALL_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("PLUGIN_CALL_TIMEOUT_SECS must be a valid u64")?;

        Ok(Self {
            plugins_dir,
            autoload,
            database_url,
            database_max_connections,
            max_instances,
            max_memory_pages,
            guest_call_timeout_secs,
        })
    }

    /// The WASM engine configuration derived from this config.
    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            max_instances: self.max_instances,
            max_memory_pages: self.max_memory_pages,
            guest_call_timeout: Duration::from_secs(self.guest_call_timeout_secs),
        }
    }
}
