//! Plugin manager: owns the engine and every loaded plugin.
//!
//! Load and unload are serialized through a lifecycle mutex; lookups read
//! the registry in parallel. Calls into one instance are serialized by that
//! instance's own lock, while different instances run concurrently.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use wasmtime::{Engine, Linker, Module};

use crate::domain::PluginPermission;
use crate::hostlib::{HostServices, DECLARED_MODULES};
use crate::wire::{Event, EventResult, EventType, PluginInfo, ShutdownResponse};

use super::error::PluginError;
use super::id::parse_plugin_id;
use super::instance::{GuestCalls, WasmInstance};
use super::runtime::{create_engine, create_linker, PluginState, RuntimeConfig, EPOCH_TICK};

/// Host plugin API version; a guest's major version must match exactly.
pub const PLUGIN_API_VERSION: &str = "1.0.0";

fn api_major(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

/// Per-load parameters supplied by the loader.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Opaque key/value configuration handed to the guest's `initialize`.
    pub config: HashMap<String, String>,
    /// Dispatch ordering priority (higher first).
    pub priority: i32,
    /// Effective (declared ∩ granted) permissions.
    pub permissions: HashSet<PluginPermission>,
}

/// A loaded, initialized plugin.
///
/// Owned by the manager; everyone else holds `Arc` references that must not
/// be retained across an unload.
pub struct LoadedPlugin {
    pub info: PluginInfo,
    /// Compact numeric ID derived from `info.id`.
    pub numeric_id: u64,
    pub priority: i32,
    permissions: HashSet<PluginPermission>,
    enabled: AtomicBool,
    wedged: AtomicBool,
    call_timeout: Duration,
    instance: Mutex<Box<dyn GuestCalls>>,
}

impl LoadedPlugin {
    pub fn new(
        info: PluginInfo,
        numeric_id: u64,
        priority: i32,
        permissions: HashSet<PluginPermission>,
        call_timeout: Duration,
        instance: Box<dyn GuestCalls>,
    ) -> Self {
        Self {
            info,
            numeric_id,
            priority,
            permissions,
            enabled: AtomicBool::new(true),
            wedged: AtomicBool::new(false),
            call_timeout,
            instance: Mutex::new(instance),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Whether a guest invocation blew its deadline; wedged instances are
    /// skipped by the dispatcher until the manager reaps them.
    pub fn is_wedged(&self) -> bool {
        self.wedged.load(Ordering::SeqCst)
    }

    pub fn has_permission(&self, permission: PluginPermission) -> bool {
        self.permissions.contains(&permission)
    }

    pub async fn handle_event(&self, event: &Event) -> Result<EventResult, PluginError> {
        let mut instance = self.instance.lock().await;
        match tokio::time::timeout(self.call_timeout, instance.handle_event(event)).await {
            Ok(result) => result,
            Err(_) => Err(self.mark_wedged("handle_event")),
        }
    }

    pub async fn get_subscribed_events(&self) -> Result<Vec<EventType>, PluginError> {
        let mut instance = self.instance.lock().await;
        match tokio::time::timeout(self.call_timeout, instance.get_subscribed_events()).await {
            Ok(result) => result,
            Err(_) => Err(self.mark_wedged("get_subscribed_events")),
        }
    }

    async fn shutdown_guest(&self) -> Result<ShutdownResponse, PluginError> {
        let mut instance = self.instance.lock().await;
        match tokio::time::timeout(self.call_timeout, instance.shutdown()).await {
            Ok(result) => result,
            Err(_) => Err(self.mark_wedged("shutdown")),
        }
    }

    fn mark_wedged(&self, call: &str) -> PluginError {
        self.wedged.store(true, Ordering::SeqCst);

        PluginError::GuestWedged {
            id: self.info.id.clone(),
            call: call.to_string(),
        }
    }
}

impl std::fmt::Debug for LoadedPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedPlugin")
            .field("id", &self.info.id)
            .field("numeric_id", &self.numeric_id)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// The manager surface the loader and host code depend on.
#[async_trait::async_trait]
pub trait ManagesPlugins: Send + Sync {
    async fn load(
        &self,
        wasm_bytes: &[u8],
        options: LoadOptions,
    ) -> Result<Arc<LoadedPlugin>, PluginError>;

    /// Idempotent: unloading an unknown ID succeeds.
    async fn unload(&self, plugin_id: &str) -> Result<(), PluginError>;

    async fn get_plugin(&self, plugin_id: &str) -> Option<Arc<LoadedPlugin>>;

    async fn get_plugins(&self) -> Vec<Arc<LoadedPlugin>>;

    /// Unload everything, then tear down the runtime.
    async fn shutdown(&self) -> Result<(), PluginError>;
}

/// Owns the wasmtime engine and the registry of loaded plugins.
pub struct Manager {
    engine: Engine,
    linker: Linker<PluginState>,
    services: HostServices,
    config: RuntimeConfig,
    plugins: RwLock<HashMap<String, Arc<LoadedPlugin>>>,
    /// Serializes load/unload against each other.
    lifecycle: Mutex<()>,
    closed: AtomicBool,
    epoch_ticker: JoinHandle<()>,
}

impl Manager {
    /// Create the manager. Must run inside a tokio runtime; the epoch
    /// ticker that lets guest calls yield is spawned here.
    pub fn new(services: HostServices, config: RuntimeConfig) -> Result<Self> {
        let engine = create_engine(&config)?;
        let linker = create_linker(&engine).context("failed to build host linker")?;

        let ticker_engine = engine.clone();
        let epoch_ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(EPOCH_TICK);
            loop {
                interval.tick().await;
                ticker_engine.increment_epoch();
            }
        });

        Ok(Self {
            engine,
            linker,
            services,
            config,
            plugins: RwLock::new(HashMap::new()),
            lifecycle: Mutex::new(()),
            closed: AtomicBool::new(false),
            epoch_ticker,
        })
    }

    /// Unload every wedged instance; returns the IDs reaped.
    pub async fn sweep_wedged(&self) -> Vec<String> {
        let wedged: Vec<String> = {
            let plugins = self.plugins.read().await;
            plugins
                .values()
                .filter(|p| p.is_wedged())
                .map(|p| p.info.id.clone())
                .collect()
        };

        for id in &wedged {
            warn!(plugin = %id, "unloading wedged plugin");
            if let Err(err) = self.unload_inner(id).await {
                warn!(plugin = %id, error = %err, "failed to unload wedged plugin");
            }
        }

        wedged
    }

    fn verify_imports(module: &Module) -> Result<(), PluginError> {
        for import in module.imports() {
            if !DECLARED_MODULES.contains(&import.module()) {
                return Err(PluginError::UndeclaredImport {
                    module: import.module().to_string(),
                });
            }
        }

        Ok(())
    }

    async fn unload_inner(&self, plugin_id: &str) -> Result<(), PluginError> {
        let _guard = self.lifecycle.lock().await;

        let removed = {
            let mut plugins = self.plugins.write().await;
            plugins.remove(plugin_id)
        };

        let Some(plugin) = removed else {
            return Ok(());
        };

        // Best effort; the instance is released either way.
        match plugin.shutdown_guest().await {
            Ok(response) if !response.success => {
                warn!(
                    plugin = %plugin_id,
                    error = response.error.as_deref().unwrap_or("unspecified"),
                    "guest shutdown reported failure"
                );
            }
            Err(err) => {
                warn!(plugin = %plugin_id, error = %err, "guest shutdown failed");
            }
            Ok(_) => {}
        }

        info!(plugin = %plugin_id, "plugin unloaded");

        Ok(())
    }
}

#[async_trait::async_trait]
impl ManagesPlugins for Manager {
    async fn load(
        &self,
        wasm_bytes: &[u8],
        options: LoadOptions,
    ) -> Result<Arc<LoadedPlugin>, PluginError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PluginError::ManagerClosed);
        }

        let _guard = self.lifecycle.lock().await;

        let module =
            Module::new(&self.engine, wasm_bytes).map_err(|err| PluginError::CompilationFailed {
                details: err.to_string(),
            })?;

        Self::verify_imports(&module)?;

        let state = PluginState::new(self.services.clone(), options.permissions.clone());
        let mut instance =
            WasmInstance::instantiate(&self.engine, &self.linker, &module, state).await?;

        let info = tokio::time::timeout(self.config.guest_call_timeout, instance.get_info())
            .await
            .map_err(|_| PluginError::GuestWedged {
                id: "unbound".to_string(),
                call: "get_info".to_string(),
            })??;

        if api_major(&info.api_version) != api_major(PLUGIN_API_VERSION) {
            return Err(PluginError::ApiVersionMismatch {
                id: info.id,
                expected: PLUGIN_API_VERSION.to_string(),
                actual: info.api_version,
            });
        }

        let numeric_id = parse_plugin_id(&info.id);
        {
            let plugins = self.plugins.read().await;
            // An FNV collision on the numeric ID counts as a duplicate too.
            if plugins.contains_key(&info.id)
                || plugins.values().any(|p| p.numeric_id == numeric_id)
            {
                return Err(PluginError::DuplicateId { id: info.id });
            }
        }

        instance.bind_identity(&info.id, numeric_id);

        let init = tokio::time::timeout(
            self.config.guest_call_timeout,
            instance.initialize(&options.config),
        )
        .await
        .map_err(|_| PluginError::GuestWedged {
            id: info.id.clone(),
            call: "initialize".to_string(),
        })?
        .map_err(|err| PluginError::InitFailed {
            id: info.id.clone(),
            details: err.to_string(),
        })?;

        if !init.success {
            return Err(PluginError::InitFailed {
                id: info.id.clone(),
                details: init
                    .error
                    .unwrap_or_else(|| "initialize reported failure".to_string()),
            });
        }

        let loaded = Arc::new(LoadedPlugin::new(
            info.clone(),
            numeric_id,
            options.priority,
            options.permissions,
            self.config.guest_call_timeout,
            Box::new(instance),
        ));

        {
            let mut plugins = self.plugins.write().await;
            plugins.insert(info.id.clone(), Arc::clone(&loaded));
        }

        info!(
            plugin = %info.id,
            name = %info.name,
            version = %info.version,
            "plugin loaded"
        );

        Ok(loaded)
    }

    async fn unload(&self, plugin_id: &str) -> Result<(), PluginError> {
        self.unload_inner(plugin_id).await
    }

    async fn get_plugin(&self, plugin_id: &str) -> Option<Arc<LoadedPlugin>> {
        self.plugins.read().await.get(plugin_id).cloned()
    }

    async fn get_plugins(&self) -> Vec<Arc<LoadedPlugin>> {
        self.plugins.read().await.values().cloned().collect()
    }

    async fn shutdown(&self) -> Result<(), PluginError> {
        self.closed.store(true, Ordering::SeqCst);

        let ids: Vec<String> = {
            let plugins = self.plugins.read().await;
            plugins.keys().cloned().collect()
        };

        for id in ids {
            if let Err(err) = self.unload_inner(&id).await {
                warn!(plugin = %id, error = %err, "unload during shutdown failed");
            }
        }

        self.epoch_ticker.abort();

        Ok(())
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.epoch_ticker.abort();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn api_major_extraction() {
        assert_eq!(api_major("1.0.0"), "1");
        assert_eq!(api_major("2.13.4"), "2");
        assert_eq!(api_major("3"), "3");
    }

    #[tokio::test]
    async fn manager_creation_and_empty_registry() {
        let manager = Manager::new(HostServices::in_memory(), RuntimeConfig::default()).unwrap();

        assert!(manager.get_plugins().await.is_empty());
        assert!(manager.get_plugin("nope").await.is_none());
    }

    #[tokio::test]
    async fn unload_unknown_plugin_is_success() {
        let manager = Manager::new(HostServices::in_memory(), RuntimeConfig::default()).unwrap();

        assert!(manager.unload("missing").await.is_ok());
    }

    #[tokio::test]
    async fn load_after_shutdown_is_refused() {
        let manager = Manager::new(HostServices::in_memory(), RuntimeConfig::default()).unwrap();
        manager.shutdown().await.unwrap();

        let result = manager.load(b"\0asm", LoadOptions::default()).await;
        assert!(matches!(result, Err(PluginError::ManagerClosed)));
    }

    #[tokio::test]
    async fn load_rejects_garbage_module() {
        let manager = Manager::new(HostServices::in_memory(), RuntimeConfig::default()).unwrap();

        let result = manager.load(b"not wasm at all", LoadOptions::default()).await;
        assert!(matches!(result, Err(PluginError::CompilationFailed { .. })));
    }

    #[tokio::test]
    async fn load_rejects_undeclared_imports() {
        let manager = Manager::new(HostServices::in_memory(), RuntimeConfig::default()).unwrap();

        // A module importing a host module outside the declared set.
        let wat = r#"(module (import "filesystem" "open" (func (param i32) (result i32))))"#;
        let result = manager
            .load(wat.as_bytes(), LoadOptions::default())
            .await;
        assert!(matches!(
            result,
            Err(PluginError::UndeclaredImport { module }) if module == "filesystem"
        ));
    }

    #[tokio::test]
    async fn load_requires_guest_exports() {
        let manager = Manager::new(HostServices::in_memory(), RuntimeConfig::default()).unwrap();

        // Valid module, no exports at all.
        let wat = r#"(module (memory (export "memory") 1))"#;
        let result = manager.load(wat.as_bytes(), LoadOptions::default()).await;
        assert!(matches!(result, Err(PluginError::ExportNotFound { .. })));
    }
}
