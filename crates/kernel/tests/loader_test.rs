//! Integration tests for the startup loader, driven through a scripted
//! manager at the `ManagesPlugins` seam.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use gamedock_kernel::domain::{Plugin, PluginStatus};
use gamedock_kernel::files::MemoryFileStore;
use gamedock_kernel::plugin::{
    parse_plugin_id, GuestCalls, LoadOptions, LoadedPlugin, Loader, ManagesPlugins, PluginError,
};
use gamedock_kernel::repositories::memory::MemoryPluginRepository;
use gamedock_kernel::repositories::PluginRepository;
use gamedock_kernel::wire::{
    Event, EventResult, EventType, InitializeResponse, PluginInfo, ShutdownResponse,
};
use tokio::sync::RwLock;

struct NoopGuest;

#[async_trait]
impl GuestCalls for NoopGuest {
    async fn get_info(&mut self) -> Result<PluginInfo, PluginError> {
        Ok(PluginInfo::default())
    }

    async fn initialize(
        &mut self,
        _config: &HashMap<String, String>,
    ) -> Result<InitializeResponse, PluginError> {
        Ok(InitializeResponse {
            success: true,
            error: None,
        })
    }

    async fn shutdown(&mut self) -> Result<ShutdownResponse, PluginError> {
        Ok(ShutdownResponse {
            success: true,
            error: None,
        })
    }

    async fn get_subscribed_events(&mut self) -> Result<Vec<EventType>, PluginError> {
        Ok(Vec::new())
    }

    async fn handle_event(&mut self, _event: &Event) -> Result<EventResult, PluginError> {
        Ok(EventResult::default())
    }
}

/// Manager double that answers every load with a fixed identity.
struct ScriptedManager {
    info: PluginInfo,
    load_calls: AtomicUsize,
    plugins: RwLock<HashMap<String, Arc<LoadedPlugin>>>,
}

impl ScriptedManager {
    fn new(info_id: &str, name: &str) -> Self {
        Self {
            info: PluginInfo {
                id: info_id.to_string(),
                name: name.to_string(),
                version: "1.0.0".to_string(),
                api_version: "1.0.0".to_string(),
                required_permissions: vec!["listen_events".to_string()],
            },
            load_calls: AtomicUsize::new(0),
            plugins: RwLock::new(HashMap::new()),
        }
    }

    fn load_count(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    async fn plugin_count(&self) -> usize {
        self.plugins.read().await.len()
    }
}

#[async_trait]
impl ManagesPlugins for ScriptedManager {
    async fn load(
        &self,
        _wasm_bytes: &[u8],
        options: LoadOptions,
    ) -> Result<Arc<LoadedPlugin>, PluginError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);

        let loaded = Arc::new(LoadedPlugin::new(
            self.info.clone(),
            parse_plugin_id(&self.info.id),
            options.priority,
            HashSet::new(),
            Duration::from_secs(5),
            Box::new(NoopGuest),
        ));

        self.plugins
            .write()
            .await
            .insert(self.info.id.clone(), Arc::clone(&loaded));

        Ok(loaded)
    }

    async fn unload(&self, plugin_id: &str) -> Result<(), PluginError> {
        self.plugins.write().await.remove(plugin_id);

        Ok(())
    }

    async fn get_plugin(&self, plugin_id: &str) -> Option<Arc<LoadedPlugin>> {
        self.plugins.read().await.get(plugin_id).cloned()
    }

    async fn get_plugins(&self) -> Vec<Arc<LoadedPlugin>> {
        self.plugins.read().await.values().cloned().collect()
    }

    async fn shutdown(&self) -> Result<(), PluginError> {
        Ok(())
    }
}

fn active_row(name: &str, filename: &str) -> Plugin {
    Plugin {
        name: name.to_string(),
        version: "1.0.0".to_string(),
        filename: Some(filename.to_string()),
        status: PluginStatus::Active,
        ..Default::default()
    }
}

#[tokio::test]
async fn load_all_from_registry() {
    let manager = Arc::new(ScriptedManager::new("test-plugin-id", "test-plugin"));
    let files = Arc::new(MemoryFileStore::new());
    let repo = Arc::new(MemoryPluginRepository::new());

    files.write("plugins/test-plugin.wasm", b"wasm-content".to_vec());

    let mut row = active_row("test-plugin", "test-plugin.wasm");
    repo.save(&mut row).await.unwrap();

    let loader = Loader::new(
        manager.clone(),
        files,
        repo.clone(),
        Vec::new(),
        "plugins",
    );

    loader.load_all().await.unwrap();

    assert_eq!(manager.load_count(), 1);
    assert_eq!(
        loader.manager_id_for(row.id).await.as_deref(),
        Some("test-plugin-id")
    );
}

#[tokio::test]
async fn load_all_stamps_last_loaded_at() {
    let manager = Arc::new(ScriptedManager::new("test-plugin-id", "test-plugin"));
    let files = Arc::new(MemoryFileStore::new());
    let repo = Arc::new(MemoryPluginRepository::new());

    files.write("plugins/test-plugin.wasm", b"wasm-content".to_vec());
    repo.save(&mut active_row("test-plugin", "test-plugin.wasm"))
        .await
        .unwrap();

    let before = Utc::now();
    let loader = Loader::new(manager, files, repo.clone(), Vec::new(), "plugins");
    loader.load_all().await.unwrap();

    let rows = repo.find_all(&[], None).await.unwrap();
    assert_eq!(rows.len(), 1);
    let loaded_at = rows[0].last_loaded_at.unwrap();
    assert!(loaded_at >= before);
}

#[tokio::test]
async fn autoload_registers_new_plugin() {
    let manager = Arc::new(ScriptedManager::new("auto-plugin-id", "auto-plugin"));
    let files = Arc::new(MemoryFileStore::new());
    let repo = Arc::new(MemoryPluginRepository::new());

    files.write("plugins/auto.wasm", b"wasm-content".to_vec());

    let loader = Loader::new(
        manager.clone(),
        files,
        repo.clone(),
        vec!["auto.wasm".to_string()],
        "plugins",
    );

    loader.load_all().await.unwrap();

    // Probe load plus the registry pass.
    assert_eq!(manager.load_count(), 2);
    assert_eq!(manager.plugin_count().await, 1);

    let rows = repo.find_all(&[], None).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "auto-plugin");
    assert_eq!(rows[0].status, PluginStatus::Active);
    assert_eq!(rows[0].filename.as_deref(), Some("auto.wasm"));
    assert!(rows[0].installed_at.is_some());
    assert!(!rows[0].allowed_permissions.is_empty());
}

#[tokio::test]
async fn autoload_activates_disabled_row() {
    let manager = Arc::new(ScriptedManager::new("existing-id", "existing-plugin"));
    let files = Arc::new(MemoryFileStore::new());
    let repo = Arc::new(MemoryPluginRepository::new());

    files.write("plugins/existing.wasm", b"wasm-content".to_vec());

    let mut row = Plugin {
        id: parse_plugin_id("existing-id"),
        name: "existing-plugin".to_string(),
        version: "1.0.0".to_string(),
        status: PluginStatus::Disabled,
        ..Default::default()
    };
    repo.save(&mut row).await.unwrap();

    let loader = Loader::new(
        manager,
        files,
        repo.clone(),
        vec!["existing.wasm".to_string()],
        "plugins",
    );
    loader.load_all().await.unwrap();

    let rows = repo.find_all(&[], None).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, PluginStatus::Active);
    assert_eq!(rows[0].filename.as_deref(), Some("existing.wasm"));
}

#[tokio::test]
async fn autoload_missing_file_is_fatal() {
    let manager = Arc::new(ScriptedManager::new("auto-plugin-id", "auto-plugin"));
    let files = Arc::new(MemoryFileStore::new());
    let repo = Arc::new(MemoryPluginRepository::new());

    let loader = Loader::new(
        manager,
        files,
        repo,
        vec!["missing.wasm".to_string()],
        "plugins",
    );

    let err = loader.load_all().await.unwrap_err();
    assert!(err.to_string().contains("autoload plugin file not found"));
}

#[tokio::test]
async fn single_load_missing_file() {
    let manager = Arc::new(ScriptedManager::new("test-plugin-id", "test-plugin"));
    let files = Arc::new(MemoryFileStore::new());
    let repo = Arc::new(MemoryPluginRepository::new());

    let loader = Loader::new(manager, files, repo, Vec::new(), "plugins");

    let err = loader.load("nonexistent.wasm").await.unwrap_err();
    assert!(err.to_string().contains("plugin file not found"));
}

#[tokio::test]
async fn missing_module_file_marks_row_error_and_continues() {
    let manager = Arc::new(ScriptedManager::new("healthy-id", "healthy"));
    let files = Arc::new(MemoryFileStore::new());
    let repo = Arc::new(MemoryPluginRepository::new());

    // Only the healthy module exists on disk.
    files.write("plugins/healthy.wasm", b"wasm-content".to_vec());

    let mut broken = active_row("broken", "broken.wasm");
    let mut healthy = active_row("healthy", "healthy.wasm");
    repo.save(&mut broken).await.unwrap();
    repo.save(&mut healthy).await.unwrap();

    let loader = Loader::new(manager.clone(), files, repo.clone(), Vec::new(), "plugins");
    loader.load_all().await.unwrap();

    assert_eq!(manager.load_count(), 1);

    let rows = repo.find_all(&[], None).await.unwrap();
    let broken_row = rows.iter().find(|r| r.name == "broken").unwrap();
    let healthy_row = rows.iter().find(|r| r.name == "healthy").unwrap();
    assert_eq!(broken_row.status, PluginStatus::Error);
    assert_eq!(healthy_row.status, PluginStatus::Active);
    assert!(healthy_row.last_loaded_at.is_some());
}

#[tokio::test]
async fn id_mappings_work_both_ways() {
    let manager = Arc::new(ScriptedManager::new("mapped-id", "mapped"));
    let files = Arc::new(MemoryFileStore::new());
    let repo = Arc::new(MemoryPluginRepository::new());

    files.write("plugins/mapped.wasm", b"wasm-content".to_vec());
    let mut row = active_row("mapped", "mapped.wasm");
    repo.save(&mut row).await.unwrap();

    let loader = Loader::new(manager, files, repo, Vec::new(), "plugins");
    loader.load_all().await.unwrap();

    assert_eq!(
        loader.manager_id_for(row.id).await.as_deref(),
        Some("mapped-id")
    );
    assert_eq!(loader.db_id_for("mapped-id").await, Some(row.id));
    assert_eq!(loader.manager_id_for(999_999).await, None);
    assert_eq!(loader.db_id_for("unknown").await, None);
}
