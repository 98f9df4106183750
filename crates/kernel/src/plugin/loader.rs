//! Startup loader: reconciles the plugin registry, the module directory,
//! and the autoload list.
//!
//! A registry read failure is fatal; any single plugin failing to load is
//! not. Rows whose module file is missing flip to `error`, never to a
//! silent disable.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::{Plugin, PluginPermission, PluginStatus};
use crate::files::FileStore;
use crate::filters::FindPlugin;
use crate::repositories::PluginRepository;
use crate::wire::PluginInfo;

use super::id::parse_plugin_id;
use super::manager::{LoadOptions, LoadedPlugin, ManagesPlugins};

pub struct Loader {
    manager: Arc<dyn ManagesPlugins>,
    files: Arc<dyn FileStore>,
    plugin_repo: Arc<dyn PluginRepository>,
    autoload: Vec<String>,
    plugins_dir: String,
    /// registry row ID -> guest info ID, for both directions of lookup.
    ids: Mutex<HashMap<u64, String>>,
}

impl Loader {
    pub fn new(
        manager: Arc<dyn ManagesPlugins>,
        files: Arc<dyn FileStore>,
        plugin_repo: Arc<dyn PluginRepository>,
        autoload: Vec<String>,
        plugins_dir: impl Into<String>,
    ) -> Self {
        Self {
            manager,
            files,
            plugin_repo,
            autoload,
            plugins_dir: plugins_dir.into(),
            ids: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve and load the startup set: autoload first (so new modules get
    /// registry rows), then every active registry row.
    pub async fn load_all(&self) -> Result<()> {
        self.process_autoload().await?;
        self.load_from_registry().await
    }

    /// Load a single module file without touching the registry.
    pub async fn load(&self, filename: &str) -> Result<Arc<LoadedPlugin>> {
        let path = self.module_path(filename);
        if !self.files.exists(&path).await? {
            bail!("plugin file not found: {path}");
        }

        let wasm = self.files.read(&path).await?;
        let loaded = self
            .manager
            .load(&wasm, LoadOptions::default())
            .await
            .with_context(|| format!("failed to load {filename}"))?;

        Ok(loaded)
    }

    pub async fn unload(&self, plugin_id: &str) -> Result<()> {
        self.manager.unload(plugin_id).await?;

        Ok(())
    }

    /// The guest info ID a registry row maps to, if loaded this run.
    pub async fn manager_id_for(&self, db_id: u64) -> Option<String> {
        self.ids.lock().await.get(&db_id).cloned()
    }

    /// The registry row a guest info ID maps to, if loaded this run.
    pub async fn db_id_for(&self, manager_id: &str) -> Option<u64> {
        self.ids
            .lock()
            .await
            .iter()
            .find(|(_, info_id)| info_id.as_str() == manager_id)
            .map(|(db_id, _)| *db_id)
    }

    fn module_path(&self, filename: &str) -> String {
        format!("{}/{}", self.plugins_dir.trim_end_matches('/'), filename)
    }

    /// Reconcile autoload filenames with the registry.
    ///
    /// Each module is probe-loaded once to discover its identity, then
    /// unloaded; the registry pass afterwards performs the real load.
    async fn process_autoload(&self) -> Result<()> {
        for filename in &self.autoload {
            let path = self.module_path(filename);
            if !self.files.exists(&path).await? {
                bail!("autoload plugin file not found: {path}");
            }

            let wasm = self.files.read(&path).await?;
            let loaded = self
                .manager
                .load(&wasm, LoadOptions::default())
                .await
                .with_context(|| format!("failed to probe autoload plugin {filename}"))?;

            let info = loaded.info.clone();
            let numeric_id = loaded.numeric_id;
            self.manager.unload(&info.id).await?;

            let existing = self
                .plugin_repo
                .find(&FindPlugin::by_ids(vec![numeric_id]), &[], None)
                .await?;

            match existing.into_iter().next() {
                Some(mut row) => {
                    if row.status != PluginStatus::Active {
                        info!(plugin = %row.name, "activating autoload plugin");
                        row.status = PluginStatus::Active;
                    }
                    if row.filename.is_none() {
                        row.filename = Some(filename.clone());
                    }
                    self.plugin_repo.save(&mut row).await?;
                }
                None => {
                    let mut row = registry_row_for(&info, numeric_id, filename);
                    info!(plugin = %row.name, "registering autoload plugin");
                    self.plugin_repo.save(&mut row).await?;
                }
            }

            self.ids.lock().await.insert(numeric_id, info.id);
        }

        Ok(())
    }

    async fn load_from_registry(&self) -> Result<()> {
        let rows = self
            .plugin_repo
            .find(
                &FindPlugin::by_statuses(vec![PluginStatus::Active]),
                &[],
                None,
            )
            .await
            .context("failed to read plugin registry")?;

        for mut row in rows {
            let Some(filename) = row.filename.clone() else {
                continue;
            };

            let path = self.module_path(&filename);
            let wasm = match self.files.read(&path).await {
                Ok(wasm) => wasm,
                Err(err) => {
                    warn!(plugin = %row.name, path = %path, error = %err, "module file unreadable");
                    self.mark_error(&mut row).await;
                    continue;
                }
            };

            let options = LoadOptions {
                config: row.config.clone(),
                priority: row.priority,
                permissions: row.effective_permissions().into_iter().collect(),
            };

            let loaded = match self.manager.load(&wasm, options).await {
                Ok(loaded) => loaded,
                Err(err) => {
                    warn!(plugin = %row.name, error = %err, "plugin failed to load");
                    self.mark_error(&mut row).await;
                    continue;
                }
            };

            self.ids
                .lock()
                .await
                .insert(row.id, loaded.info.id.clone());

            row.last_loaded_at = Some(Utc::now());
            if let Err(err) = self.plugin_repo.save(&mut row).await {
                warn!(plugin = %row.name, error = %err, "failed to stamp last_loaded_at");
            }
        }

        Ok(())
    }

    async fn mark_error(&self, row: &mut Plugin) {
        row.status = PluginStatus::Error;
        if let Err(err) = self.plugin_repo.save(row).await {
            warn!(plugin = %row.name, error = %err, "failed to mark plugin row as error");
        }
    }
}

/// Registry row for a module discovered via autoload.
///
/// Declared permissions are granted in full: autoload is an operator action
/// on a trusted module directory.
fn registry_row_for(info: &PluginInfo, numeric_id: u64, filename: &str) -> Plugin {
    let required: Vec<PluginPermission> = info
        .required_permissions
        .iter()
        .filter_map(|p| PluginPermission::parse(p))
        .collect();

    Plugin {
        id: numeric_id,
        name: info.name.clone(),
        version: info.version.clone(),
        api_version: info.api_version.clone(),
        filename: Some(filename.to_string()),
        required_permissions: required.clone(),
        allowed_permissions: required,
        status: PluginStatus::Active,
        installed_at: Some(Utc::now()),
        ..Default::default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn registry_row_grants_declared_permissions() {
        let info = PluginInfo {
            id: "auto-plugin-id".to_string(),
            name: "auto-plugin".to_string(),
            version: "1.0.0".to_string(),
            api_version: "1.0.0".to_string(),
            required_permissions: vec![
                "listen_events".to_string(),
                "manage_servers".to_string(),
                "bogus".to_string(),
            ],
        };

        let row = registry_row_for(&info, parse_plugin_id(&info.id), "auto-plugin.wasm");

        assert_eq!(row.status, PluginStatus::Active);
        assert_eq!(row.filename.as_deref(), Some("auto-plugin.wasm"));
        assert!(row.installed_at.is_some());
        assert_eq!(row.required_permissions.len(), 2);
        assert_eq!(row.required_permissions, row.allowed_permissions);
        assert_eq!(
            row.effective_permissions(),
            vec![
                PluginPermission::ListenEvents,
                PluginPermission::ManageServers
            ]
        );
    }
}
