//! Repository traits and implementations.
//!
//! The plugin registry and per-plugin storage have both an in-memory and a
//! Postgres implementation; the catalog repositories consumed by the host
//! facades are trait seams with in-memory implementations (their SQL wire
//! formats belong to the surrounding panel, not this crate).

pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{
    DaemonTask, Game, GameMod, Node, Plugin, PluginStorageEntry, Server, ServerSetting, User,
};
use crate::filters::{
    FindDaemonTask, FindGame, FindGameMod, FindNode, FindPlugin, FindPluginStorage, FindServer,
    FindServerSetting, FindUser, Pagination, Sorting,
};

/// Plugin registry persistence.
#[async_trait]
pub trait PluginRepository: Send + Sync {
    async fn find_all(
        &self,
        order: &[Sorting],
        page: Option<Pagination>,
    ) -> Result<Vec<Plugin>>;

    async fn find(
        &self,
        filter: &FindPlugin,
        order: &[Sorting],
        page: Option<Pagination>,
    ) -> Result<Vec<Plugin>>;

    /// Insert or update; assigns `id` and stamps timestamps on the way in.
    async fn save(&self, plugin: &mut Plugin) -> Result<()>;

    async fn delete(&self, id: u64) -> Result<()>;
}

/// Per-plugin payload persistence.
///
/// `save` upserts on the natural key `(plugin_id, key, entity_type,
/// entity_id)`; an entry arriving with an explicit `id` updates that row by
/// ID regardless of its natural key.
#[async_trait]
pub trait PluginStorageRepository: Send + Sync {
    async fn find(
        &self,
        filter: &FindPluginStorage,
        order: &[Sorting],
        page: Option<Pagination>,
    ) -> Result<Vec<PluginStorageEntry>>;

    async fn save(&self, entry: &mut PluginStorageEntry) -> Result<()>;

    /// Unknown IDs delete nothing and succeed.
    async fn delete(&self, id: u64) -> Result<()>;

    /// Remove every entry belonging to one plugin.
    async fn delete_by_plugin(&self, plugin_id: u64) -> Result<()>;
}

#[async_trait]
pub trait ServerRepository: Send + Sync {
    async fn find(
        &self,
        filter: &FindServer,
        order: &[Sorting],
        page: Option<Pagination>,
    ) -> Result<Vec<Server>>;

    async fn save(&self, server: &mut Server) -> Result<()>;

    async fn delete(&self, id: u64) -> Result<()>;
}

#[async_trait]
pub trait NodeRepository: Send + Sync {
    async fn find(
        &self,
        filter: &FindNode,
        order: &[Sorting],
        page: Option<Pagination>,
    ) -> Result<Vec<Node>>;
}

#[async_trait]
pub trait GameRepository: Send + Sync {
    async fn find(
        &self,
        filter: &FindGame,
        order: &[Sorting],
        page: Option<Pagination>,
    ) -> Result<Vec<Game>>;
}

#[async_trait]
pub trait GameModRepository: Send + Sync {
    async fn find(
        &self,
        filter: &FindGameMod,
        order: &[Sorting],
        page: Option<Pagination>,
    ) -> Result<Vec<GameMod>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find(
        &self,
        filter: &FindUser,
        order: &[Sorting],
        page: Option<Pagination>,
    ) -> Result<Vec<User>>;
}

#[async_trait]
pub trait DaemonTaskRepository: Send + Sync {
    async fn find(
        &self,
        filter: &FindDaemonTask,
        order: &[Sorting],
        page: Option<Pagination>,
    ) -> Result<Vec<DaemonTask>>;

    async fn save(&self, task: &mut DaemonTask) -> Result<()>;
}

#[async_trait]
pub trait ServerSettingRepository: Send + Sync {
    async fn find(
        &self,
        filter: &FindServerSetting,
        order: &[Sorting],
        page: Option<Pagination>,
    ) -> Result<Vec<ServerSetting>>;

    async fn save(&self, setting: &mut ServerSetting) -> Result<()>;
}
