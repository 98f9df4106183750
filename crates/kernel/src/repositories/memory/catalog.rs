//! In-memory catalog repositories backing the domain facades.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{DaemonTask, Game, GameMod, Node, Server, ServerSetting, User};
use crate::filters::{
    FindDaemonTask, FindGame, FindGameMod, FindNode, FindServer, FindServerSetting, FindUser,
    Pagination, Sorting,
};
use crate::repositories::{
    DaemonTaskRepository, GameModRepository, GameRepository, NodeRepository, ServerRepository,
    ServerSettingRepository, UserRepository,
};

use super::paginate;

#[derive(Default)]
pub struct MemoryServerRepository {
    inner: RwLock<(HashMap<u64, Server>, u64)>,
}

impl MemoryServerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ServerRepository for MemoryServerRepository {
    async fn find(
        &self,
        filter: &FindServer,
        _order: &[Sorting],
        page: Option<Pagination>,
    ) -> Result<Vec<Server>> {
        #[allow(clippy::unwrap_used)]
        let inner = self.inner.read().unwrap();

        let mut servers: Vec<Server> = inner
            .0
            .values()
            .filter(|s| {
                (filter.ids.is_empty() || filter.ids.contains(&s.id))
                    && (filter.node_ids.is_empty() || filter.node_ids.contains(&s.node_id))
                    && (filter.game_codes.is_empty() || filter.game_codes.contains(&s.game_id))
                    && filter.enabled.is_none_or(|enabled| s.enabled == enabled)
            })
            .cloned()
            .collect();
        servers.sort_by_key(|s| s.id);

        Ok(paginate(servers, page))
    }

    async fn save(&self, server: &mut Server) -> Result<()> {
        #[allow(clippy::unwrap_used)]
        let mut inner = self.inner.write().unwrap();

        if server.id == 0 {
            inner.1 += 1;
            server.id = inner.1;
        }
        inner.0.insert(server.id, server.clone());

        Ok(())
    }

    async fn delete(&self, id: u64) -> Result<()> {
        #[allow(clippy::unwrap_used)]
        self.inner.write().unwrap().0.remove(&id);

        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryNodeRepository {
    nodes: RwLock<HashMap<u64, Node>>,
}

impl MemoryNodeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, node: Node) {
        #[allow(clippy::unwrap_used)]
        self.nodes.write().unwrap().insert(node.id, node);
    }
}

#[async_trait]
impl NodeRepository for MemoryNodeRepository {
    async fn find(
        &self,
        filter: &FindNode,
        _order: &[Sorting],
        page: Option<Pagination>,
    ) -> Result<Vec<Node>> {
        #[allow(clippy::unwrap_used)]
        let nodes = self.nodes.read().unwrap();

        let mut found: Vec<Node> = nodes
            .values()
            .filter(|n| {
                (filter.ids.is_empty() || filter.ids.contains(&n.id))
                    && filter.enabled.is_none_or(|enabled| n.enabled == enabled)
            })
            .cloned()
            .collect();
        found.sort_by_key(|n| n.id);

        Ok(paginate(found, page))
    }
}

#[derive(Default)]
pub struct MemoryGameRepository {
    games: RwLock<HashMap<String, Game>>,
}

impl MemoryGameRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, game: Game) {
        #[allow(clippy::unwrap_used)]
        self.games.write().unwrap().insert(game.code.clone(), game);
    }
}

#[async_trait]
impl GameRepository for MemoryGameRepository {
    async fn find(
        &self,
        filter: &FindGame,
        _order: &[Sorting],
        page: Option<Pagination>,
    ) -> Result<Vec<Game>> {
        #[allow(clippy::unwrap_used)]
        let games = self.games.read().unwrap();

        let mut found: Vec<Game> = games
            .values()
            .filter(|g| filter.codes.is_empty() || filter.codes.contains(&g.code))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.code.cmp(&b.code));

        Ok(paginate(found, page))
    }
}

#[derive(Default)]
pub struct MemoryGameModRepository {
    mods: RwLock<HashMap<u64, GameMod>>,
}

impl MemoryGameModRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, game_mod: GameMod) {
        #[allow(clippy::unwrap_used)]
        self.mods.write().unwrap().insert(game_mod.id, game_mod);
    }
}

#[async_trait]
impl GameModRepository for MemoryGameModRepository {
    async fn find(
        &self,
        filter: &FindGameMod,
        _order: &[Sorting],
        page: Option<Pagination>,
    ) -> Result<Vec<GameMod>> {
        #[allow(clippy::unwrap_used)]
        let mods = self.mods.read().unwrap();

        let mut found: Vec<GameMod> = mods
            .values()
            .filter(|m| {
                (filter.ids.is_empty() || filter.ids.contains(&m.id))
                    && (filter.game_codes.is_empty() || filter.game_codes.contains(&m.game_code))
            })
            .cloned()
            .collect();
        found.sort_by_key(|m| m.id);

        Ok(paginate(found, page))
    }
}

#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<u64, User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) {
        #[allow(clippy::unwrap_used)]
        self.users.write().unwrap().insert(user.id, user);
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find(
        &self,
        filter: &FindUser,
        _order: &[Sorting],
        page: Option<Pagination>,
    ) -> Result<Vec<User>> {
        #[allow(clippy::unwrap_used)]
        let users = self.users.read().unwrap();

        let mut found: Vec<User> = users
            .values()
            .filter(|u| {
                (filter.ids.is_empty() || filter.ids.contains(&u.id))
                    && (filter.logins.is_empty() || filter.logins.contains(&u.login))
            })
            .cloned()
            .collect();
        found.sort_by_key(|u| u.id);

        Ok(paginate(found, page))
    }
}

#[derive(Default)]
pub struct MemoryDaemonTaskRepository {
    inner: RwLock<(HashMap<u64, DaemonTask>, u64)>,
}

impl MemoryDaemonTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DaemonTaskRepository for MemoryDaemonTaskRepository {
    async fn find(
        &self,
        filter: &FindDaemonTask,
        _order: &[Sorting],
        page: Option<Pagination>,
    ) -> Result<Vec<DaemonTask>> {
        #[allow(clippy::unwrap_used)]
        let inner = self.inner.read().unwrap();

        let mut found: Vec<DaemonTask> = inner
            .0
            .values()
            .filter(|t| {
                (filter.ids.is_empty() || filter.ids.contains(&t.id))
                    && (filter.node_ids.is_empty() || filter.node_ids.contains(&t.node_id))
                    && (filter.server_ids.is_empty() || filter.server_ids.contains(&t.server_id))
                    && (filter.tasks.is_empty() || filter.tasks.contains(&t.task))
                    && (filter.statuses.is_empty() || filter.statuses.contains(&t.status))
            })
            .cloned()
            .collect();
        found.sort_by_key(|t| t.id);

        Ok(paginate(found, page))
    }

    async fn save(&self, task: &mut DaemonTask) -> Result<()> {
        #[allow(clippy::unwrap_used)]
        let mut inner = self.inner.write().unwrap();

        let now = Utc::now();
        task.updated_at = Some(now);
        if task.id == 0 {
            inner.1 += 1;
            task.id = inner.1;
            task.created_at = Some(now);
        }
        inner.0.insert(task.id, task.clone());

        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryServerSettingRepository {
    inner: RwLock<(HashMap<u64, ServerSetting>, u64)>,
}

impl MemoryServerSettingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ServerSettingRepository for MemoryServerSettingRepository {
    async fn find(
        &self,
        filter: &FindServerSetting,
        _order: &[Sorting],
        page: Option<Pagination>,
    ) -> Result<Vec<ServerSetting>> {
        #[allow(clippy::unwrap_used)]
        let inner = self.inner.read().unwrap();

        let mut found: Vec<ServerSetting> = inner
            .0
            .values()
            .filter(|s| {
                (filter.ids.is_empty() || filter.ids.contains(&s.id))
                    && (filter.server_ids.is_empty() || filter.server_ids.contains(&s.server_id))
                    && (filter.names.is_empty() || filter.names.contains(&s.name))
            })
            .cloned()
            .collect();
        found.sort_by_key(|s| s.id);

        Ok(paginate(found, page))
    }

    async fn save(&self, setting: &mut ServerSetting) -> Result<()> {
        #[allow(clippy::unwrap_used)]
        let mut inner = self.inner.write().unwrap();

        // Settings upsert on (server_id, name).
        let existing_id = inner
            .0
            .values()
            .find(|s| s.server_id == setting.server_id && s.name == setting.name)
            .map(|s| s.id);

        match existing_id {
            Some(id) => setting.id = id,
            None if setting.id == 0 => {
                inner.1 += 1;
                setting.id = inner.1;
            }
            None => {}
        }
        inner.0.insert(setting.id, setting.clone());

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::DaemonTaskType;

    #[tokio::test]
    async fn server_repo_filters_by_enabled() {
        let repo = MemoryServerRepository::new();

        let mut on = Server {
            enabled: true,
            name: "on".to_string(),
            ..Default::default()
        };
        let mut off = Server {
            enabled: false,
            name: "off".to_string(),
            ..Default::default()
        };
        repo.save(&mut on).await.unwrap();
        repo.save(&mut off).await.unwrap();

        let filter = FindServer {
            enabled: Some(true),
            ..Default::default()
        };
        let found = repo.find(&filter, &[], None).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "on");
    }

    #[tokio::test]
    async fn daemon_task_save_assigns_id() {
        let repo = MemoryDaemonTaskRepository::new();

        let mut task = DaemonTask {
            id: 0,
            node_id: 3,
            server_id: Some(7),
            run_after_id: None,
            task: DaemonTaskType::ServerStart,
            cmd: None,
            output: None,
            status: Default::default(),
            created_at: None,
            updated_at: None,
        };
        repo.save(&mut task).await.unwrap();

        assert_eq!(task.id, 1);
        assert!(task.created_at.is_some());
    }

    #[tokio::test]
    async fn server_setting_upserts_on_server_and_name() {
        let repo = MemoryServerSettingRepository::new();

        let mut first = ServerSetting {
            server_id: 1,
            name: "autostart".to_string(),
            value: "0".to_string(),
            ..Default::default()
        };
        repo.save(&mut first).await.unwrap();

        let mut second = ServerSetting {
            server_id: 1,
            name: "autostart".to_string(),
            value: "1".to_string(),
            ..Default::default()
        };
        repo.save(&mut second).await.unwrap();

        assert_eq!(first.id, second.id);
        let found = repo
            .find(&FindServerSetting::default(), &[], None)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, "1");
    }
}
