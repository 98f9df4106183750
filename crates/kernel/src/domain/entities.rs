//! Catalog entities exposed to plugins through the read facades.

use chrono::{DateTime, Utc};

/// A dedicated server (node) that hosts game servers.
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub id: u64,
    pub enabled: bool,
    pub name: String,
    pub os: String,
    pub location: String,
    pub provider: Option<String>,
    pub ip: Vec<String>,
    pub work_path: String,
}

/// A supported game in the catalog, keyed by its string code.
#[derive(Debug, Clone, Default)]
pub struct Game {
    pub code: String,
    pub name: String,
    pub engine: String,
    pub engine_version: String,
    pub steam_app_id: Option<u64>,
    pub remote_repository: Option<String>,
    pub local_repository: Option<String>,
}

/// A launch variant of a game (mod), carrying default start parameters.
#[derive(Debug, Clone, Default)]
pub struct GameMod {
    pub id: u64,
    pub game_code: String,
    pub name: String,
    pub default_start_cmd_linux: Option<String>,
    pub default_start_cmd_windows: Option<String>,
    pub remote_repository: Option<String>,
    pub local_repository: Option<String>,
}

/// A panel user account.
#[derive(Debug, Clone, Default)]
pub struct User {
    pub id: u64,
    pub login: String,
    pub email: String,
    pub name: Option<String>,
    pub roles: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A per-server key/value setting.
#[derive(Debug, Clone, Default)]
pub struct ServerSetting {
    pub id: u64,
    pub server_id: u64,
    pub name: String,
    pub value: String,
}
