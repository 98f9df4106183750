//! Request/response payloads for the domain facades.
//!
//! Every `Find*` accepts an optional filter, optional sorting, and optional
//! pagination, and returns a typed list plus a total count. Mutations return
//! `(success, id, error?)` and never trap the guest.

use serde::{Deserialize, Serialize};

use super::{WirePagination, WireSorting};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireServer {
    pub id: u64,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub uuid_short: String,
    pub enabled: bool,
    #[serde(default)]
    pub installed: i32,
    pub blocked: bool,
    pub name: String,
    pub game_id: String,
    pub node_id: u64,
    pub game_mod_id: u64,
    #[serde(default)]
    pub server_ip: String,
    #[serde(default)]
    pub server_port: i32,
    pub query_port: Option<i32>,
    pub rcon_port: Option<i32>,
    #[serde(default)]
    pub dir: String,
    pub su_user: Option<String>,
    pub start_command: Option<String>,
    #[serde(default)]
    pub process_active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireNode {
    pub id: u64,
    pub enabled: bool,
    pub name: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub location: String,
    pub provider: Option<String>,
    #[serde(default)]
    pub ip: Vec<String>,
    #[serde(default)]
    pub work_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireGame {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub engine: String,
    #[serde(default)]
    pub engine_version: String,
    pub steam_app_id: Option<u64>,
    pub remote_repository: Option<String>,
    pub local_repository: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireGameMod {
    pub id: u64,
    pub game_code: String,
    pub name: String,
    pub default_start_cmd_linux: Option<String>,
    pub default_start_cmd_windows: Option<String>,
    pub remote_repository: Option<String>,
    pub local_repository: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireUser {
    pub id: u64,
    pub login: String,
    #[serde(default)]
    pub email: String,
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireDaemonTask {
    pub id: u64,
    pub node_id: u64,
    pub server_id: Option<u64>,
    pub run_after_id: Option<u64>,
    pub task_type: String,
    pub cmd: Option<String>,
    pub output: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireServerSetting {
    pub id: u64,
    pub server_id: u64,
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerFilter {
    #[serde(default)]
    pub ids: Vec<u64>,
    #[serde(default)]
    pub node_ids: Vec<u64>,
    #[serde(default)]
    pub game_codes: Vec<String>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindServersRequest {
    pub filter: Option<ServerFilter>,
    #[serde(default)]
    pub sorting: Vec<WireSorting>,
    pub pagination: Option<WirePagination>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindServersResponse {
    #[serde(default)]
    pub servers: Vec<WireServer>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetServerRequest {
    pub id: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetServerResponse {
    pub server: Option<WireServer>,
    pub found: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveServerRequest {
    pub server: Option<WireServer>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveServerResponse {
    pub success: bool,
    #[serde(default)]
    pub id: u64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteServerRequest {
    pub id: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteServerResponse {
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeFilter {
    #[serde(default)]
    pub ids: Vec<u64>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindNodesRequest {
    pub filter: Option<NodeFilter>,
    #[serde(default)]
    pub sorting: Vec<WireSorting>,
    pub pagination: Option<WirePagination>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindNodesResponse {
    #[serde(default)]
    pub nodes: Vec<WireNode>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetNodeRequest {
    pub id: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetNodeResponse {
    pub node: Option<WireNode>,
    pub found: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameFilter {
    #[serde(default)]
    pub codes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindGamesRequest {
    pub filter: Option<GameFilter>,
    #[serde(default)]
    pub sorting: Vec<WireSorting>,
    pub pagination: Option<WirePagination>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindGamesResponse {
    #[serde(default)]
    pub games: Vec<WireGame>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetGameRequest {
    pub code: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetGameResponse {
    pub game: Option<WireGame>,
    pub found: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameModFilter {
    #[serde(default)]
    pub ids: Vec<u64>,
    #[serde(default)]
    pub game_codes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindGameModsRequest {
    pub filter: Option<GameModFilter>,
    #[serde(default)]
    pub sorting: Vec<WireSorting>,
    pub pagination: Option<WirePagination>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindGameModsResponse {
    #[serde(default)]
    pub game_mods: Vec<WireGameMod>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetGameModRequest {
    pub id: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetGameModResponse {
    pub game_mod: Option<WireGameMod>,
    pub found: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserFilter {
    #[serde(default)]
    pub ids: Vec<u64>,
    #[serde(default)]
    pub logins: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindUsersRequest {
    pub filter: Option<UserFilter>,
    #[serde(default)]
    pub sorting: Vec<WireSorting>,
    pub pagination: Option<WirePagination>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindUsersResponse {
    #[serde(default)]
    pub users: Vec<WireUser>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetUserRequest {
    pub id: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetUserResponse {
    pub user: Option<WireUser>,
    pub found: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonTaskFilter {
    #[serde(default)]
    pub ids: Vec<u64>,
    #[serde(default)]
    pub node_ids: Vec<u64>,
    #[serde(default)]
    pub server_ids: Vec<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindDaemonTasksRequest {
    pub filter: Option<DaemonTaskFilter>,
    #[serde(default)]
    pub sorting: Vec<WireSorting>,
    pub pagination: Option<WirePagination>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindDaemonTasksResponse {
    #[serde(default)]
    pub tasks: Vec<WireDaemonTask>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDaemonTaskRequest {
    pub node_id: u64,
    pub server_id: Option<u64>,
    pub run_after_id: Option<u64>,
    pub task_type: String,
    pub cmd: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateDaemonTaskResponse {
    pub success: bool,
    #[serde(default)]
    pub task_id: u64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSettingFilter {
    #[serde(default)]
    pub ids: Vec<u64>,
    #[serde(default)]
    pub server_ids: Vec<u64>,
    #[serde(default)]
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindServerSettingsRequest {
    pub filter: Option<ServerSettingFilter>,
    #[serde(default)]
    pub sorting: Vec<WireSorting>,
    pub pagination: Option<WirePagination>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindServerSettingsResponse {
    #[serde(default)]
    pub settings: Vec<WireServerSetting>,
    pub total: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveServerSettingRequest {
    pub setting: Option<WireServerSetting>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveServerSettingResponse {
    pub success: bool,
    #[serde(default)]
    pub id: u64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerControlRequest {
    pub server_id: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerControlResponse {
    pub success: bool,
    pub task_id: Option<u64>,
    pub error: Option<String>,
}
