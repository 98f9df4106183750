//! Game server entity.

use uuid::Uuid;

/// Installation state of a game server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerInstalledStatus {
    #[default]
    NotInstalled,
    Installed,
    Installing,
}

impl ServerInstalledStatus {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ServerInstalledStatus::NotInstalled),
            1 => Some(ServerInstalledStatus::Installed),
            2 => Some(ServerInstalledStatus::Installing),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            ServerInstalledStatus::NotInstalled => 0,
            ServerInstalledStatus::Installed => 1,
            ServerInstalledStatus::Installing => 2,
        }
    }
}

/// A managed game server instance.
#[derive(Debug, Clone, Default)]
pub struct Server {
    pub id: u64,
    pub uuid: Uuid,
    pub uuid_short: String,
    pub enabled: bool,
    pub installed: ServerInstalledStatus,
    pub blocked: bool,
    pub name: String,
    /// Game catalog code, e.g. "valheim".
    pub game_id: String,
    /// Owning node (dedicated server) ID.
    pub node_id: u64,
    pub game_mod_id: u64,
    pub server_ip: String,
    pub server_port: u16,
    pub query_port: Option<u16>,
    pub rcon_port: Option<u16>,
    pub dir: String,
    pub su_user: Option<String>,
    pub start_command: Option<String>,
    pub process_active: bool,
}
