//! Plugin registry row and its closed vocabularies.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Lifecycle status of a registry row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginStatus {
    Active,
    Disabled,
    Error,
    Updating,
}

impl PluginStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginStatus::Active => "active",
            PluginStatus::Disabled => "disabled",
            PluginStatus::Error => "error",
            PluginStatus::Updating => "updating",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(PluginStatus::Active),
            "disabled" => Some(PluginStatus::Disabled),
            "error" => Some(PluginStatus::Error),
            "updating" => Some(PluginStatus::Updating),
            _ => None,
        }
    }
}

/// Coarse-grained grant controlling which host facades a plugin may invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginPermission {
    ManageServers,
    ManageNodes,
    ManageGames,
    ManageGameMods,
    ManageUsers,
    Files,
    ListenEvents,
}

impl PluginPermission {
    pub const ALL: [PluginPermission; 7] = [
        PluginPermission::ManageServers,
        PluginPermission::ManageNodes,
        PluginPermission::ManageGames,
        PluginPermission::ManageGameMods,
        PluginPermission::ManageUsers,
        PluginPermission::Files,
        PluginPermission::ListenEvents,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PluginPermission::ManageServers => "manage_servers",
            PluginPermission::ManageNodes => "manage_nodes",
            PluginPermission::ManageGames => "manage_games",
            PluginPermission::ManageGameMods => "manage_game_mods",
            PluginPermission::ManageUsers => "manage_users",
            PluginPermission::Files => "files",
            PluginPermission::ListenEvents => "listen_events",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.as_str() == s)
    }
}

/// A row of the plugin registry.
///
/// `id` is the compact numeric ID derived from the guest-declared string ID
/// (see `plugin::id`). Names are unique across the registry.
#[derive(Debug, Clone, Default)]
pub struct Plugin {
    pub id: u64,
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub api_version: String,
    pub filename: Option<String>,
    pub source: Option<String>,
    pub homepage: Option<String>,
    pub required_permissions: Vec<PluginPermission>,
    pub allowed_permissions: Vec<PluginPermission>,
    pub status: PluginStatus,
    pub priority: i32,
    pub category: Option<String>,
    pub dependencies: Vec<String>,
    pub config: HashMap<String, String>,
    pub installed_at: Option<DateTime<Utc>>,
    pub last_loaded_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for PluginStatus {
    fn default() -> Self {
        PluginStatus::Disabled
    }
}

impl Plugin {
    /// Permissions the plugin may actually use: declared by the author and
    /// granted by the operator.
    pub fn effective_permissions(&self) -> Vec<PluginPermission> {
        self.required_permissions
            .iter()
            .copied()
            .filter(|p| self.allowed_permissions.contains(p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for status in [
            PluginStatus::Active,
            PluginStatus::Disabled,
            PluginStatus::Error,
            PluginStatus::Updating,
        ] {
            assert_eq!(PluginStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PluginStatus::parse("unknown"), None);
    }

    #[test]
    fn permission_round_trips() {
        for perm in PluginPermission::ALL {
            assert_eq!(PluginPermission::parse(perm.as_str()), Some(perm));
        }
    }

    #[test]
    fn effective_permissions_is_intersection() {
        let plugin = Plugin {
            required_permissions: vec![
                PluginPermission::ManageServers,
                PluginPermission::ListenEvents,
            ],
            allowed_permissions: vec![
                PluginPermission::ListenEvents,
                PluginPermission::ManageUsers,
            ],
            ..Default::default()
        };

        assert_eq!(
            plugin.effective_permissions(),
            vec![PluginPermission::ListenEvents]
        );
    }
}
