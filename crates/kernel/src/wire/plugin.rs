//! Plugin lifecycle protocol: identity, initialization, shutdown.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata a guest declares from `get_info`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Author-chosen string ID; the host derives the numeric ID from it.
    pub id: String,
    pub name: String,
    pub version: String,
    pub api_version: String,
    /// Permissions the plugin declares it needs.
    #[serde(default)]
    pub required_permissions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetInfoRequest {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitializeRequest {
    #[serde(default)]
    pub config: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitializeResponse {
    #[serde(default)]
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShutdownRequest {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShutdownResponse {
    #[serde(default)]
    pub success: bool,
    pub error: Option<String>,
}
