//! Request/response payloads for the core capabilities: log, cache, http,
//! and per-plugin storage.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{WireEntityType, WirePagination, WireSorting};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRequest {
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub fields: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogResponse {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheGetRequest {
    pub key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheGetResponse {
    #[serde(default)]
    pub value: Vec<u8>,
    pub found: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSetRequest {
    pub key: String,
    #[serde(default)]
    pub value: Vec<u8>,
    /// Zero means the backend's default expiration.
    #[serde(default)]
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSetResponse {
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheDeleteRequest {
    pub key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheDeleteResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpFetchRequest {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
    /// Zero means the host default.
    #[serde(default)]
    pub timeout_seconds: u64,
}

/// Outcome of an outbound fetch. Transport failures populate `error` and
/// leave `status_code` empty; HTTP error statuses are not errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpFetchResponse {
    pub status_code: Option<u16>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Vec<u8>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageGetRequest {
    pub key: String,
    pub entity_type: Option<WireEntityType>,
    pub entity_id: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageGetResponse {
    #[serde(default)]
    pub payload: Vec<u8>,
    pub found: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSetRequest {
    pub key: String,
    pub entity_type: Option<WireEntityType>,
    pub entity_id: Option<u64>,
    #[serde(default)]
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSetResponse {
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageDeleteRequest {
    pub key: String,
    pub entity_type: Option<WireEntityType>,
    pub entity_id: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageDeleteResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageListRequest {
    pub key_prefix: Option<String>,
    pub entity_type: Option<WireEntityType>,
    pub entity_id: Option<u64>,
    #[serde(default)]
    pub sorting: Vec<WireSorting>,
    pub pagination: Option<WirePagination>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireStorageEntry {
    pub key: String,
    pub entity_type: Option<WireEntityType>,
    pub entity_id: Option<u64>,
    #[serde(default)]
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageListResponse {
    #[serde(default)]
    pub entries: Vec<WireStorageEntry>,
}
