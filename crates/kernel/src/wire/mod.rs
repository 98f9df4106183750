//! Wire DTOs crossing the WASM ABI.
//!
//! Every payload passed between host and guest is one of these structs,
//! serialized as JSON. Host-native enums are mapped to and from their wire
//! representations here and in `hostlib::convert`; nothing else in the
//! kernel speaks wire types.

mod capability;
mod event;
mod facade;
mod plugin;

use serde::{Deserialize, Serialize};

pub use capability::{
    CacheDeleteRequest, CacheDeleteResponse, CacheGetRequest, CacheGetResponse, CacheSetRequest,
    CacheSetResponse, HttpFetchRequest, HttpFetchResponse, LogRequest, LogResponse,
    StorageDeleteRequest, StorageDeleteResponse, StorageGetRequest, StorageGetResponse,
    StorageListRequest, StorageListResponse, StorageSetRequest, StorageSetResponse,
    WireStorageEntry,
};
pub use event::{
    Event, EventPayload, EventResult, EventType, GetSubscribedEventsRequest,
    GetSubscribedEventsResponse, PluginContext, ServerEventPayload, TaskEventPayload,
};
pub use facade::{
    CreateDaemonTaskRequest, CreateDaemonTaskResponse, DaemonTaskFilter, DeleteServerRequest,
    DeleteServerResponse, FindDaemonTasksRequest, FindDaemonTasksResponse, FindGameModsRequest,
    FindGameModsResponse, FindGamesRequest, FindGamesResponse, FindNodesRequest,
    FindNodesResponse, FindServerSettingsRequest, FindServerSettingsResponse, FindServersRequest,
    FindServersResponse, FindUsersRequest, FindUsersResponse, GameFilter, GameModFilter,
    GetGameModRequest, GetGameModResponse, GetGameRequest, GetGameResponse, GetNodeRequest,
    GetNodeResponse, GetServerRequest, GetServerResponse, GetUserRequest, GetUserResponse,
    NodeFilter, SaveServerRequest, SaveServerResponse, SaveServerSettingRequest,
    SaveServerSettingResponse, ServerControlRequest, ServerControlResponse, ServerFilter,
    ServerSettingFilter, UserFilter, WireDaemonTask, WireGame, WireGameMod, WireNode, WireServer,
    WireServerSetting, WireUser,
};
pub use plugin::{
    GetInfoRequest, InitializeRequest, InitializeResponse, PluginInfo, ShutdownRequest,
    ShutdownResponse,
};

/// Kind of a wire-level error, mirrored on both sides of the ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    PermissionDenied,
    Backend,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireError {
    pub kind: ErrorKind,
    pub message: String,
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for WireError {}

/// Envelope for every ABI response: `{"ok": ...}` or `{"err": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallResult<T> {
    Ok(T),
    Err(WireError),
}

impl<T> CallResult<T> {
    pub fn ok(value: T) -> Self {
        CallResult::Ok(value)
    }

    pub fn err(kind: ErrorKind, message: impl Into<String>) -> Self {
        CallResult::Err(WireError {
            kind,
            message: message.into(),
        })
    }

    pub fn into_result(self) -> Result<T, WireError> {
        match self {
            CallResult::Ok(v) => Ok(v),
            CallResult::Err(e) => Err(e),
        }
    }
}

/// Entity types as they appear on the wire.
///
/// `Unspecified` is the neutral sentinel unknown values map to; it never
/// reaches the host-native layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireEntityType {
    Unspecified,
    User,
    Node,
    ClientCertificate,
    Game,
    GameMod,
    Server,
    Role,
}

/// Sort criterion as requested by a guest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireSorting {
    pub field: String,
    #[serde(default)]
    pub descending: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WirePagination {
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn call_result_encoding() {
        let ok: CallResult<u32> = CallResult::ok(7);
        assert_eq!(serde_json::to_string(&ok).unwrap(), r#"{"ok":7}"#);

        let err: CallResult<u32> = CallResult::err(ErrorKind::PermissionDenied, "nope");
        let encoded = serde_json::to_string(&err).unwrap();
        assert!(encoded.contains("permission_denied"));

        let decoded: CallResult<u32> = serde_json::from_str(&encoded).unwrap();
        assert!(decoded.into_result().is_err());
    }

    #[test]
    fn wire_entity_type_strings() {
        assert_eq!(
            serde_json::to_string(&WireEntityType::GameMod).unwrap(),
            r#""game_mod""#
        );
        let parsed: WireEntityType = serde_json::from_str(r#""server""#).unwrap();
        assert_eq!(parsed, WireEntityType::Server);
    }
}
