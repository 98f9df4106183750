//! Host capability libraries exported to WASM guests.
//!
//! Every operation is a guest-importable function `(req_ptr, req_len) ->
//! packed_resp` where the return value packs `resp_ptr << 32 | resp_len`.
//! Payloads are JSON wire DTOs wrapped in a [`CallResult`] envelope; the
//! response buffer is allocated through the guest's exported `allocate`.

pub mod convert;

mod cache;
mod daemon_tasks;
mod env;
mod game_mods;
mod games;
mod http;
mod log;
mod nodes;
mod server_control;
mod server_settings;
mod servers;
mod storage;
mod users;

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::error;
use wasmtime::{Caller, Linker, Memory};

use crate::cache::Cache;
use crate::domain::PluginPermission;
use crate::plugin::{PluginError, PluginState};
use crate::repositories::{
    DaemonTaskRepository, GameModRepository, GameRepository, NodeRepository,
    PluginStorageRepository, ServerRepository, ServerSettingRepository, UserRepository,
};
use crate::wire::{CallResult, ErrorKind, WireError};

pub use server_control::{ControlAction, NullServerControl, ServerControl};

/// Host modules a guest is allowed to import.
pub const DECLARED_MODULES: &[&str] = &[
    "env",
    "wasi_snapshot_preview1",
    "log",
    "cache",
    "http",
    "storage",
    "nodes",
    "games",
    "game_mods",
    "servers",
    "users",
    "daemon_tasks",
    "server_settings",
    "server_control",
];

/// Shared services the capabilities reach into.
///
/// Cloned into every call scope; everything inside is reference counted.
#[derive(Clone)]
pub struct HostServices {
    pub cache: Arc<dyn Cache>,
    pub storage: Arc<dyn PluginStorageRepository>,
    pub servers: Arc<dyn ServerRepository>,
    pub nodes: Arc<dyn NodeRepository>,
    pub games: Arc<dyn GameRepository>,
    pub game_mods: Arc<dyn GameModRepository>,
    pub users: Arc<dyn UserRepository>,
    pub daemon_tasks: Arc<dyn DaemonTaskRepository>,
    pub server_settings: Arc<dyn ServerSettingRepository>,
    pub server_control: Arc<dyn ServerControl>,
    pub http: reqwest::Client,
}

impl HostServices {
    /// Fully in-memory services, for tests and database-less installs.
    pub fn in_memory() -> Self {
        use crate::repositories::memory;

        Self {
            cache: Arc::new(crate::cache::MemoryCache::new()),
            storage: Arc::new(memory::MemoryPluginStorageRepository::new()),
            servers: Arc::new(memory::MemoryServerRepository::new()),
            nodes: Arc::new(memory::MemoryNodeRepository::new()),
            games: Arc::new(memory::MemoryGameRepository::new()),
            game_mods: Arc::new(memory::MemoryGameModRepository::new()),
            users: Arc::new(memory::MemoryUserRepository::new()),
            daemon_tasks: Arc::new(memory::MemoryDaemonTaskRepository::new()),
            server_settings: Arc::new(memory::MemoryServerSettingRepository::new()),
            server_control: Arc::new(NullServerControl),
            http: reqwest::Client::new(),
        }
    }
}

impl std::fmt::Debug for HostServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostServices").finish()
    }
}

/// Per-call snapshot of the calling plugin's state.
#[derive(Clone)]
pub(crate) struct CallScope {
    pub plugin_ref: String,
    pub plugin_id: u64,
    pub cache_prefix: String,
    pub permissions: HashSet<PluginPermission>,
    pub services: HostServices,
}

impl CallScope {
    fn from_state(state: &PluginState) -> Self {
        Self {
            plugin_ref: state.plugin_ref.clone(),
            plugin_id: state.plugin_id,
            cache_prefix: state.cache_prefix.clone(),
            permissions: state.permissions.clone(),
            services: state.services.clone(),
        }
    }

    /// Gate a facade call on an operator-granted permission.
    pub fn require(&self, permission: PluginPermission) -> Result<(), WireError> {
        if self.permissions.contains(&permission) {
            return Ok(());
        }

        tracing::warn!(
            plugin = %self.plugin_ref,
            permission = permission.as_str(),
            "facade call denied"
        );

        Err(WireError {
            kind: ErrorKind::PermissionDenied,
            message: format!("permission '{}' not granted", permission.as_str()),
        })
    }
}

pub(crate) type OpFuture<T> = Pin<Box<dyn Future<Output = Result<T, WireError>> + Send>>;

/// Register all host capabilities with the linker.
pub fn register_all(linker: &mut Linker<PluginState>) -> Result<()> {
    env::register_env(linker)?;
    log::register_log(linker)?;
    cache::register_cache(linker)?;
    http::register_http(linker)?;
    storage::register_storage(linker)?;
    nodes::register_nodes(linker)?;
    games::register_games(linker)?;
    game_mods::register_game_mods(linker)?;
    servers::register_servers(linker)?;
    users::register_users(linker)?;
    daemon_tasks::register_daemon_tasks(linker)?;
    server_settings::register_server_settings(linker)?;
    server_control::register_server_control(linker)?;

    Ok(())
}

/// Register one request/response operation under `module.name`.
///
/// Decodes the request, runs the handler against a call scope snapshot, and
/// writes the enveloped response back into guest memory. Failures that
/// cannot be conveyed (broken guest memory, missing `allocate`) are logged
/// and reported as a zero-length response.
pub(crate) fn register_op<Req, Resp, F>(
    linker: &mut Linker<PluginState>,
    module: &'static str,
    name: &'static str,
    handler: F,
) -> Result<()>
where
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + 'static,
    F: Fn(CallScope, Req) -> OpFuture<Resp> + Send + Sync + Clone + 'static,
{
    linker.func_wrap_async(
        module,
        name,
        move |mut caller: Caller<'_, PluginState>, (req_ptr, req_len): (i32, i32)| {
            let handler = handler.clone();
            Box::new(async move {
                match run_op(&mut caller, req_ptr, req_len, module, name, handler).await {
                    Ok(packed) => packed,
                    Err(err) => {
                        error!(
                            plugin = %caller.data().plugin_ref,
                            op = %format!("{module}.{name}"),
                            error = %err,
                            "host call failed"
                        );
                        0
                    }
                }
            })
        },
    )?;

    Ok(())
}

async fn run_op<Req, Resp, F>(
    caller: &mut Caller<'_, PluginState>,
    req_ptr: i32,
    req_len: i32,
    module: &'static str,
    name: &'static str,
    handler: F,
) -> Result<i64, PluginError>
where
    Req: DeserializeOwned,
    Resp: Serialize,
    F: Fn(CallScope, Req) -> OpFuture<Resp>,
{
    let request_bytes = read_guest_bytes(caller, req_ptr, req_len)?;

    let response: CallResult<Resp> = match serde_json::from_slice::<Req>(&request_bytes) {
        Ok(request) => {
            let scope = CallScope::from_state(caller.data());
            match handler(scope, request).await {
                Ok(response) => CallResult::Ok(response),
                Err(err) => CallResult::Err(err),
            }
        }
        Err(err) => CallResult::err(
            ErrorKind::Validation,
            format!("invalid {module}.{name} request: {err}"),
        ),
    };

    let bytes = serde_json::to_vec(&response).map_err(|err| PluginError::GuestError {
        id: caller.data().plugin_ref.clone(),
        message: format!("response encoding failed: {err}"),
    })?;

    write_guest_response(caller, &bytes).await
}

pub(crate) fn guest_memory(caller: &mut Caller<'_, PluginState>) -> Result<Memory, PluginError> {
    match caller.get_export("memory") {
        Some(wasmtime::Extern::Memory(memory)) => Ok(memory),
        _ => Err(PluginError::ExportNotFound {
            missing: "memory".to_string(),
        }),
    }
}

pub(crate) fn read_guest_bytes(
    caller: &mut Caller<'_, PluginState>,
    ptr: i32,
    len: i32,
) -> Result<Vec<u8>, PluginError> {
    let memory = guest_memory(caller)?;
    let data = memory.data(&caller);
    let ptr = ptr as usize;
    let len = len as usize;

    if ptr.checked_add(len).is_none_or(|end| end > data.len()) {
        return Err(PluginError::MemoryOutOfRange);
    }

    Ok(data[ptr..ptr + len].to_vec())
}

/// Place a response in guest memory via the guest's `allocate` export and
/// pack its location into the i64 ABI return value.
pub(crate) async fn write_guest_response(
    caller: &mut Caller<'_, PluginState>,
    bytes: &[u8],
) -> Result<i64, PluginError> {
    let allocate = caller
        .get_export("allocate")
        .and_then(|ext| ext.into_func())
        .ok_or_else(|| PluginError::ExportNotFound {
            missing: "allocate".to_string(),
        })?;

    let allocate = allocate
        .typed::<i32, i32>(&*caller)
        .map_err(|_| PluginError::ExportNotFound {
            missing: "allocate(i32) -> i32".to_string(),
        })?;

    let ptr = allocate
        .call_async(&mut *caller, bytes.len() as i32)
        .await
        .map_err(|err| PluginError::GuestError {
            id: caller.data().plugin_ref.clone(),
            message: format!("allocate failed: {err}"),
        })?;

    let memory = guest_memory(caller)?;
    memory
        .write(&mut *caller, ptr as usize, bytes)
        .map_err(|_| PluginError::MemoryOutOfRange)?;

    Ok(pack_response(ptr, bytes.len() as i32))
}

pub(crate) fn pack_response(ptr: i32, len: i32) -> i64 {
    ((ptr as i64) << 32) | (len as i64 & 0xFFFF_FFFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_response_layout() {
        let packed = pack_response(65536, 42);
        assert_eq!((packed >> 32) as i32, 65536);
        assert_eq!((packed & 0xFFFF_FFFF) as i32, 42);
    }

    #[test]
    fn declared_modules_cover_all_capabilities() {
        for module in [
            "log",
            "cache",
            "http",
            "storage",
            "servers",
            "server_control",
            "env",
        ] {
            assert!(DECLARED_MODULES.contains(&module));
        }
    }
}
