//! A live WASM plugin instance and the guest-call seam.
//!
//! Host→guest calls share one ABI: the host serializes the request, places
//! it in guest memory through the guest's `allocate` export, invokes the
//! export `(req_ptr, req_len) -> i64`, and reads the response from the
//! packed `ptr << 32 | len` return value.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasmtime::{Engine, Linker, Memory, Module, Store, TypedFunc};

use crate::wire::{
    CallResult, Event, EventResult, EventType, GetInfoRequest, GetSubscribedEventsRequest,
    GetSubscribedEventsResponse, InitializeRequest, InitializeResponse, PluginInfo,
    ShutdownRequest, ShutdownResponse,
};

use super::error::PluginError;
use super::runtime::PluginState;

/// Exports every plugin module must provide, besides `memory`.
pub const REQUIRED_EXPORTS: &[&str] = &[
    "allocate",
    "get_info",
    "initialize",
    "shutdown",
    "handle_event",
    "get_subscribed_events",
];

/// The calls the host makes into a guest.
///
/// Implemented by [`WasmInstance`]; the dispatcher and manager only speak
/// this trait, which keeps them testable without compiled modules.
#[async_trait]
pub trait GuestCalls: Send {
    async fn get_info(&mut self) -> Result<PluginInfo, PluginError>;

    async fn initialize(
        &mut self,
        config: &HashMap<String, String>,
    ) -> Result<InitializeResponse, PluginError>;

    async fn shutdown(&mut self) -> Result<ShutdownResponse, PluginError>;

    async fn get_subscribed_events(&mut self) -> Result<Vec<EventType>, PluginError>;

    async fn handle_event(&mut self, event: &Event) -> Result<EventResult, PluginError>;
}

/// An instantiated plugin module with its store and typed exports.
pub struct WasmInstance {
    store: Store<PluginState>,
    memory: Memory,
    allocate: TypedFunc<i32, i32>,
    get_info: TypedFunc<(i32, i32), i64>,
    initialize: TypedFunc<(i32, i32), i64>,
    shutdown: TypedFunc<(i32, i32), i64>,
    handle_event: TypedFunc<(i32, i32), i64>,
    get_subscribed_events: TypedFunc<(i32, i32), i64>,
}

impl WasmInstance {
    /// Instantiate a compiled module against per-plugin state and resolve
    /// the required exports.
    pub async fn instantiate(
        engine: &Engine,
        linker: &Linker<PluginState>,
        module: &Module,
        state: PluginState,
    ) -> Result<Self, PluginError> {
        let mut store = Store::new(engine, state);
        // Yield back to the executor on every epoch tick so invocation
        // deadlines can fire against hot loops.
        store.epoch_deadline_async_yield_and_update(1);

        let instance = linker
            .instantiate_async(&mut store, module)
            .await
            .map_err(|err| PluginError::CompilationFailed {
                details: format!("instantiation failed: {err}"),
            })?;

        let Some(memory) = instance.get_memory(&mut store, "memory") else {
            return Err(PluginError::ExportNotFound {
                missing: "memory".to_string(),
            });
        };

        let missing: Vec<&str> = REQUIRED_EXPORTS
            .iter()
            .copied()
            .filter(|name| instance.get_func(&mut store, name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(PluginError::ExportNotFound {
                missing: missing.join(", "),
            });
        }

        let typed = |store: &mut Store<PluginState>, name: &str| {
            instance
                .get_typed_func::<(i32, i32), i64>(&mut *store, name)
                .map_err(|_| PluginError::ExportNotFound {
                    missing: format!("{name}(i32, i32) -> i64"),
                })
        };

        let allocate = instance
            .get_typed_func::<i32, i32>(&mut store, "allocate")
            .map_err(|_| PluginError::ExportNotFound {
                missing: "allocate(i32) -> i32".to_string(),
            })?;
        let get_info = typed(&mut store, "get_info")?;
        let initialize = typed(&mut store, "initialize")?;
        let shutdown = typed(&mut store, "shutdown")?;
        let handle_event = typed(&mut store, "handle_event")?;
        let get_subscribed_events = typed(&mut store, "get_subscribed_events")?;

        Ok(Self {
            store,
            memory,
            allocate,
            get_info,
            initialize,
            shutdown,
            handle_event,
            get_subscribed_events,
        })
    }

    /// Bind the identity derived from `get_info` into the store state so
    /// capability calls are scoped from here on.
    pub fn bind_identity(&mut self, info_id: &str, numeric_id: u64) {
        self.store.data_mut().bind_identity(info_id, numeric_id);
    }

    fn plugin_ref(&self) -> String {
        self.store.data().plugin_ref.clone()
    }

    async fn call<Req, Resp>(
        &mut self,
        name: &'static str,
        func: TypedFunc<(i32, i32), i64>,
        request: &Req,
    ) -> Result<Resp, PluginError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let request_bytes =
            serde_json::to_vec(request).map_err(|err| PluginError::GuestError {
                id: self.plugin_ref(),
                message: format!("{name} request encoding failed: {err}"),
            })?;

        let req_ptr = self
            .allocate
            .call_async(&mut self.store, request_bytes.len() as i32)
            .await
            .map_err(|err| PluginError::GuestError {
                id: self.plugin_ref(),
                message: format!("allocate failed: {err}"),
            })?;

        self.memory
            .write(&mut self.store, req_ptr as usize, &request_bytes)
            .map_err(|_| PluginError::MemoryOutOfRange)?;

        let packed = func
            .call_async(&mut self.store, (req_ptr, request_bytes.len() as i32))
            .await
            .map_err(|err| PluginError::GuestError {
                id: self.plugin_ref(),
                message: format!("{name} trapped: {err}"),
            })?;

        let resp_ptr = (packed >> 32) as i32;
        let resp_len = packed as i32;
        if resp_ptr < 0 || resp_len < 0 {
            return Err(PluginError::GuestError {
                id: self.plugin_ref(),
                message: format!("{name} returned error code {resp_len}"),
            });
        }

        let data = self.memory.data(&self.store);
        let start = resp_ptr as usize;
        let end = start + resp_len as usize;
        if end > data.len() {
            return Err(PluginError::MemoryOutOfRange);
        }

        let envelope: CallResult<Resp> =
            serde_json::from_slice(&data[start..end]).map_err(|err| PluginError::GuestError {
                id: self.plugin_ref(),
                message: format!("{name} response decoding failed: {err}"),
            })?;

        envelope
            .into_result()
            .map_err(|err| PluginError::guest_error(self.plugin_ref(), err.to_string()))
    }
}

#[async_trait]
impl GuestCalls for WasmInstance {
    async fn get_info(&mut self) -> Result<PluginInfo, PluginError> {
        let func = self.get_info.clone();
        self.call("get_info", func, &GetInfoRequest {}).await
    }

    async fn initialize(
        &mut self,
        config: &HashMap<String, String>,
    ) -> Result<InitializeResponse, PluginError> {
        let func = self.initialize.clone();
        let request = InitializeRequest {
            config: config.clone(),
        };
        self.call("initialize", func, &request).await
    }

    async fn shutdown(&mut self) -> Result<ShutdownResponse, PluginError> {
        let func = self.shutdown.clone();
        self.call("shutdown", func, &ShutdownRequest {}).await
    }

    async fn get_subscribed_events(&mut self) -> Result<Vec<EventType>, PluginError> {
        let func = self.get_subscribed_events.clone();
        let response: GetSubscribedEventsResponse = self
            .call("get_subscribed_events", func, &GetSubscribedEventsRequest {})
            .await?;

        Ok(response.events)
    }

    async fn handle_event(&mut self, event: &Event) -> Result<EventResult, PluginError> {
        let func = self.handle_event.clone();
        self.call("handle_event", func, event).await
    }
}
