//! Plugin runtime: manager, dispatcher, loader, ID codec.
//!
//! This module owns the sandbox. Plugins are WASM modules loaded by the
//! [`Manager`]; events reach them through the [`Dispatcher`]; the [`Loader`]
//! reconciles the registry with the module directory at startup.

mod dispatcher;
mod error;
mod id;
mod instance;
mod loader;
mod manager;
mod runtime;

pub use dispatcher::{Dispatcher, EventDispatchResult};
pub use error::PluginError;
pub use id::{compact_plugin_id, parse_plugin_id};
pub use instance::{GuestCalls, WasmInstance, REQUIRED_EXPORTS};
pub use loader::Loader;
pub use manager::{
    LoadOptions, LoadedPlugin, ManagesPlugins, Manager, PLUGIN_API_VERSION,
};
pub use runtime::{create_engine, create_linker, PluginState, RuntimeConfig};
