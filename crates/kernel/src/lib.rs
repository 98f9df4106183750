//! Gamedock plugin kernel.
//!
//! The sandboxed WASM plugin runtime embedded in the Gamedock panel:
//! plugin lifecycle management, event dispatch with cancellation, host
//! capability libraries (log, cache, http, storage, domain facades), and
//! per-plugin persistent storage.

pub mod cache;
pub mod config;
pub mod domain;
pub mod files;
pub mod filters;
pub mod hostlib;
pub mod plugin;
pub mod repositories;
pub mod wire;
