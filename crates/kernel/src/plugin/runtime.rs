//! WASM runtime: engine configuration and per-plugin store state.
//!
//! The engine uses a pooling allocator and async support; host functions
//! suspend on backend I/O. Epoch interruption makes long-running guest code
//! yield back to the executor so invocation deadlines can fire.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use wasmtime::{
    Config, Engine, InstanceAllocationStrategy, Linker, PoolingAllocationConfig,
};

use crate::domain::PluginPermission;
use crate::hostlib::HostServices;

/// How often the engine epoch advances; guests yield at this granularity.
pub(crate) const EPOCH_TICK: Duration = Duration::from_millis(100);

/// Configuration for the WASM engine.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Maximum number of concurrently allocated instances.
    pub max_instances: u32,
    /// Maximum memory pages per instance (64KB per page).
    pub max_memory_pages: u64,
    /// Hard upper bound on any single guest invocation.
    pub guest_call_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_instances: 100,
            max_memory_pages: 1024, // 64MB max per instance
            guest_call_timeout: Duration::from_secs(10),
        }
    }
}

/// Per-plugin state attached to each wasmtime `Store`.
///
/// The numeric ID and cache prefix are bound after `get_info` returns; until
/// then capability calls that need them refuse politely.
pub struct PluginState {
    /// Guest-declared info ID, for log correlation.
    pub plugin_ref: String,
    /// Compact numeric ID; zero until bound.
    pub plugin_id: u64,
    /// Prefix applied to every cache key this plugin touches.
    pub cache_prefix: String,
    /// Effective (declared ∩ granted) permissions.
    pub permissions: HashSet<PluginPermission>,
    /// Shared host services.
    pub services: HostServices,
}

impl PluginState {
    pub fn new(services: HostServices, permissions: HashSet<PluginPermission>) -> Self {
        Self {
            plugin_ref: "unbound".to_string(),
            plugin_id: 0,
            cache_prefix: String::new(),
            permissions,
            services,
        }
    }

    /// Bind the identity derived from the guest's `get_info` answer.
    pub fn bind_identity(&mut self, info_id: &str, numeric_id: u64) {
        self.plugin_ref = info_id.to_string();
        self.plugin_id = numeric_id;
        self.cache_prefix = format!("plugin:{info_id}:");
    }

    pub fn has_permission(&self, permission: PluginPermission) -> bool {
        self.permissions.contains(&permission)
    }
}

/// Creates the engine with pooling allocation, async support, and epoch
/// interruption.
pub fn create_engine(config: &RuntimeConfig) -> Result<Engine> {
    let mut wasmtime_config = Config::new();

    wasmtime_config.async_support(true);
    wasmtime_config.epoch_interruption(true);

    let mut pooling = PoolingAllocationConfig::default();
    pooling.total_core_instances(config.max_instances);
    pooling.total_memories(config.max_instances);
    pooling.total_tables(config.max_instances);
    pooling.total_stacks(config.max_instances);
    pooling.max_memory_size(config.max_memory_pages as usize * 65536);

    wasmtime_config.allocation_strategy(InstanceAllocationStrategy::Pooling(pooling));
    wasmtime_config.cranelift_opt_level(wasmtime::OptLevel::Speed);

    Engine::new(&wasmtime_config).context("failed to create wasmtime engine")
}

/// Creates a linker with the WASI stubs and every host capability bound.
pub fn create_linker(engine: &Engine) -> Result<Linker<PluginState>> {
    let mut linker = Linker::new(engine);

    add_wasi_stubs(&mut linker)?;
    crate::hostlib::register_all(&mut linker)?;

    Ok(linker)
}

/// Minimal `wasi_snapshot_preview1` stubs so modules built for wasm32-wasip1
/// instantiate without full WASI support.
fn add_wasi_stubs(linker: &mut Linker<PluginState>) -> Result<()> {
    // fd_write(fd, iovs, iovs_len, nwritten) -> errno
    linker.func_wrap(
        "wasi_snapshot_preview1",
        "fd_write",
        |_fd: i32, _iovs: i32, _iovs_len: i32, _nwritten: i32| -> i32 {
            52 // ENOSYS
        },
    )?;

    // random_get(buf, buf_len) -> errno
    linker.func_wrap(
        "wasi_snapshot_preview1",
        "random_get",
        |mut caller: wasmtime::Caller<'_, PluginState>, buf: i32, buf_len: i32| -> i32 {
            let Some(wasmtime::Extern::Memory(memory)) = caller.get_export("memory") else {
                return 8; // EBADF
            };
            let data = memory.data_mut(&mut caller);
            let buf = buf as usize;
            let len = buf_len as usize;
            if buf + len > data.len() {
                return 21; // EFAULT
            }
            for i in 0..len {
                data[buf + i] = ((buf + i) as u8).wrapping_mul(31);
            }
            0
        },
    )?;

    // environ_get(environ, environ_buf) -> errno
    linker.func_wrap(
        "wasi_snapshot_preview1",
        "environ_get",
        |_environ: i32, _environ_buf: i32| -> i32 { 0 },
    )?;

    // environ_sizes_get(environ_count, environ_buf_size) -> errno
    linker.func_wrap(
        "wasi_snapshot_preview1",
        "environ_sizes_get",
        |mut caller: wasmtime::Caller<'_, PluginState>, count_ptr: i32, size_ptr: i32| -> i32 {
            let Some(wasmtime::Extern::Memory(memory)) = caller.get_export("memory") else {
                return 8; // EBADF
            };
            let data = memory.data_mut(&mut caller);
            let count_ptr = count_ptr as usize;
            let size_ptr = size_ptr as usize;
            if count_ptr + 4 > data.len() || size_ptr + 4 > data.len() {
                return 21; // EFAULT
            }
            data[count_ptr..count_ptr + 4].copy_from_slice(&0u32.to_le_bytes());
            data[size_ptr..size_ptr + 4].copy_from_slice(&0u32.to_le_bytes());
            0
        },
    )?;

    // proc_exit(code): a plugin cannot take the host down.
    linker.func_wrap("wasi_snapshot_preview1", "proc_exit", |_code: i32| {})?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn create_engine_with_default_config() {
        let engine = create_engine(&RuntimeConfig::default());
        assert!(engine.is_ok());
    }

    #[test]
    fn create_linker_registers_all_modules() {
        let engine = create_engine(&RuntimeConfig::default()).unwrap();
        let linker = create_linker(&engine);
        assert!(linker.is_ok());
    }

    #[test]
    fn bind_identity_sets_cache_prefix() {
        let mut state = PluginState::new(HostServices::in_memory(), HashSet::new());
        state.bind_identity("server-logger", 42);

        assert_eq!(state.plugin_id, 42);
        assert_eq!(state.cache_prefix, "plugin:server-logger:");
    }
}
