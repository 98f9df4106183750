//! Structured logging capability. Never fails.

use anyhow::Result;
use tracing::{debug, error, info, warn};
use wasmtime::Linker;

use crate::plugin::PluginState;
use crate::wire::{LogRequest, LogResponse};

use super::register_op;

pub(crate) fn register_log(linker: &mut Linker<PluginState>) -> Result<()> {
    register_op(
        linker,
        "log",
        "log",
        |scope: super::CallScope, req: LogRequest| {
            Box::pin(async move {
                let fields = if req.fields.is_empty() {
                    String::new()
                } else {
                    let mut pairs: Vec<String> = req
                        .fields
                        .iter()
                        .map(|(k, v)| format!("{k}={v}"))
                        .collect();
                    pairs.sort();
                    pairs.join(" ")
                };

                // Unknown levels default to info.
                match req.level.as_str() {
                    "debug" => debug!(plugin = %scope.plugin_ref, fields = %fields, "{}", req.message),
                    "warn" => warn!(plugin = %scope.plugin_ref, fields = %fields, "{}", req.message),
                    "error" => error!(plugin = %scope.plugin_ref, fields = %fields, "{}", req.message),
                    _ => info!(plugin = %scope.plugin_ref, fields = %fields, "{}", req.message),
                }

                Ok(LogResponse {})
            })
        },
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::plugin::{create_engine, RuntimeConfig};

    #[test]
    fn register_log_succeeds() {
        let engine = create_engine(&RuntimeConfig::default()).unwrap();
        let mut linker: Linker<PluginState> = Linker::new(&engine);

        assert!(register_log(&mut linker).is_ok());
    }
}
