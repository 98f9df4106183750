//! Plugin runtime error types.

use thiserror::Error;

/// Errors from loading, invoking, or unloading WASM plugins.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin manager is closed")]
    ManagerClosed,

    /// Another loaded plugin already answers to this info ID or its numeric
    /// derivation (FNV collisions land here too).
    #[error("plugin '{id}' is already loaded")]
    DuplicateId { id: String },

    #[error("plugin '{id}' not found")]
    NotFound { id: String },

    #[error("plugin '{id}': API version '{actual}' is incompatible with host '{expected}'")]
    ApiVersionMismatch {
        id: String,
        expected: String,
        actual: String,
    },

    #[error("plugin '{id}': initialization failed: {details}")]
    InitFailed { id: String, details: String },

    #[error("module is missing required exports: {missing}")]
    ExportNotFound { missing: String },

    #[error("module imports undeclared host module '{module}'")]
    UndeclaredImport { module: String },

    #[error("WASM compilation failed: {details}")]
    CompilationFailed { details: String },

    #[error("plugin file not found: {path}")]
    FileNotFound { path: String },

    #[error("guest memory operation out of range")]
    MemoryOutOfRange,

    #[error("plugin '{id}': guest call '{call}' exceeded its deadline")]
    GuestWedged { id: String, call: String },

    #[error("plugin '{id}': guest returned error: {message}")]
    GuestError { id: String, message: String },
}

impl PluginError {
    pub fn guest_error(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GuestError {
            id: id.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_plugin() {
        let err = PluginError::ApiVersionMismatch {
            id: "server-logger".into(),
            expected: "1".into(),
            actual: "2.0".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("server-logger"));
        assert!(msg.contains("2.0"));
    }
}
