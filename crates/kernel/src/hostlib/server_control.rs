//! Server control facade: lifecycle actions on game servers.
//!
//! The actual control plane lives outside this crate; the facade resolves
//! the server row, delegates to [`ServerControl`], and hands the resulting
//! daemon task ID back to the guest.

use anyhow::Result;
use async_trait::async_trait;
use wasmtime::Linker;

use crate::domain::{PluginPermission, Server};
use crate::filters::FindServer;
use crate::plugin::PluginState;
use crate::wire::{ServerControlRequest, ServerControlResponse};

use super::convert::backend;
use super::{register_op, CallScope};

/// Lifecycle action to run against a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Start,
    Stop,
    Restart,
    Install,
    Update,
    Reinstall,
}

/// The panel's server-control service, as consumed by the plugin runtime.
///
/// Each action queues a daemon task and returns its ID.
#[async_trait]
pub trait ServerControl: Send + Sync {
    async fn execute(&self, action: ControlAction, server: &Server) -> Result<u64>;
}

/// Placeholder used when no control plane is wired (tests, standalone use).
pub struct NullServerControl;

#[async_trait]
impl ServerControl for NullServerControl {
    async fn execute(&self, _action: ControlAction, _server: &Server) -> Result<u64> {
        anyhow::bail!("server control is not available")
    }
}

pub(crate) fn register_server_control(linker: &mut Linker<PluginState>) -> Result<()> {
    register_action(linker, "start_server", ControlAction::Start)?;
    register_action(linker, "stop_server", ControlAction::Stop)?;
    register_action(linker, "restart_server", ControlAction::Restart)?;
    register_action(linker, "install_server", ControlAction::Install)?;
    register_action(linker, "update_server", ControlAction::Update)?;
    register_action(linker, "reinstall_server", ControlAction::Reinstall)?;

    Ok(())
}

fn register_action(
    linker: &mut Linker<PluginState>,
    name: &'static str,
    action: ControlAction,
) -> Result<()> {
    register_op(
        linker,
        "server_control",
        name,
        move |scope: CallScope, req: ServerControlRequest| {
            Box::pin(async move {
                scope.require(PluginPermission::ManageServers)?;

                let servers = scope
                    .services
                    .servers
                    .find(&FindServer::by_ids(vec![req.server_id]), &[], None)
                    .await
                    .map_err(backend)?;

                let Some(server) = servers.first() else {
                    return Ok(ServerControlResponse {
                        success: false,
                        task_id: None,
                        error: Some("server not found".to_string()),
                    });
                };

                Ok(
                    match scope.services.server_control.execute(action, server).await {
                        Ok(task_id) => ServerControlResponse {
                            success: true,
                            task_id: Some(task_id),
                            error: None,
                        },
                        Err(err) => ServerControlResponse {
                            success: false,
                            task_id: None,
                            error: Some(err.to_string()),
                        },
                    },
                )
            })
        },
    )
}
