//! Servers facade: find/get/save/delete, gated on `manage_servers`.

use anyhow::Result;
use wasmtime::Linker;

use crate::domain::PluginPermission;
use crate::filters::FindServer;
use crate::plugin::PluginState;
use crate::wire::{
    DeleteServerRequest, DeleteServerResponse, FindServersRequest, FindServersResponse,
    GetServerRequest, GetServerResponse, SaveServerRequest, SaveServerResponse, ServerFilter,
};

use super::convert::{self, backend};
use super::{register_op, CallScope};

fn filter_from_wire(filter: Option<ServerFilter>) -> FindServer {
    let Some(filter) = filter else {
        return FindServer::default();
    };

    FindServer {
        ids: filter.ids,
        node_ids: filter.node_ids,
        game_codes: filter.game_codes,
        enabled: filter.enabled,
    }
}

pub(crate) fn register_servers(linker: &mut Linker<PluginState>) -> Result<()> {
    register_op(
        linker,
        "servers",
        "find_servers",
        |scope: CallScope, req: FindServersRequest| {
            Box::pin(async move {
                scope.require(PluginPermission::ManageServers)?;

                let filter = filter_from_wire(req.filter);
                let sorting = convert::sorting_from_wire(&req.sorting);
                let page = req.pagination.map(convert::pagination_from_wire);

                let servers = scope
                    .services
                    .servers
                    .find(&filter, &sorting, page)
                    .await
                    .map_err(backend)?;

                Ok(FindServersResponse {
                    total: servers.len() as i64,
                    servers: servers.iter().map(convert::server_to_wire).collect(),
                })
            })
        },
    )?;

    register_op(
        linker,
        "servers",
        "get_server",
        |scope: CallScope, req: GetServerRequest| {
            Box::pin(async move {
                scope.require(PluginPermission::ManageServers)?;

                let servers = scope
                    .services
                    .servers
                    .find(&FindServer::by_ids(vec![req.id]), &[], None)
                    .await
                    .map_err(backend)?;

                Ok(match servers.first() {
                    Some(server) => GetServerResponse {
                        server: Some(convert::server_to_wire(server)),
                        found: true,
                    },
                    None => GetServerResponse::default(),
                })
            })
        },
    )?;

    register_op(
        linker,
        "servers",
        "save_server",
        |scope: CallScope, req: SaveServerRequest| {
            Box::pin(async move {
                scope.require(PluginPermission::ManageServers)?;

                let Some(wire_server) = req.server else {
                    return Ok(SaveServerResponse {
                        success: false,
                        id: 0,
                        error: Some("server is required".to_string()),
                    });
                };

                let mut server = match convert::server_from_wire(&wire_server) {
                    Ok(server) => server,
                    Err(err) => {
                        return Ok(SaveServerResponse {
                            success: false,
                            id: 0,
                            error: Some(err.message),
                        });
                    }
                };

                Ok(match scope.services.servers.save(&mut server).await {
                    Ok(()) => SaveServerResponse {
                        success: true,
                        id: server.id,
                        error: None,
                    },
                    Err(err) => SaveServerResponse {
                        success: false,
                        id: 0,
                        error: Some(err.to_string()),
                    },
                })
            })
        },
    )?;

    register_op(
        linker,
        "servers",
        "delete_server",
        |scope: CallScope, req: DeleteServerRequest| {
            Box::pin(async move {
                scope.require(PluginPermission::ManageServers)?;

                Ok(match scope.services.servers.delete(req.id).await {
                    Ok(()) => DeleteServerResponse {
                        success: true,
                        error: None,
                    },
                    Err(err) => DeleteServerResponse {
                        success: false,
                        error: Some(err.to_string()),
                    },
                })
            })
        },
    )?;

    Ok(())
}
