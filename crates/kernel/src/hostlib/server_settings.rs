//! Server settings facade: find and save, gated on `manage_servers`.

use anyhow::Result;
use wasmtime::Linker;

use crate::domain::PluginPermission;
use crate::filters::FindServerSetting;
use crate::plugin::PluginState;
use crate::wire::{
    FindServerSettingsRequest, FindServerSettingsResponse, SaveServerSettingRequest,
    SaveServerSettingResponse,
};

use super::convert::{self, backend};
use super::{register_op, CallScope};

pub(crate) fn register_server_settings(linker: &mut Linker<PluginState>) -> Result<()> {
    register_op(
        linker,
        "server_settings",
        "find_server_settings",
        |scope: CallScope, req: FindServerSettingsRequest| {
            Box::pin(async move {
                scope.require(PluginPermission::ManageServers)?;

                let filter = req
                    .filter
                    .map(|f| FindServerSetting {
                        ids: f.ids,
                        server_ids: f.server_ids,
                        names: f.names,
                    })
                    .unwrap_or_default();
                let sorting = convert::sorting_from_wire(&req.sorting);
                let page = req.pagination.map(convert::pagination_from_wire);

                let settings = scope
                    .services
                    .server_settings
                    .find(&filter, &sorting, page)
                    .await
                    .map_err(backend)?;

                Ok(FindServerSettingsResponse {
                    total: settings.len() as i64,
                    settings: settings
                        .iter()
                        .map(convert::server_setting_to_wire)
                        .collect(),
                })
            })
        },
    )?;

    register_op(
        linker,
        "server_settings",
        "save_server_setting",
        |scope: CallScope, req: SaveServerSettingRequest| {
            Box::pin(async move {
                scope.require(PluginPermission::ManageServers)?;

                let Some(wire_setting) = req.setting else {
                    return Ok(SaveServerSettingResponse {
                        success: false,
                        id: 0,
                        error: Some("setting is required".to_string()),
                    });
                };

                let mut setting = convert::server_setting_from_wire(&wire_setting);

                Ok(match scope.services.server_settings.save(&mut setting).await {
                    Ok(()) => SaveServerSettingResponse {
                        success: true,
                        id: setting.id,
                        error: None,
                    },
                    Err(err) => SaveServerSettingResponse {
                        success: false,
                        id: 0,
                        error: Some(err.to_string()),
                    },
                })
            })
        },
    )?;

    Ok(())
}
