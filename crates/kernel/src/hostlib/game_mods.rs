//! Game mods facade: read-only, gated on `manage_game_mods`.

use anyhow::Result;
use wasmtime::Linker;

use crate::domain::PluginPermission;
use crate::filters::FindGameMod;
use crate::plugin::PluginState;
use crate::wire::{
    FindGameModsRequest, FindGameModsResponse, GetGameModRequest, GetGameModResponse,
};

use super::convert::{self, backend};
use super::{register_op, CallScope};

pub(crate) fn register_game_mods(linker: &mut Linker<PluginState>) -> Result<()> {
    register_op(
        linker,
        "game_mods",
        "find_game_mods",
        |scope: CallScope, req: FindGameModsRequest| {
            Box::pin(async move {
                scope.require(PluginPermission::ManageGameMods)?;

                let filter = req
                    .filter
                    .map(|f| FindGameMod {
                        ids: f.ids,
                        game_codes: f.game_codes,
                    })
                    .unwrap_or_default();
                let sorting = convert::sorting_from_wire(&req.sorting);
                let page = req.pagination.map(convert::pagination_from_wire);

                let mods = scope
                    .services
                    .game_mods
                    .find(&filter, &sorting, page)
                    .await
                    .map_err(backend)?;

                Ok(FindGameModsResponse {
                    total: mods.len() as i64,
                    game_mods: mods.iter().map(convert::game_mod_to_wire).collect(),
                })
            })
        },
    )?;

    register_op(
        linker,
        "game_mods",
        "get_game_mod",
        |scope: CallScope, req: GetGameModRequest| {
            Box::pin(async move {
                scope.require(PluginPermission::ManageGameMods)?;

                let filter = FindGameMod {
                    ids: vec![req.id],
                    ..Default::default()
                };
                let mods = scope
                    .services
                    .game_mods
                    .find(&filter, &[], None)
                    .await
                    .map_err(backend)?;

                Ok(match mods.first() {
                    Some(game_mod) => GetGameModResponse {
                        game_mod: Some(convert::game_mod_to_wire(game_mod)),
                        found: true,
                    },
                    None => GetGameModResponse::default(),
                })
            })
        },
    )?;

    Ok(())
}
