//! Games facade: read-only catalog lookups, gated on `manage_games`.

use anyhow::Result;
use wasmtime::Linker;

use crate::domain::PluginPermission;
use crate::filters::FindGame;
use crate::plugin::PluginState;
use crate::wire::{FindGamesRequest, FindGamesResponse, GetGameRequest, GetGameResponse};

use super::convert::{self, backend};
use super::{register_op, CallScope};

pub(crate) fn register_games(linker: &mut Linker<PluginState>) -> Result<()> {
    register_op(
        linker,
        "games",
        "find_games",
        |scope: CallScope, req: FindGamesRequest| {
            Box::pin(async move {
                scope.require(PluginPermission::ManageGames)?;

                let filter = FindGame {
                    codes: req.filter.map(|f| f.codes).unwrap_or_default(),
                };
                let sorting = convert::sorting_from_wire(&req.sorting);
                let page = req.pagination.map(convert::pagination_from_wire);

                let games = scope
                    .services
                    .games
                    .find(&filter, &sorting, page)
                    .await
                    .map_err(backend)?;

                Ok(FindGamesResponse {
                    total: games.len() as i64,
                    games: games.iter().map(convert::game_to_wire).collect(),
                })
            })
        },
    )?;

    register_op(
        linker,
        "games",
        "get_game",
        |scope: CallScope, req: GetGameRequest| {
            Box::pin(async move {
                scope.require(PluginPermission::ManageGames)?;

                let filter = FindGame {
                    codes: vec![req.code],
                };
                let games = scope
                    .services
                    .games
                    .find(&filter, &[], None)
                    .await
                    .map_err(backend)?;

                Ok(match games.first() {
                    Some(game) => GetGameResponse {
                        game: Some(convert::game_to_wire(game)),
                        found: true,
                    },
                    None => GetGameResponse::default(),
                })
            })
        },
    )?;

    Ok(())
}
