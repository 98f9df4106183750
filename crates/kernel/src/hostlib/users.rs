//! Users facade: read-only, gated on `manage_users`.

use anyhow::Result;
use wasmtime::Linker;

use crate::domain::PluginPermission;
use crate::filters::FindUser;
use crate::plugin::PluginState;
use crate::wire::{FindUsersRequest, FindUsersResponse, GetUserRequest, GetUserResponse};

use super::convert::{self, backend};
use super::{register_op, CallScope};

pub(crate) fn register_users(linker: &mut Linker<PluginState>) -> Result<()> {
    register_op(
        linker,
        "users",
        "find_users",
        |scope: CallScope, req: FindUsersRequest| {
            Box::pin(async move {
                scope.require(PluginPermission::ManageUsers)?;

                let filter = req
                    .filter
                    .map(|f| FindUser {
                        ids: f.ids,
                        logins: f.logins,
                    })
                    .unwrap_or_default();
                let sorting = convert::sorting_from_wire(&req.sorting);
                let page = req.pagination.map(convert::pagination_from_wire);

                let users = scope
                    .services
                    .users
                    .find(&filter, &sorting, page)
                    .await
                    .map_err(backend)?;

                Ok(FindUsersResponse {
                    total: users.len() as i64,
                    users: users.iter().map(convert::user_to_wire).collect(),
                })
            })
        },
    )?;

    register_op(
        linker,
        "users",
        "get_user",
        |scope: CallScope, req: GetUserRequest| {
            Box::pin(async move {
                scope.require(PluginPermission::ManageUsers)?;

                let filter = FindUser {
                    ids: vec![req.id],
                    ..Default::default()
                };
                let users = scope
                    .services
                    .users
                    .find(&filter, &[], None)
                    .await
                    .map_err(backend)?;

                Ok(match users.first() {
                    Some(user) => GetUserResponse {
                        user: Some(convert::user_to_wire(user)),
                        found: true,
                    },
                    None => GetUserResponse::default(),
                })
            })
        },
    )?;

    Ok(())
}
