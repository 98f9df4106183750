//! Per-plugin persistent storage capability.
//!
//! Every operation is pinned to the calling plugin's numeric ID, so two
//! plugins using the same key never see each other's entries.

use anyhow::Result;
use wasmtime::Linker;

use crate::domain::PluginStorageEntry;
use crate::filters::{FindPluginStorage, Pagination};
use crate::plugin::PluginState;
use crate::wire::{
    StorageDeleteRequest, StorageDeleteResponse, StorageGetRequest, StorageGetResponse,
    StorageListRequest, StorageListResponse, StorageSetRequest, StorageSetResponse,
    WireStorageEntry,
};

use super::convert::{self, backend};
use super::{register_op, CallScope};

pub(crate) fn register_storage(linker: &mut Linker<PluginState>) -> Result<()> {
    register_op(
        linker,
        "storage",
        "get",
        |scope: CallScope, req: StorageGetRequest| {
            Box::pin(async move {
                let pair = convert::entity_pair_from_wire(req.entity_type, req.entity_id)?;
                let filter = FindPluginStorage {
                    plugin_ids: vec![scope.plugin_id],
                    keys: vec![req.key],
                    entity_pairs: vec![pair],
                    ..Default::default()
                };

                let entries = scope
                    .services
                    .storage
                    .find(&filter, &[], Some(Pagination { limit: 1, offset: 0 }))
                    .await
                    .map_err(backend)?;

                Ok(match entries.into_iter().next() {
                    Some(entry) => StorageGetResponse {
                        payload: entry.payload,
                        found: true,
                    },
                    None => StorageGetResponse::default(),
                })
            })
        },
    )?;

    register_op(
        linker,
        "storage",
        "set",
        |scope: CallScope, req: StorageSetRequest| {
            Box::pin(async move {
                let pair = convert::entity_pair_from_wire(req.entity_type, req.entity_id)?;
                let mut entry = PluginStorageEntry {
                    plugin_id: scope.plugin_id,
                    key: req.key,
                    entity_type: pair.entity_type,
                    entity_id: pair.entity_id,
                    payload: req.payload,
                    ..Default::default()
                };

                Ok(match scope.services.storage.save(&mut entry).await {
                    Ok(()) => StorageSetResponse {
                        success: true,
                        error: None,
                    },
                    Err(err) => StorageSetResponse {
                        success: false,
                        error: Some(err.to_string()),
                    },
                })
            })
        },
    )?;

    register_op(
        linker,
        "storage",
        "delete",
        |scope: CallScope, req: StorageDeleteRequest| {
            Box::pin(async move {
                let pair = convert::entity_pair_from_wire(req.entity_type, req.entity_id)?;
                let filter = FindPluginStorage {
                    plugin_ids: vec![scope.plugin_id],
                    keys: vec![req.key],
                    entity_pairs: vec![pair],
                    ..Default::default()
                };

                let entries = scope
                    .services
                    .storage
                    .find(&filter, &[], Some(Pagination { limit: 1, offset: 0 }))
                    .await
                    .map_err(backend)?;

                // Deleting something that is not there is a success.
                if let Some(entry) = entries.first() {
                    scope
                        .services
                        .storage
                        .delete(entry.id)
                        .await
                        .map_err(backend)?;
                }

                Ok(StorageDeleteResponse { success: true })
            })
        },
    )?;

    register_op(
        linker,
        "storage",
        "list",
        |scope: CallScope, req: StorageListRequest| {
            Box::pin(async move {
                let mut filter = FindPluginStorage {
                    plugin_ids: vec![scope.plugin_id],
                    ..Default::default()
                };
                if req.entity_type.is_some() || req.entity_id.is_some() {
                    filter.entity_pairs =
                        vec![convert::entity_pair_from_wire(req.entity_type, req.entity_id)?];
                }

                let sorting = convert::sorting_from_wire(&req.sorting);
                let page = req.pagination.map(convert::pagination_from_wire);

                let entries = scope
                    .services
                    .storage
                    .find(&filter, &sorting, page)
                    .await
                    .map_err(backend)?;

                let entries: Vec<WireStorageEntry> = entries
                    .into_iter()
                    .filter(|entry| {
                        req.key_prefix
                            .as_deref()
                            .is_none_or(|prefix| entry.key.starts_with(prefix))
                    })
                    .map(|entry| WireStorageEntry {
                        key: entry.key,
                        entity_type: convert::entity_type_to_wire(entry.entity_type),
                        entity_id: entry.entity_id,
                        payload: entry.payload,
                    })
                    .collect();

                Ok(StorageListResponse { entries })
            })
        },
    )?;

    Ok(())
}
