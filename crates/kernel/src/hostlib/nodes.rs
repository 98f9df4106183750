//! Nodes facade: read-only, gated on `manage_nodes`.

use anyhow::Result;
use wasmtime::Linker;

use crate::domain::PluginPermission;
use crate::filters::FindNode;
use crate::plugin::PluginState;
use crate::wire::{
    FindNodesRequest, FindNodesResponse, GetNodeRequest, GetNodeResponse, NodeFilter,
};

use super::convert::{self, backend};
use super::{register_op, CallScope};

fn filter_from_wire(filter: Option<NodeFilter>) -> FindNode {
    let Some(filter) = filter else {
        return FindNode::default();
    };

    FindNode {
        ids: filter.ids,
        enabled: filter.enabled,
    }
}

pub(crate) fn register_nodes(linker: &mut Linker<PluginState>) -> Result<()> {
    register_op(
        linker,
        "nodes",
        "find_nodes",
        |scope: CallScope, req: FindNodesRequest| {
            Box::pin(async move {
                scope.require(PluginPermission::ManageNodes)?;

                let filter = filter_from_wire(req.filter);
                let sorting = convert::sorting_from_wire(&req.sorting);
                let page = req.pagination.map(convert::pagination_from_wire);

                let nodes = scope
                    .services
                    .nodes
                    .find(&filter, &sorting, page)
                    .await
                    .map_err(backend)?;

                Ok(FindNodesResponse {
                    total: nodes.len() as i64,
                    nodes: nodes.iter().map(convert::node_to_wire).collect(),
                })
            })
        },
    )?;

    register_op(
        linker,
        "nodes",
        "get_node",
        |scope: CallScope, req: GetNodeRequest| {
            Box::pin(async move {
                scope.require(PluginPermission::ManageNodes)?;

                let filter = FindNode {
                    ids: vec![req.id],
                    ..Default::default()
                };
                let nodes = scope
                    .services
                    .nodes
                    .find(&filter, &[], None)
                    .await
                    .map_err(backend)?;

                Ok(match nodes.first() {
                    Some(node) => GetNodeResponse {
                        node: Some(convert::node_to_wire(node)),
                        found: true,
                    },
                    None => GetNodeResponse::default(),
                })
            })
        },
    )?;

    Ok(())
}
