//! Daemon tasks facade: find and create, gated on `manage_servers`.

use anyhow::Result;
use wasmtime::Linker;

use crate::domain::{DaemonTask, DaemonTaskStatus, DaemonTaskType, PluginPermission};
use crate::filters::FindDaemonTask;
use crate::plugin::PluginState;
use crate::wire::{
    CreateDaemonTaskRequest, CreateDaemonTaskResponse, FindDaemonTasksRequest,
    FindDaemonTasksResponse,
};

use super::convert::{self, backend};
use super::{register_op, CallScope};

pub(crate) fn register_daemon_tasks(linker: &mut Linker<PluginState>) -> Result<()> {
    register_op(
        linker,
        "daemon_tasks",
        "find_daemon_tasks",
        |scope: CallScope, req: FindDaemonTasksRequest| {
            Box::pin(async move {
                scope.require(PluginPermission::ManageServers)?;

                let filter = req
                    .filter
                    .map(|f| FindDaemonTask {
                        ids: f.ids,
                        node_ids: f.node_ids,
                        server_ids: f.server_ids.into_iter().map(Some).collect(),
                        ..Default::default()
                    })
                    .unwrap_or_default();
                let sorting = convert::sorting_from_wire(&req.sorting);
                let page = req.pagination.map(convert::pagination_from_wire);

                let tasks = scope
                    .services
                    .daemon_tasks
                    .find(&filter, &sorting, page)
                    .await
                    .map_err(backend)?;

                Ok(FindDaemonTasksResponse {
                    total: tasks.len() as i64,
                    tasks: tasks.iter().map(convert::daemon_task_to_wire).collect(),
                })
            })
        },
    )?;

    register_op(
        linker,
        "daemon_tasks",
        "create_daemon_task",
        |scope: CallScope, req: CreateDaemonTaskRequest| {
            Box::pin(async move {
                scope.require(PluginPermission::ManageServers)?;

                let Some(task_type) = DaemonTaskType::parse(&req.task_type) else {
                    return Ok(CreateDaemonTaskResponse {
                        success: false,
                        task_id: 0,
                        error: Some(format!("unknown task type: {}", req.task_type)),
                    });
                };

                // New tasks always start out waiting.
                let mut task = DaemonTask {
                    id: 0,
                    node_id: req.node_id,
                    server_id: req.server_id,
                    run_after_id: req.run_after_id,
                    task: task_type,
                    cmd: req.cmd,
                    output: None,
                    status: DaemonTaskStatus::Waiting,
                    created_at: None,
                    updated_at: None,
                };

                Ok(match scope.services.daemon_tasks.save(&mut task).await {
                    Ok(()) => CreateDaemonTaskResponse {
                        success: true,
                        task_id: task.id,
                        error: None,
                    },
                    Err(err) => CreateDaemonTaskResponse {
                        success: false,
                        task_id: 0,
                        error: Some(err.to_string()),
                    },
                })
            })
        },
    )?;

    Ok(())
}
