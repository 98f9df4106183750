//! Structural mappers between domain entities and wire DTOs.
//!
//! Closed sets are validated in both directions; unknown wire values map to
//! the neutral sentinel on the way in and never silently truncate on the
//! way out. Out-of-range numeric conversions surface as validation errors.

use uuid::Uuid;

use crate::domain::{
    DaemonTask, EntityPair, EntityType, Game, GameMod, Node, Server, ServerInstalledStatus,
    ServerSetting, User,
};
use crate::filters::{Pagination, SortDirection, Sorting};
use crate::wire::{
    ErrorKind, WireDaemonTask, WireEntityType, WireError, WireGame, WireGameMod, WireNode,
    WirePagination, WireServer, WireServerSetting, WireSorting, WireUser,
};

pub(crate) fn validation(message: impl Into<String>) -> WireError {
    WireError {
        kind: ErrorKind::Validation,
        message: message.into(),
    }
}

pub(crate) fn backend(err: impl std::fmt::Display) -> WireError {
    WireError {
        kind: ErrorKind::Backend,
        message: err.to_string(),
    }
}

pub fn entity_type_from_wire(wire: Option<WireEntityType>) -> Option<EntityType> {
    match wire? {
        WireEntityType::Unspecified => None,
        WireEntityType::User => Some(EntityType::User),
        WireEntityType::Node => Some(EntityType::Node),
        WireEntityType::ClientCertificate => Some(EntityType::ClientCertificate),
        WireEntityType::Game => Some(EntityType::Game),
        WireEntityType::GameMod => Some(EntityType::GameMod),
        WireEntityType::Server => Some(EntityType::Server),
        WireEntityType::Role => Some(EntityType::Role),
    }
}

pub fn entity_type_to_wire(entity_type: Option<EntityType>) -> Option<WireEntityType> {
    entity_type.map(|et| match et {
        EntityType::User => WireEntityType::User,
        EntityType::Node => WireEntityType::Node,
        EntityType::ClientCertificate => WireEntityType::ClientCertificate,
        EntityType::Game => WireEntityType::Game,
        EntityType::GameMod => WireEntityType::GameMod,
        EntityType::Server => WireEntityType::Server,
        EntityType::Role => WireEntityType::Role,
    })
}

/// Build an entity pair from its wire halves; a mixed pair is invalid.
pub fn entity_pair_from_wire(
    entity_type: Option<WireEntityType>,
    entity_id: Option<u64>,
) -> Result<EntityPair, WireError> {
    let pair = EntityPair {
        entity_type: entity_type_from_wire(entity_type),
        entity_id,
    };

    if !pair.is_valid() {
        return Err(validation(
            "entity_type and entity_id must both be present or both absent",
        ));
    }

    Ok(pair)
}

pub fn sorting_from_wire(sorting: &[WireSorting]) -> Vec<Sorting> {
    sorting
        .iter()
        .map(|s| Sorting {
            field: s.field.clone(),
            direction: if s.descending {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            },
        })
        .collect()
}

pub fn pagination_from_wire(pagination: WirePagination) -> Pagination {
    Pagination {
        limit: pagination.limit,
        offset: pagination.offset,
    }
}

fn port_to_wire(port: u16) -> i32 {
    i32::from(port)
}

fn port_from_wire(port: i32, field: &str) -> Result<u16, WireError> {
    u16::try_from(port).map_err(|_| validation(format!("{field} out of range: {port}")))
}

pub fn server_to_wire(server: &Server) -> WireServer {
    WireServer {
        id: server.id,
        uuid: server.uuid.to_string(),
        uuid_short: server.uuid_short.clone(),
        enabled: server.enabled,
        installed: server.installed.code(),
        blocked: server.blocked,
        name: server.name.clone(),
        game_id: server.game_id.clone(),
        node_id: server.node_id,
        game_mod_id: server.game_mod_id,
        server_ip: server.server_ip.clone(),
        server_port: port_to_wire(server.server_port),
        query_port: server.query_port.map(port_to_wire),
        rcon_port: server.rcon_port.map(port_to_wire),
        dir: server.dir.clone(),
        su_user: server.su_user.clone(),
        start_command: server.start_command.clone(),
        process_active: server.process_active,
    }
}

pub fn server_from_wire(wire: &WireServer) -> Result<Server, WireError> {
    let uuid = if wire.uuid.is_empty() {
        Uuid::nil()
    } else {
        Uuid::parse_str(&wire.uuid).map_err(|_| validation(format!("bad uuid: {}", wire.uuid)))?
    };

    let installed = ServerInstalledStatus::from_code(wire.installed)
        .ok_or_else(|| validation(format!("unknown installed status: {}", wire.installed)))?;

    Ok(Server {
        id: wire.id,
        uuid,
        uuid_short: wire.uuid_short.clone(),
        enabled: wire.enabled,
        installed,
        blocked: wire.blocked,
        name: wire.name.clone(),
        game_id: wire.game_id.clone(),
        node_id: wire.node_id,
        game_mod_id: wire.game_mod_id,
        server_ip: wire.server_ip.clone(),
        server_port: port_from_wire(wire.server_port, "server_port")?,
        query_port: wire
            .query_port
            .map(|p| port_from_wire(p, "query_port"))
            .transpose()?,
        rcon_port: wire
            .rcon_port
            .map(|p| port_from_wire(p, "rcon_port"))
            .transpose()?,
        dir: wire.dir.clone(),
        su_user: wire.su_user.clone(),
        start_command: wire.start_command.clone(),
        process_active: wire.process_active,
    })
}

pub fn node_to_wire(node: &Node) -> WireNode {
    WireNode {
        id: node.id,
        enabled: node.enabled,
        name: node.name.clone(),
        os: node.os.clone(),
        location: node.location.clone(),
        provider: node.provider.clone(),
        ip: node.ip.clone(),
        work_path: node.work_path.clone(),
    }
}

pub fn game_to_wire(game: &Game) -> WireGame {
    WireGame {
        code: game.code.clone(),
        name: game.name.clone(),
        engine: game.engine.clone(),
        engine_version: game.engine_version.clone(),
        steam_app_id: game.steam_app_id,
        remote_repository: game.remote_repository.clone(),
        local_repository: game.local_repository.clone(),
    }
}

pub fn game_mod_to_wire(game_mod: &GameMod) -> WireGameMod {
    WireGameMod {
        id: game_mod.id,
        game_code: game_mod.game_code.clone(),
        name: game_mod.name.clone(),
        default_start_cmd_linux: game_mod.default_start_cmd_linux.clone(),
        default_start_cmd_windows: game_mod.default_start_cmd_windows.clone(),
        remote_repository: game_mod.remote_repository.clone(),
        local_repository: game_mod.local_repository.clone(),
    }
}

pub fn user_to_wire(user: &User) -> WireUser {
    WireUser {
        id: user.id,
        login: user.login.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        roles: user.roles.clone(),
    }
}

pub fn daemon_task_to_wire(task: &DaemonTask) -> WireDaemonTask {
    WireDaemonTask {
        id: task.id,
        node_id: task.node_id,
        server_id: task.server_id,
        run_after_id: task.run_after_id,
        task_type: task.task.as_str().to_string(),
        cmd: task.cmd.clone(),
        output: task.output.clone(),
        status: task.status.as_str().to_string(),
    }
}

pub fn server_setting_to_wire(setting: &ServerSetting) -> WireServerSetting {
    WireServerSetting {
        id: setting.id,
        server_id: setting.server_id,
        name: setting.name.clone(),
        value: setting.value.clone(),
    }
}

pub fn server_setting_from_wire(wire: &WireServerSetting) -> ServerSetting {
    ServerSetting {
        id: wire.id,
        server_id: wire.server_id,
        name: wire.name.clone(),
        value: wire.value.clone(),
    }
}
