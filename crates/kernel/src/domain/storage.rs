//! Per-plugin persistent storage entries.

use chrono::{DateTime, Utc};

/// Entity kinds a storage entry or facade call may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    User,
    Node,
    ClientCertificate,
    Game,
    GameMod,
    Server,
    Role,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::User => "user",
            EntityType::Node => "node",
            EntityType::ClientCertificate => "client_certificate",
            EntityType::Game => "game",
            EntityType::GameMod => "game_mod",
            EntityType::Server => "server",
            EntityType::Role => "role",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(EntityType::User),
            "node" => Some(EntityType::Node),
            "client_certificate" => Some(EntityType::ClientCertificate),
            "game" => Some(EntityType::Game),
            "game_mod" => Some(EntityType::GameMod),
            "server" => Some(EntityType::Server),
            "role" => Some(EntityType::Role),
            _ => None,
        }
    }
}

/// Optional `(entity_type, entity_id)` scope of a storage entry.
///
/// Both fields are present or both are absent; a mixed state never enters
/// the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EntityPair {
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<u64>,
}

impl EntityPair {
    pub fn new(entity_type: EntityType, entity_id: u64) -> Self {
        Self {
            entity_type: Some(entity_type),
            entity_id: Some(entity_id),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.entity_type.is_some() == self.entity_id.is_some()
    }
}

/// A persisted plugin payload, unique per
/// `(plugin_id, key, entity_type, entity_id)`.
#[derive(Debug, Clone, Default)]
pub struct PluginStorageEntry {
    pub id: u64,
    pub plugin_id: u64,
    pub key: String,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<u64>,
    pub payload: Vec<u8>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PluginStorageEntry {
    pub fn entity_pair(&self) -> EntityPair {
        EntityPair {
            entity_type: self.entity_type,
            entity_id: self.entity_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_pair_validity() {
        assert!(EntityPair::none().is_valid());
        assert!(EntityPair::new(EntityType::Server, 1).is_valid());
        assert!(!EntityPair {
            entity_type: Some(EntityType::Server),
            entity_id: None,
        }
        .is_valid());
    }

    #[test]
    fn entity_type_round_trips() {
        for et in [
            EntityType::User,
            EntityType::Node,
            EntityType::ClientCertificate,
            EntityType::Game,
            EntityType::GameMod,
            EntityType::Server,
            EntityType::Role,
        ] {
            assert_eq!(EntityType::parse(et.as_str()), Some(et));
        }
        assert_eq!(EntityType::parse(""), None);
    }
}
