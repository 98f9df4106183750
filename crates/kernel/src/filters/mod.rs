//! Repository query filters, sorting, and pagination.
//!
//! Filter fields compose with AND; list values within a field compose with
//! OR (`IN` semantics). Empty fields match everything.

use crate::domain::{DaemonTaskStatus, DaemonTaskType, EntityPair, PluginStatus};

/// Default page size when the caller asks for none or a non-positive limit.
pub const DEFAULT_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// A single sort criterion; repositories apply them in order.
#[derive(Debug, Clone)]
pub struct Sorting {
    pub field: String,
    pub direction: SortDirection,
}

impl Sorting {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    /// Effective limit: non-positive input falls back to [`DEFAULT_LIMIT`].
    pub fn effective_limit(&self) -> usize {
        if self.limit <= 0 {
            DEFAULT_LIMIT as usize
        } else {
            self.limit as usize
        }
    }

    /// Effective offset, clamped at zero.
    pub fn effective_offset(&self) -> usize {
        self.offset.max(0) as usize
    }
}

#[derive(Debug, Clone, Default)]
pub struct FindPlugin {
    pub ids: Vec<u64>,
    pub names: Vec<String>,
    pub statuses: Vec<PluginStatus>,
    pub categories: Vec<String>,
}

impl FindPlugin {
    pub fn by_ids(ids: impl Into<Vec<u64>>) -> Self {
        Self {
            ids: ids.into(),
            ..Default::default()
        }
    }

    pub fn by_names(names: impl Into<Vec<String>>) -> Self {
        Self {
            names: names.into(),
            ..Default::default()
        }
    }

    pub fn by_statuses(statuses: impl Into<Vec<PluginStatus>>) -> Self {
        Self {
            statuses: statuses.into(),
            ..Default::default()
        }
    }
}

/// Filter over plugin storage entries.
///
/// `entity_pairs` match equally-typed to equally-typed and absent to absent;
/// multiple pairs are OR-ed.
#[derive(Debug, Clone, Default)]
pub struct FindPluginStorage {
    pub ids: Vec<u64>,
    pub plugin_ids: Vec<u64>,
    pub keys: Vec<String>,
    pub entity_pairs: Vec<EntityPair>,
}

#[derive(Debug, Clone, Default)]
pub struct FindServer {
    pub ids: Vec<u64>,
    pub node_ids: Vec<u64>,
    pub game_codes: Vec<String>,
    pub enabled: Option<bool>,
}

impl FindServer {
    pub fn by_ids(ids: impl Into<Vec<u64>>) -> Self {
        Self {
            ids: ids.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FindNode {
    pub ids: Vec<u64>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct FindGame {
    pub codes: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FindGameMod {
    pub ids: Vec<u64>,
    pub game_codes: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FindUser {
    pub ids: Vec<u64>,
    pub logins: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FindDaemonTask {
    pub ids: Vec<u64>,
    pub node_ids: Vec<u64>,
    pub server_ids: Vec<Option<u64>>,
    pub tasks: Vec<DaemonTaskType>,
    pub statuses: Vec<DaemonTaskStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct FindServerSetting {
    pub ids: Vec<u64>,
    pub server_ids: Vec<u64>,
    pub names: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults() {
        let p = Pagination {
            limit: 0,
            offset: -5,
        };
        assert_eq!(p.effective_limit(), DEFAULT_LIMIT as usize);
        assert_eq!(p.effective_offset(), 0);

        let p = Pagination {
            limit: 25,
            offset: 10,
        };
        assert_eq!(p.effective_limit(), 25);
        assert_eq!(p.effective_offset(), 10);
    }
}
