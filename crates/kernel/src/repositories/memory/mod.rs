//! In-memory repository implementations.
//!
//! Used by tests and by panel installations that run without a database.
//! These never fail except on violated preconditions.

mod catalog;
mod plugin_storage;
mod plugins;

pub use catalog::{
    MemoryDaemonTaskRepository, MemoryGameModRepository, MemoryGameRepository,
    MemoryNodeRepository, MemoryServerRepository, MemoryServerSettingRepository,
    MemoryUserRepository,
};
pub use plugin_storage::MemoryPluginStorageRepository;
pub use plugins::MemoryPluginRepository;

use crate::filters::Pagination;

/// Slice a sorted result set by pagination, `None` meaning "everything".
fn paginate<T>(items: Vec<T>, page: Option<Pagination>) -> Vec<T> {
    let Some(page) = page else {
        return items;
    };

    let offset = page.effective_offset();
    if offset >= items.len() {
        return Vec::new();
    }

    let limit = page.effective_limit();
    items
        .into_iter()
        .skip(offset)
        .take(limit)
        .collect()
}
