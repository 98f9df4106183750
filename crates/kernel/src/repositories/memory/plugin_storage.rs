//! In-memory per-plugin storage with multi-index lookup.
//!
//! The primary map and the three secondary indexes (plugin ID, key, entity
//! pair) are only ever mutated together inside the write lock, so readers
//! always observe them in sync.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{EntityType, PluginStorageEntry};
use crate::filters::{FindPluginStorage, Pagination, SortDirection, Sorting};
use crate::repositories::PluginStorageRepository;

use super::paginate;

/// `(entity_type, entity_id)` index key; absent matches absent.
type EntityKey = (Option<EntityType>, Option<u64>);

#[derive(Default)]
struct StorageInner {
    entries: HashMap<u64, PluginStorageEntry>,
    next_id: u64,
    plugin_index: HashMap<u64, HashSet<u64>>,
    key_index: HashMap<String, HashSet<u64>>,
    entity_index: HashMap<EntityKey, HashSet<u64>>,
}

/// In-memory implementation of [`PluginStorageRepository`].
#[derive(Default)]
pub struct MemoryPluginStorageRepository {
    inner: RwLock<StorageInner>,
}

impl MemoryPluginStorageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PluginStorageRepository for MemoryPluginStorageRepository {
    async fn find(
        &self,
        filter: &FindPluginStorage,
        order: &[Sorting],
        page: Option<Pagination>,
    ) -> Result<Vec<PluginStorageEntry>> {
        #[allow(clippy::unwrap_used)]
        let inner = self.inner.read().unwrap();

        let candidate_ids = inner.filtered_entry_ids(filter);

        let mut entries: Vec<PluginStorageEntry> = candidate_ids
            .iter()
            .filter_map(|id| inner.entries.get(id).cloned())
            .collect();

        sort_entries(&mut entries, order);

        Ok(paginate(entries, page))
    }

    async fn save(&self, entry: &mut PluginStorageEntry) -> Result<()> {
        #[allow(clippy::unwrap_used)]
        let mut inner = self.inner.write().unwrap();

        let now = Utc::now();

        inner.resolve_entry_id(entry, now);
        entry.updated_at = Some(now);

        let saved = entry.clone();
        inner.add_to_indexes(&saved);
        inner.entries.insert(saved.id, saved);

        Ok(())
    }

    async fn delete(&self, id: u64) -> Result<()> {
        #[allow(clippy::unwrap_used)]
        let mut inner = self.inner.write().unwrap();

        if let Some(entry) = inner.entries.get(&id).cloned() {
            inner.remove_from_indexes(&entry);
            inner.entries.remove(&id);
        }

        Ok(())
    }

    async fn delete_by_plugin(&self, plugin_id: u64) -> Result<()> {
        #[allow(clippy::unwrap_used)]
        let mut inner = self.inner.write().unwrap();

        let entry_ids: Vec<u64> = inner
            .plugin_index
            .get(&plugin_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();

        for entry_id in entry_ids {
            if let Some(entry) = inner.entries.get(&entry_id).cloned() {
                inner.remove_from_indexes(&entry);
                inner.entries.remove(&entry_id);
            }
        }

        Ok(())
    }
}

impl StorageInner {
    /// Assign the entry's ID and `created_at`.
    ///
    /// An explicit ID updates that row directly, whatever its natural key;
    /// otherwise the natural key `(plugin_id, key, entity_type, entity_id)`
    /// decides between update and insert.
    fn resolve_entry_id(&mut self, entry: &mut PluginStorageEntry, now: chrono::DateTime<Utc>) {
        if entry.id != 0 {
            if let Some(old) = self.entries.get(&entry.id).cloned() {
                self.remove_from_indexes(&old);
                if entry.created_at.is_none() {
                    entry.created_at = old.created_at;
                }
            } else if entry.created_at.is_none() {
                entry.created_at = Some(now);
            }

            return;
        }

        if let Some(existing_id) = self.find_existing_entry(entry) {
            entry.id = existing_id;
            if let Some(old) = self.entries.get(&existing_id).cloned() {
                self.remove_from_indexes(&old);
                entry.created_at = old.created_at;
            }

            return;
        }

        self.next_id += 1;
        entry.id = self.next_id;
        entry.created_at = Some(now);
    }

    fn find_existing_entry(&self, entry: &PluginStorageEntry) -> Option<u64> {
        let plugin_entries = self.plugin_index.get(&entry.plugin_id)?;

        plugin_entries.iter().copied().find(|id| {
            self.entries.get(id).is_some_and(|existing| {
                existing.key == entry.key
                    && existing.entity_type == entry.entity_type
                    && existing.entity_id == entry.entity_id
            })
        })
    }

    fn add_to_indexes(&mut self, entry: &PluginStorageEntry) {
        self.plugin_index
            .entry(entry.plugin_id)
            .or_default()
            .insert(entry.id);
        self.key_index
            .entry(entry.key.clone())
            .or_default()
            .insert(entry.id);
        self.entity_index
            .entry((entry.entity_type, entry.entity_id))
            .or_default()
            .insert(entry.id);
    }

    fn remove_from_indexes(&mut self, entry: &PluginStorageEntry) {
        if let Some(set) = self.plugin_index.get_mut(&entry.plugin_id) {
            set.remove(&entry.id);
            if set.is_empty() {
                self.plugin_index.remove(&entry.plugin_id);
            }
        }

        if let Some(set) = self.key_index.get_mut(&entry.key) {
            set.remove(&entry.id);
            if set.is_empty() {
                self.key_index.remove(&entry.key);
            }
        }

        let entity_key = (entry.entity_type, entry.entity_id);
        if let Some(set) = self.entity_index.get_mut(&entity_key) {
            set.remove(&entry.id);
            if set.is_empty() {
                self.entity_index.remove(&entity_key);
            }
        }
    }

    /// AND across populated filter fields, OR within each field.
    fn filtered_entry_ids(&self, filter: &FindPluginStorage) -> HashSet<u64> {
        let mut result: HashSet<u64> = if !filter.ids.is_empty() {
            filter
                .ids
                .iter()
                .copied()
                .filter(|id| self.entries.contains_key(id))
                .collect()
        } else if !filter.plugin_ids.is_empty() {
            self.union_of(&self.plugin_index, &filter.plugin_ids)
        } else if !filter.keys.is_empty() {
            self.union_of(&self.key_index, &filter.keys)
        } else if !filter.entity_pairs.is_empty() {
            self.union_of_pairs(filter)
        } else {
            self.entries.keys().copied().collect()
        };

        // The first populated field chose the candidates; every later
        // populated field intersects.
        if !filter.plugin_ids.is_empty() && !filter.ids.is_empty() {
            let allowed = self.union_of(&self.plugin_index, &filter.plugin_ids);
            result.retain(|id| allowed.contains(id));
        }
        if !filter.keys.is_empty() && (!filter.ids.is_empty() || !filter.plugin_ids.is_empty()) {
            let allowed = self.union_of(&self.key_index, &filter.keys);
            result.retain(|id| allowed.contains(id));
        }
        if !filter.entity_pairs.is_empty()
            && (!filter.ids.is_empty() || !filter.plugin_ids.is_empty() || !filter.keys.is_empty())
        {
            let allowed = self.union_of_pairs(filter);
            result.retain(|id| allowed.contains(id));
        }

        result
    }

    fn union_of<K: std::hash::Hash + Eq>(
        &self,
        index: &HashMap<K, HashSet<u64>>,
        wanted: &[K],
    ) -> HashSet<u64> {
        let mut ids = HashSet::new();
        for key in wanted {
            if let Some(set) = index.get(key) {
                ids.extend(set.iter().copied());
            }
        }

        ids
    }

    fn union_of_pairs(&self, filter: &FindPluginStorage) -> HashSet<u64> {
        let mut ids = HashSet::new();
        for pair in &filter.entity_pairs {
            if let Some(set) = self.entity_index.get(&(pair.entity_type, pair.entity_id)) {
                ids.extend(set.iter().copied());
            }
        }

        ids
    }
}

fn sort_entries(entries: &mut [PluginStorageEntry], order: &[Sorting]) {
    if order.is_empty() {
        entries.sort_by_key(|e| e.id);

        return;
    }

    entries.sort_by(|a, b| {
        for criterion in order {
            let ordering = match criterion.field.as_str() {
                "id" => a.id.cmp(&b.id),
                "plugin_id" => a.plugin_id.cmp(&b.plugin_id),
                "key" => a.key.cmp(&b.key),
                _ => std::cmp::Ordering::Equal,
            };

            if ordering != std::cmp::Ordering::Equal {
                return match criterion.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                };
            }
        }

        std::cmp::Ordering::Equal
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::EntityPair;

    fn entry(plugin_id: u64, key: &str, payload: &[u8]) -> PluginStorageEntry {
        PluginStorageEntry {
            plugin_id,
            key: key.to_string(),
            payload: payload.to_vec(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn save_assigns_sequential_ids() {
        let repo = MemoryPluginStorageRepository::new();

        let mut first = entry(1, "a", b"1");
        let mut second = entry(1, "b", b"2");
        repo.save(&mut first).await.unwrap();
        repo.save(&mut second).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn upsert_keeps_id_and_created_at() {
        let repo = MemoryPluginStorageRepository::new();

        let mut first = entry(1, "counter", b"A");
        repo.save(&mut first).await.unwrap();
        let created = first.created_at.unwrap();

        let mut second = entry(1, "counter", b"B");
        repo.save(&mut second).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, Some(created));
        assert!(second.updated_at.unwrap() >= created);

        let found = repo
            .find(&FindPluginStorage::default(), &[], None)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].payload, b"B");
    }

    #[tokio::test]
    async fn entries_with_different_entity_ids_are_distinct() {
        let repo = MemoryPluginStorageRepository::new();

        let mut one = entry(20, "stats", b"P1");
        one.entity_type = Some(EntityType::Server);
        one.entity_id = Some(1);
        let mut two = entry(20, "stats", b"P2");
        two.entity_type = Some(EntityType::Server);
        two.entity_id = Some(2);

        repo.save(&mut one).await.unwrap();
        repo.save(&mut two).await.unwrap();
        assert_ne!(one.id, two.id);

        let filter = FindPluginStorage {
            plugin_ids: vec![20],
            keys: vec!["stats".to_string()],
            ..Default::default()
        };
        let found = repo.find(&filter, &[], None).await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn entity_pair_filter_matches_absent_to_absent() {
        let repo = MemoryPluginStorageRepository::new();

        let mut scoped = entry(1, "k", b"scoped");
        scoped.entity_type = Some(EntityType::Server);
        scoped.entity_id = Some(9);
        let mut unscoped = entry(1, "k2", b"unscoped");

        repo.save(&mut scoped).await.unwrap();
        repo.save(&mut unscoped).await.unwrap();

        let filter = FindPluginStorage {
            entity_pairs: vec![EntityPair::none()],
            ..Default::default()
        };
        let found = repo.find(&filter, &[], None).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].payload, b"unscoped");
    }

    #[tokio::test]
    async fn explicit_id_save_updates_by_id() {
        let repo = MemoryPluginStorageRepository::new();

        let mut original = entry(1, "old-key", b"old");
        repo.save(&mut original).await.unwrap();

        // Saving with an explicit ID rewrites that row even though the
        // natural key differs.
        let mut replacement = entry(1, "new-key", b"new");
        replacement.id = original.id;
        repo.save(&mut replacement).await.unwrap();

        let found = repo
            .find(&FindPluginStorage::default(), &[], None)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, "new-key");
        assert_eq!(found[0].payload, b"new");

        // The old natural key no longer resolves.
        let by_key = repo
            .find(
                &FindPluginStorage {
                    keys: vec!["old-key".to_string()],
                    ..Default::default()
                },
                &[],
                None,
            )
            .await
            .unwrap();
        assert!(by_key.is_empty());
    }

    #[tokio::test]
    async fn delete_unknown_id_is_success() {
        let repo = MemoryPluginStorageRepository::new();
        repo.delete(999).await.unwrap();
    }

    #[tokio::test]
    async fn delete_by_plugin_leaves_other_plugins_alone() {
        let repo = MemoryPluginStorageRepository::new();

        for (plugin_id, key) in [(1, "a"), (1, "b"), (2, "a")] {
            repo.save(&mut entry(plugin_id, key, b"x")).await.unwrap();
        }

        repo.delete_by_plugin(1).await.unwrap();

        let remaining = repo
            .find(&FindPluginStorage::default(), &[], None)
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].plugin_id, 2);
    }

    #[tokio::test]
    async fn find_sorts_by_id_by_default() {
        let repo = MemoryPluginStorageRepository::new();

        for key in ["c", "a", "b"] {
            repo.save(&mut entry(1, key, b"x")).await.unwrap();
        }

        let found = repo
            .find(&FindPluginStorage::default(), &[], None)
            .await
            .unwrap();
        let ids: Vec<u64> = found.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let by_key_desc = repo
            .find(&FindPluginStorage::default(), &[Sorting::desc("key")], None)
            .await
            .unwrap();
        let keys: Vec<&str> = by_key_desc.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn pagination_slices_results() {
        let repo = MemoryPluginStorageRepository::new();

        for i in 0..5 {
            repo.save(&mut entry(1, &format!("k{i}"), b"x"))
                .await
                .unwrap();
        }

        let page = repo
            .find(
                &FindPluginStorage::default(),
                &[],
                Some(Pagination {
                    limit: 2,
                    offset: 2,
                }),
            )
            .await
            .unwrap();
        let ids: Vec<u64> = page.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 4]);

        let past_end = repo
            .find(
                &FindPluginStorage::default(),
                &[],
                Some(Pagination {
                    limit: 10,
                    offset: 100,
                }),
            )
            .await
            .unwrap();
        assert!(past_end.is_empty());
    }
}
