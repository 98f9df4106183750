//! In-memory plugin registry.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use crate::domain::Plugin;
use crate::filters::{FindPlugin, Pagination, SortDirection, Sorting};
use crate::repositories::PluginRepository;

use super::paginate;

#[derive(Default)]
struct RegistryInner {
    plugins: HashMap<u64, Plugin>,
    next_id: u64,
}

/// In-memory implementation of [`PluginRepository`].
#[derive(Default)]
pub struct MemoryPluginRepository {
    inner: RwLock<RegistryInner>,
}

impl MemoryPluginRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PluginRepository for MemoryPluginRepository {
    async fn find_all(&self, order: &[Sorting], page: Option<Pagination>) -> Result<Vec<Plugin>> {
        #[allow(clippy::unwrap_used)]
        let inner = self.inner.read().unwrap();

        let mut plugins: Vec<Plugin> = inner.plugins.values().cloned().collect();
        sort_plugins(&mut plugins, order);

        Ok(paginate(plugins, page))
    }

    async fn find(
        &self,
        filter: &FindPlugin,
        order: &[Sorting],
        page: Option<Pagination>,
    ) -> Result<Vec<Plugin>> {
        #[allow(clippy::unwrap_used)]
        let inner = self.inner.read().unwrap();

        let mut plugins: Vec<Plugin> = inner
            .plugins
            .values()
            .filter(|p| matches_filter(p, filter))
            .cloned()
            .collect();
        sort_plugins(&mut plugins, order);

        Ok(paginate(plugins, page))
    }

    async fn save(&self, plugin: &mut Plugin) -> Result<()> {
        #[allow(clippy::unwrap_used)]
        let mut inner = self.inner.write().unwrap();

        let now = Utc::now();
        plugin.updated_at = Some(now);

        if !inner.plugins.contains_key(&plugin.id) {
            if plugin.id == 0 {
                inner.next_id += 1;
                plugin.id = inner.next_id;
            }

            if plugin.created_at.is_none() {
                plugin.created_at = Some(now);
            }
        }

        inner.plugins.insert(plugin.id, plugin.clone());

        Ok(())
    }

    async fn delete(&self, id: u64) -> Result<()> {
        #[allow(clippy::unwrap_used)]
        self.inner.write().unwrap().plugins.remove(&id);

        Ok(())
    }
}

fn matches_filter(plugin: &Plugin, filter: &FindPlugin) -> bool {
    if !filter.ids.is_empty() && !filter.ids.contains(&plugin.id) {
        return false;
    }
    if !filter.names.is_empty() && !filter.names.contains(&plugin.name) {
        return false;
    }
    if !filter.statuses.is_empty() && !filter.statuses.contains(&plugin.status) {
        return false;
    }
    if !filter.categories.is_empty() {
        let Some(category) = &plugin.category else {
            return false;
        };
        if !filter.categories.contains(category) {
            return false;
        }
    }

    true
}

/// Default registry order is priority descending, name ascending.
fn sort_plugins(plugins: &mut [Plugin], order: &[Sorting]) {
    if order.is_empty() {
        plugins.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.name.cmp(&b.name))
        });

        return;
    }

    plugins.sort_by(|a, b| {
        for criterion in order {
            let ordering = match criterion.field.as_str() {
                "id" => a.id.cmp(&b.id),
                "name" => a.name.cmp(&b.name),
                "priority" => a.priority.cmp(&b.priority),
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
    use crate::domain::PluginStatus;

    fn plugin(name: &str, priority: i32, status: PluginStatus) -> Plugin {
        Plugin {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            priority,
            status,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn save_assigns_id_and_timestamps() {
        let repo = MemoryPluginRepository::new();

        let mut row = plugin("audit", 0, PluginStatus::Active);
        repo.save(&mut row).await.unwrap();

        assert_ne!(row.id, 0);
        assert!(row.created_at.is_some());
        assert!(row.updated_at.is_some());
    }

    #[tokio::test]
    async fn save_preserves_explicit_id() {
        let repo = MemoryPluginRepository::new();

        let mut row = plugin("audit", 0, PluginStatus::Active);
        row.id = 4242;
        repo.save(&mut row).await.unwrap();

        let found = repo.find(&FindPlugin::by_ids(vec![4242]), &[], None).await;
        assert_eq!(found.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn default_order_is_priority_desc_name_asc() {
        let repo = MemoryPluginRepository::new();

        for (name, priority) in [("beta", 1), ("alpha", 1), ("gamma", 5)] {
            repo.save(&mut plugin(name, priority, PluginStatus::Active))
                .await
                .unwrap();
        }

        let all = repo.find_all(&[], None).await.unwrap();
        let names: Vec<&str> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["gamma", "alpha", "beta"]);
    }

    #[tokio::test]
    async fn filters_compose_with_and() {
        let repo = MemoryPluginRepository::new();

        repo.save(&mut plugin("a", 0, PluginStatus::Active))
            .await
            .unwrap();
        repo.save(&mut plugin("b", 0, PluginStatus::Disabled))
            .await
            .unwrap();

        let filter = FindPlugin {
            names: vec!["a".to_string(), "b".to_string()],
            statuses: vec![PluginStatus::Disabled],
            ..Default::default()
        };
        let found = repo.find(&filter, &[], None).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "b");
    }
}
