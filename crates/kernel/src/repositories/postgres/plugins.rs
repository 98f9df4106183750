//! Postgres plugin registry.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, QueryBuilder, Row};

use crate::domain::{Plugin, PluginPermission, PluginStatus};
use crate::filters::{FindPlugin, Pagination, SortDirection, Sorting};
use crate::repositories::PluginRepository;

use super::{id_from_db, id_to_db};

const COLUMNS: &str = "id, name, version, description, author, api_version, filename, source, \
                       homepage, required_permissions, allowed_permissions, status, priority, \
                       category, dependencies, config, installed_at, last_loaded_at, created_at, \
                       updated_at";

pub struct PostgresPluginRepository {
    pool: PgPool,
}

impl PostgresPluginRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PluginRepository for PostgresPluginRepository {
    async fn find_all(&self, order: &[Sorting], page: Option<Pagination>) -> Result<Vec<Plugin>> {
        self.find(&FindPlugin::default(), order, page).await
    }

    async fn find(
        &self,
        filter: &FindPlugin,
        order: &[Sorting],
        page: Option<Pagination>,
    ) -> Result<Vec<Plugin>> {
        let mut qb = QueryBuilder::new(format!("SELECT {COLUMNS} FROM plugins WHERE TRUE"));

        if !filter.ids.is_empty() {
            let ids: Vec<i64> = filter.ids.iter().copied().map(id_to_db).collect();
            qb.push(" AND id = ANY(").push_bind(ids).push(")");
        }
        if !filter.names.is_empty() {
            qb.push(" AND name = ANY(")
                .push_bind(filter.names.clone())
                .push(")");
        }
        if !filter.statuses.is_empty() {
            let statuses: Vec<String> = filter
                .statuses
                .iter()
                .map(|s| s.as_str().to_string())
                .collect();
            qb.push(" AND status = ANY(").push_bind(statuses).push(")");
        }
        if !filter.categories.is_empty() {
            qb.push(" AND category = ANY(")
                .push_bind(filter.categories.clone())
                .push(")");
        }

        push_order(&mut qb, order);

        if let Some(page) = page {
            qb.push(" LIMIT ")
                .push_bind(page.effective_limit() as i64)
                .push(" OFFSET ")
                .push_bind(page.effective_offset() as i64);
        }

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .context("failed to query plugins")?;

        rows.iter().map(row_to_plugin).collect()
    }

    async fn save(&self, plugin: &mut Plugin) -> Result<()> {
        let now = Utc::now();
        plugin.updated_at = Some(now);
        let created_at = plugin.created_at.unwrap_or(now);

        let row = sqlx::query(
            "INSERT INTO plugins (id, name, version, description, author, api_version, filename, \
             source, homepage, required_permissions, allowed_permissions, status, priority, \
             category, dependencies, config, installed_at, last_loaded_at, created_at, updated_at) \
             VALUES (COALESCE(NULLIF($1, 0), nextval('plugins_id_seq')), $2, $3, $4, $5, $6, $7, \
             $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20) \
             ON CONFLICT (id) DO UPDATE SET \
             name = excluded.name, version = excluded.version, \
             description = excluded.description, author = excluded.author, \
             api_version = excluded.api_version, filename = excluded.filename, \
             source = excluded.source, homepage = excluded.homepage, \
             required_permissions = excluded.required_permissions, \
             allowed_permissions = excluded.allowed_permissions, status = excluded.status, \
             priority = excluded.priority, category = excluded.category, \
             dependencies = excluded.dependencies, config = excluded.config, \
             installed_at = excluded.installed_at, last_loaded_at = excluded.last_loaded_at, \
             updated_at = excluded.updated_at \
             RETURNING id, created_at",
        )
        .bind(id_to_db(plugin.id))
        .bind(&plugin.name)
        .bind(&plugin.version)
        .bind(&plugin.description)
        .bind(&plugin.author)
        .bind(&plugin.api_version)
        .bind(&plugin.filename)
        .bind(&plugin.source)
        .bind(&plugin.homepage)
        .bind(permissions_to_json(&plugin.required_permissions))
        .bind(permissions_to_json(&plugin.allowed_permissions))
        .bind(plugin.status.as_str())
        .bind(plugin.priority)
        .bind(&plugin.category)
        .bind(serde_json::json!(plugin.dependencies))
        .bind(serde_json::json!(plugin.config))
        .bind(plugin.installed_at)
        .bind(plugin.last_loaded_at)
        .bind(created_at)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .context("failed to save plugin")?;

        plugin.id = id_from_db(row.try_get("id")?);
        plugin.created_at = row.try_get("created_at")?;

        Ok(())
    }

    async fn delete(&self, id: u64) -> Result<()> {
        sqlx::query("DELETE FROM plugins WHERE id = $1")
            .bind(id_to_db(id))
            .execute(&self.pool)
            .await
            .context("failed to delete plugin")?;

        Ok(())
    }
}

/// Default registry order is priority descending, name ascending.
fn push_order(qb: &mut QueryBuilder<'_, sqlx::Postgres>, order: &[Sorting]) {
    let mut pushed = false;
    for criterion in order {
        // Column whitelist; unknown fields are ignored.
        let column = match criterion.field.as_str() {
            "id" => "id",
            "name" => "name",
            "priority" => "priority",
            "status" => "status",
            "created_at" => "created_at",
            _ => continue,
        };

        qb.push(if pushed { ", " } else { " ORDER BY " });
        qb.push(column);
        qb.push(match criterion.direction {
            SortDirection::Asc => " ASC",
            SortDirection::Desc => " DESC",
        });
        pushed = true;
    }

    if !pushed {
        qb.push(" ORDER BY priority DESC, name ASC");
    }
}

fn permissions_to_json(permissions: &[PluginPermission]) -> serde_json::Value {
    serde_json::json!(permissions.iter().map(|p| p.as_str()).collect::<Vec<_>>())
}

fn permissions_from_json(value: &serde_json::Value) -> Vec<PluginPermission> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().and_then(PluginPermission::parse))
                .collect()
        })
        .unwrap_or_default()
}

fn row_to_plugin(row: &PgRow) -> Result<Plugin> {
    let required: serde_json::Value = row.try_get("required_permissions")?;
    let allowed: serde_json::Value = row.try_get("allowed_permissions")?;
    let dependencies: serde_json::Value = row.try_get("dependencies")?;
    let config: serde_json::Value = row.try_get("config")?;
    let status: String = row.try_get("status")?;

    Ok(Plugin {
        id: id_from_db(row.try_get("id")?),
        name: row.try_get("name")?,
        version: row.try_get("version")?,
        description: row.try_get("description")?,
        author: row.try_get("author")?,
        api_version: row.try_get("api_version")?,
        filename: row.try_get("filename")?,
        source: row.try_get("source")?,
        homepage: row.try_get("homepage")?,
        required_permissions: permissions_from_json(&required),
        allowed_permissions: permissions_from_json(&allowed),
        status: PluginStatus::parse(&status).unwrap_or(PluginStatus::Error),
        priority: row.try_get("priority")?,
        category: row.try_get("category")?,
        dependencies: serde_json::from_value(dependencies).unwrap_or_default(),
        config: serde_json::from_value(config).unwrap_or_default(),
        installed_at: row.try_get::<Option<DateTime<Utc>>, _>("installed_at")?,
        last_loaded_at: row.try_get::<Option<DateTime<Utc>>, _>("last_loaded_at")?,
        created_at: row.try_get::<Option<DateTime<Utc>>, _>("created_at")?,
        updated_at: row.try_get::<Option<DateTime<Utc>>, _>("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permissions_json_round_trip() {
        let permissions = vec![
            PluginPermission::ManageServers,
            PluginPermission::ListenEvents,
        ];
        let json = permissions_to_json(&permissions);
        assert_eq!(permissions_from_json(&json), permissions);
    }

    #[test]
    fn unknown_permission_strings_are_dropped() {
        let json = serde_json::json!(["manage_servers", "not_a_permission"]);
        assert_eq!(
            permissions_from_json(&json),
            vec![PluginPermission::ManageServers]
        );
    }
}
