//! Postgres plugin storage.
//!
//! The natural-key uniqueness is enforced both here (select-then-write with
//! null-safe tuple matching) and by the DB-level unique index.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, QueryBuilder, Row};

use crate::domain::{EntityType, PluginStorageEntry};
use crate::filters::{FindPluginStorage, Pagination, SortDirection, Sorting};
use crate::repositories::PluginStorageRepository;

use super::{id_from_db, id_to_db};

const COLUMNS: &str =
    "id, plugin_id, key, entity_type, entity_id, payload, created_at, updated_at";

pub struct PostgresPluginStorageRepository {
    pool: PgPool,
}

impl PostgresPluginStorageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_by_natural_key(&self, entry: &PluginStorageEntry) -> Result<Option<u64>> {
        let row = sqlx::query(
            "SELECT id FROM plugin_storage WHERE plugin_id = $1 AND key = $2 \
             AND entity_type IS NOT DISTINCT FROM $3 AND entity_id IS NOT DISTINCT FROM $4",
        )
        .bind(id_to_db(entry.plugin_id))
        .bind(&entry.key)
        .bind(entry.entity_type.map(|et| et.as_str()))
        .bind(entry.entity_id.map(id_to_db))
        .fetch_optional(&self.pool)
        .await
        .context("failed to resolve storage natural key")?;

        Ok(row.map(|r| r.get::<i64, _>("id")).map(id_from_db))
    }
}

#[async_trait]
impl PluginStorageRepository for PostgresPluginStorageRepository {
    async fn find(
        &self,
        filter: &FindPluginStorage,
        order: &[Sorting],
        page: Option<Pagination>,
    ) -> Result<Vec<PluginStorageEntry>> {
        let mut qb = QueryBuilder::new(format!("SELECT {COLUMNS} FROM plugin_storage WHERE TRUE"));

        if !filter.ids.is_empty() {
            let ids: Vec<i64> = filter.ids.iter().copied().map(id_to_db).collect();
            qb.push(" AND id = ANY(").push_bind(ids).push(")");
        }
        if !filter.plugin_ids.is_empty() {
            let ids: Vec<i64> = filter.plugin_ids.iter().copied().map(id_to_db).collect();
            qb.push(" AND plugin_id = ANY(").push_bind(ids).push(")");
        }
        if !filter.keys.is_empty() {
            qb.push(" AND key = ANY(")
                .push_bind(filter.keys.clone())
                .push(")");
        }
        if !filter.entity_pairs.is_empty() {
            qb.push(" AND (");
            for (i, pair) in filter.entity_pairs.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push("(entity_type IS NOT DISTINCT FROM ")
                    .push_bind(pair.entity_type.map(|et| et.as_str()))
                    .push(" AND entity_id IS NOT DISTINCT FROM ")
                    .push_bind(pair.entity_id.map(id_to_db))
                    .push(")");
            }
            qb.push(")");
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
            .context("failed to query plugin storage")?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn save(&self, entry: &mut PluginStorageEntry) -> Result<()> {
        let now = Utc::now();

        // An explicit ID wins over the natural key.
        let target_id = if entry.id != 0 {
            Some(entry.id)
        } else {
            self.find_by_natural_key(entry).await?
        };

        if let Some(id) = target_id {
            let updated = sqlx::query(
                "UPDATE plugin_storage SET plugin_id = $2, key = $3, entity_type = $4, \
                 entity_id = $5, payload = $6, updated_at = $7 WHERE id = $1 \
                 RETURNING created_at",
            )
            .bind(id_to_db(id))
            .bind(id_to_db(entry.plugin_id))
            .bind(&entry.key)
            .bind(entry.entity_type.map(|et| et.as_str()))
            .bind(entry.entity_id.map(id_to_db))
            .bind(&entry.payload)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .context("failed to update storage entry")?;

            if let Some(row) = updated {
                entry.id = id;
                entry.created_at = Some(row.try_get("created_at")?);
                entry.updated_at = Some(now);

                return Ok(());
            }
        }

        // No such row; insert, keeping an explicit ID when one was given.
        let mut qb = QueryBuilder::new(
            "INSERT INTO plugin_storage (plugin_id, key, entity_type, entity_id, payload, \
             created_at, updated_at",
        );
        if entry.id != 0 {
            qb.push(", id");
        }
        qb.push(") VALUES (");
        qb.push_bind(id_to_db(entry.plugin_id))
            .push(", ")
            .push_bind(&entry.key)
            .push(", ")
            .push_bind(entry.entity_type.map(|et| et.as_str()))
            .push(", ")
            .push_bind(entry.entity_id.map(id_to_db))
            .push(", ")
            .push_bind(&entry.payload)
            .push(", ")
            .push_bind(now)
            .push(", ")
            .push_bind(now);
        if entry.id != 0 {
            qb.push(", ").push_bind(id_to_db(entry.id));
        }
        qb.push(") RETURNING id");

        let row = qb
            .build()
            .fetch_one(&self.pool)
            .await
            .context("failed to insert storage entry")?;

        entry.id = id_from_db(row.try_get("id")?);
        entry.created_at = Some(now);
        entry.updated_at = Some(now);

        Ok(())
    }

    async fn delete(&self, id: u64) -> Result<()> {
        sqlx::query("DELETE FROM plugin_storage WHERE id = $1")
            .bind(id_to_db(id))
            .execute(&self.pool)
            .await
            .context("failed to delete storage entry")?;

        Ok(())
    }

    async fn delete_by_plugin(&self, plugin_id: u64) -> Result<()> {
        sqlx::query("DELETE FROM plugin_storage WHERE plugin_id = $1")
            .bind(id_to_db(plugin_id))
            .execute(&self.pool)
            .await
            .context("failed to delete plugin storage")?;

        Ok(())
    }
}

fn push_order(qb: &mut QueryBuilder<'_, sqlx::Postgres>, order: &[Sorting]) {
    let mut pushed = false;
    for criterion in order {
        let column = match criterion.field.as_str() {
            "id" => "id",
            "plugin_id" => "plugin_id",
            "key" => "key",
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
        qb.push(" ORDER BY id ASC");
    }
}

fn row_to_entry(row: &PgRow) -> Result<PluginStorageEntry> {
    let entity_type: Option<String> = row.try_get("entity_type")?;

    Ok(PluginStorageEntry {
        id: id_from_db(row.try_get("id")?),
        plugin_id: id_from_db(row.try_get("plugin_id")?),
        key: row.try_get("key")?,
        entity_type: entity_type.as_deref().and_then(EntityType::parse),
        entity_id: row
            .try_get::<Option<i64>, _>("entity_id")?
            .map(id_from_db),
        payload: row.try_get("payload")?,
        created_at: row.try_get::<Option<DateTime<Utc>>, _>("created_at")?,
        updated_at: row.try_get::<Option<DateTime<Utc>>, _>("updated_at")?,
    })
}
