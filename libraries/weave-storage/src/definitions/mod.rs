//! Blend definition persistence
//!
//! Pool weights and scheduled reweights are stored as JSON columns; their
//! order is significant and preserved.

use crate::error::StorageError;
use crate::timestamps::{from_millis, to_millis};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::convert::Infallible;
use weave_core::error::Result;
use weave_core::storage::{DefinitionFilter, Repository};
use weave_core::types::*;

const KIND: &str = "blend definition";

const SELECT_COLUMNS: &str = r#"
    SELECT id, owner_id, name, pools_json, scheduled_reweights_json,
           playback_order, repeat_mode, single_pool_lock, crossfade_seconds,
           created_at, updated_at
    FROM blend_definitions
    WHERE 1 = 1"#;

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &DefinitionFilter) {
    if let Some(id) = &filter.id {
        qb.push(" AND id = ").push_bind(id.as_str().to_owned());
    }
    if let Some(owner_id) = &filter.owner_id {
        qb.push(" AND owner_id = ").push_bind(owner_id.as_str().to_owned());
    }
}

fn from_row(row: &SqliteRow) -> std::result::Result<BlendDefinition, StorageError> {
    let id: String = row.get("id");

    let playback_order: String = row.get("playback_order");
    let playback_order = PlaybackOrder::from_str(&playback_order).ok_or_else(|| {
        StorageError::corrupt(KIND, &id, format!("unknown playback order '{playback_order}'"))
    })?;

    let repeat_mode: String = row.get("repeat_mode");
    let repeat_mode = RepeatMode::from_str(&repeat_mode).ok_or_else(|| {
        StorageError::corrupt(KIND, &id, format!("unknown repeat mode '{repeat_mode}'"))
    })?;

    let crossfade: i64 = row.get("crossfade_seconds");
    let crossfade_seconds = u8::try_from(crossfade)
        .map_err(|_| StorageError::corrupt(KIND, &id, format!("bad crossfade {crossfade}")))?;

    Ok(BlendDefinition {
        owner_id: UserId::new(row.get::<String, _>("owner_id")),
        name: row.get("name"),
        pools: serde_json::from_str(row.get::<&str, _>("pools_json"))?,
        scheduled_reweights: serde_json::from_str(row.get::<&str, _>("scheduled_reweights_json"))?,
        playback_order,
        repeat_mode,
        single_pool_lock: row.get::<i64, _>("single_pool_lock") != 0,
        crossfade_seconds,
        created_at: from_millis(KIND, &id, row.get("created_at"))?,
        updated_at: from_millis(KIND, &id, row.get("updated_at"))?,
        id: BlendId::new(id),
    })
}

/// Insert one definition
pub async fn insert<'e, E>(executor: E, definition: &BlendDefinition) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO blend_definitions (
            id, owner_id, name, pools_json, scheduled_reweights_json,
            playback_order, repeat_mode, single_pool_lock, crossfade_seconds,
            created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(definition.id.as_str())
    .bind(definition.owner_id.as_str())
    .bind(&definition.name)
    .bind(serde_json::to_string(&definition.pools)?)
    .bind(serde_json::to_string(&definition.scheduled_reweights)?)
    .bind(definition.playback_order.as_str())
    .bind(definition.repeat_mode.as_str())
    .bind(i64::from(definition.single_pool_lock))
    .bind(i64::from(definition.crossfade_seconds))
    .bind(to_millis(definition.created_at))
    .bind(to_millis(definition.updated_at))
    .execute(executor)
    .await?;

    Ok(())
}

/// Find definitions matching a filter, oldest first
pub async fn find(pool: &SqlitePool, filter: &DefinitionFilter) -> Result<Vec<BlendDefinition>> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
    push_filter(&mut qb, filter);
    qb.push(" ORDER BY created_at, id");

    let rows = qb.build().fetch_all(pool).await?;
    Ok(rows
        .iter()
        .map(from_row)
        .collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Replace a stored definition; returns false if it does not exist
pub async fn update(pool: &SqlitePool, definition: &BlendDefinition) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE blend_definitions
        SET name = ?, pools_json = ?, scheduled_reweights_json = ?,
            playback_order = ?, repeat_mode = ?, single_pool_lock = ?,
            crossfade_seconds = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&definition.name)
    .bind(serde_json::to_string(&definition.pools)?)
    .bind(serde_json::to_string(&definition.scheduled_reweights)?)
    .bind(definition.playback_order.as_str())
    .bind(definition.repeat_mode.as_str())
    .bind(i64::from(definition.single_pool_lock))
    .bind(i64::from(definition.crossfade_seconds))
    .bind(to_millis(definition.updated_at))
    .bind(definition.id.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete definitions matching a filter
pub async fn delete(pool: &SqlitePool, filter: &DefinitionFilter) -> Result<u64> {
    let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM blend_definitions WHERE 1 = 1");
    push_filter(&mut qb, filter);

    let result = qb.build().execute(pool).await?;
    Ok(result.rows_affected())
}

/// [`Repository`] over the `blend_definitions` table
#[derive(Debug, Clone)]
pub struct DefinitionRepository {
    pool: SqlitePool,
}

impl DefinitionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<BlendDefinition> for DefinitionRepository {
    async fn insert(&self, entity: &BlendDefinition) -> Result<()> {
        insert(&self.pool, entity).await
    }

    async fn insert_many(&self, entities: &[BlendDefinition]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        for definition in entities {
            insert(&mut *tx, definition).await?;
        }
        tx.commit().await?;
        Ok(entities.len() as u64)
    }

    async fn find(&self, filter: &DefinitionFilter) -> Result<Vec<BlendDefinition>> {
        find(&self.pool, filter).await
    }

    async fn update(&self, entity: &BlendDefinition) -> Result<bool> {
        update(&self.pool, entity).await
    }

    async fn update_many(&self, _filter: &DefinitionFilter, patch: &Infallible) -> Result<u64> {
        match *patch {}
    }

    async fn delete(&self, filter: &DefinitionFilter) -> Result<u64> {
        delete(&self.pool, filter).await
    }
}
