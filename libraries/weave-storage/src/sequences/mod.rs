//! Sequence persistence

use crate::error::StorageError;
use crate::timestamps::{from_millis, to_millis};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::convert::Infallible;
use weave_core::error::Result;
use weave_core::storage::{Repository, SequenceFilter};
use weave_core::types::*;

const KIND: &str = "sequence";

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &SequenceFilter) {
    if let Some(id) = &filter.id {
        qb.push(" AND id = ").push_bind(id.as_str().to_owned());
    }
    if let Some(owner_id) = &filter.owner_id {
        qb.push(" AND owner_id = ").push_bind(owner_id.as_str().to_owned());
    }
}

fn from_row(row: &SqliteRow) -> std::result::Result<Sequence, StorageError> {
    let id: String = row.get("id");
    Ok(Sequence {
        owner_id: UserId::new(row.get::<String, _>("owner_id")),
        name: row.get("name"),
        stages: serde_json::from_str(row.get::<&str, _>("stages_json"))?,
        created_at: from_millis(KIND, &id, row.get("created_at"))?,
        id: SequenceId::new(id),
    })
}

/// Insert one sequence
pub async fn insert<'e, E>(executor: E, sequence: &Sequence) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO sequences (id, owner_id, name, stages_json, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(sequence.id.as_str())
    .bind(sequence.owner_id.as_str())
    .bind(&sequence.name)
    .bind(serde_json::to_string(&sequence.stages)?)
    .bind(to_millis(sequence.created_at))
    .execute(executor)
    .await?;

    Ok(())
}

/// Find sequences matching a filter, oldest first
pub async fn find(pool: &SqlitePool, filter: &SequenceFilter) -> Result<Vec<Sequence>> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT id, owner_id, name, stages_json, created_at FROM sequences WHERE 1 = 1",
    );
    push_filter(&mut qb, filter);
    qb.push(" ORDER BY created_at, id");

    let rows = qb.build().fetch_all(pool).await?;
    Ok(rows
        .iter()
        .map(from_row)
        .collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Replace a stored sequence; returns false if it does not exist
pub async fn update(pool: &SqlitePool, sequence: &Sequence) -> Result<bool> {
    let result = sqlx::query("UPDATE sequences SET name = ?, stages_json = ? WHERE id = ?")
        .bind(&sequence.name)
        .bind(serde_json::to_string(&sequence.stages)?)
        .bind(sequence.id.as_str())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete sequences matching a filter
pub async fn delete(pool: &SqlitePool, filter: &SequenceFilter) -> Result<u64> {
    let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM sequences WHERE 1 = 1");
    push_filter(&mut qb, filter);

    let result = qb.build().execute(pool).await?;
    Ok(result.rows_affected())
}

/// [`Repository`] over the `sequences` table
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<Sequence> for SequenceRepository {
    async fn insert(&self, entity: &Sequence) -> Result<()> {
        insert(&self.pool, entity).await
    }

    async fn insert_many(&self, entities: &[Sequence]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        for sequence in entities {
            insert(&mut *tx, sequence).await?;
        }
        tx.commit().await?;
        Ok(entities.len() as u64)
    }

    async fn find(&self, filter: &SequenceFilter) -> Result<Vec<Sequence>> {
        find(&self.pool, filter).await
    }

    async fn update(&self, entity: &Sequence) -> Result<bool> {
        update(&self.pool, entity).await
    }

    async fn update_many(&self, _filter: &SequenceFilter, patch: &Infallible) -> Result<u64> {
        match *patch {}
    }

    async fn delete(&self, filter: &SequenceFilter) -> Result<u64> {
        delete(&self.pool, filter).await
    }
}
