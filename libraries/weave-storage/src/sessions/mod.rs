//! Playback session persistence
//!
//! Sequence linkage is flattened into nullable columns; a NULL
//! `sequence_id` means a plain blend session.

use crate::error::StorageError;
use crate::timestamps::{from_millis, to_millis};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::convert::Infallible;
use weave_core::error::Result;
use weave_core::storage::{Repository, SessionFilter};
use weave_core::types::*;

const KIND: &str = "session";

const SELECT_COLUMNS: &str = r#"
    SELECT id, blend_id, owner_id, start_time, last_activity_time,
           current_pool_id, weight_snapshot_json,
           sequence_id, stage_index, stage_time_limit_minutes,
           transition_state, transition_target
    FROM playback_sessions
    WHERE 1 = 1"#;

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &SessionFilter) {
    if let Some(id) = &filter.id {
        qb.push(" AND id = ").push_bind(id.as_str().to_owned());
    }
    if let Some(owner_id) = &filter.owner_id {
        qb.push(" AND owner_id = ").push_bind(owner_id.as_str().to_owned());
    }
    if let Some(blend_id) = &filter.blend_id {
        qb.push(" AND blend_id = ").push_bind(blend_id.as_str().to_owned());
    }
    if let Some(sequence_id) = &filter.sequence_id {
        qb.push(" AND sequence_id = ").push_bind(sequence_id.as_str().to_owned());
    }
    if let Some(cutoff) = filter.idle_since {
        qb.push(" AND last_activity_time < ").push_bind(to_millis(cutoff));
    }
}

fn index_column(id: &str, column: &str, value: Option<i64>) -> std::result::Result<Option<usize>, StorageError> {
    value
        .map(|v| {
            usize::try_from(v)
                .map_err(|_| StorageError::corrupt(KIND, id, format!("negative {column}")))
        })
        .transpose()
}

fn sequence_link(row: &SqliteRow, id: &str) -> std::result::Result<Option<SequenceLink>, StorageError> {
    let Some(sequence_id) = row.get::<Option<String>, _>("sequence_id") else {
        return Ok(None);
    };

    let stage_index = index_column(id, "stage_index", row.get("stage_index"))?
        .ok_or_else(|| StorageError::corrupt(KIND, id, "sequence session without stage"))?;

    let stage_time_limit_minutes = row
        .get::<Option<i64>, _>("stage_time_limit_minutes")
        .map(|m| {
            u32::try_from(m)
                .map_err(|_| StorageError::corrupt(KIND, id, format!("bad stage limit {m}")))
        })
        .transpose()?;

    let tag = row
        .get::<Option<String>, _>("transition_state")
        .unwrap_or_else(|| StageTransition::Playing.as_str().to_string());
    let target = index_column(id, "transition_target", row.get("transition_target"))?;
    let transition = StageTransition::from_parts(&tag, target)
        .ok_or_else(|| StorageError::corrupt(KIND, id, format!("bad transition '{tag}'")))?;

    Ok(Some(SequenceLink {
        sequence_id: SequenceId::new(sequence_id),
        stage_index,
        stage_time_limit_minutes,
        transition,
    }))
}

fn from_row(row: &SqliteRow) -> std::result::Result<PlaybackSession, StorageError> {
    let id: String = row.get("id");

    let weight_snapshot = row
        .get::<Option<&str>, _>("weight_snapshot_json")
        .map(serde_json::from_str::<Vec<PoolWeight>>)
        .transpose()?;

    Ok(PlaybackSession {
        blend_id: BlendId::new(row.get::<String, _>("blend_id")),
        owner_id: UserId::new(row.get::<String, _>("owner_id")),
        start_time: from_millis(KIND, &id, row.get("start_time"))?,
        last_activity_time: from_millis(KIND, &id, row.get("last_activity_time"))?,
        current_pool_id: row.get::<Option<String>, _>("current_pool_id").map(PoolId::new),
        weight_snapshot,
        sequence: sequence_link(row, &id)?,
        id: SessionId::new(id),
    })
}

/// Column values derived from the optional parts of a session
struct OptionalColumns {
    weight_snapshot: Option<String>,
    sequence_id: Option<String>,
    stage_index: Option<i64>,
    stage_time_limit_minutes: Option<i64>,
    transition_state: Option<&'static str>,
    transition_target: Option<i64>,
}

impl OptionalColumns {
    fn of(session: &PlaybackSession) -> Result<Self> {
        let weight_snapshot = session
            .weight_snapshot
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let link = session.sequence.as_ref();

        Ok(Self {
            weight_snapshot,
            sequence_id: link.map(|l| l.sequence_id.as_str().to_owned()),
            stage_index: link.map(|l| l.stage_index as i64),
            stage_time_limit_minutes: link
                .and_then(|l| l.stage_time_limit_minutes)
                .map(i64::from),
            transition_state: link.map(|l| l.transition.as_str()),
            transition_target: link
                .and_then(|l| l.transition.target())
                .map(|t| t as i64),
        })
    }
}

/// Insert one session
pub async fn insert<'e, E>(executor: E, session: &PlaybackSession) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let optional = OptionalColumns::of(session)?;

    sqlx::query(
        r#"
        INSERT INTO playback_sessions (
            id, blend_id, owner_id, start_time, last_activity_time,
            current_pool_id, weight_snapshot_json,
            sequence_id, stage_index, stage_time_limit_minutes,
            transition_state, transition_target
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(session.id.as_str())
    .bind(session.blend_id.as_str())
    .bind(session.owner_id.as_str())
    .bind(to_millis(session.start_time))
    .bind(to_millis(session.last_activity_time))
    .bind(session.current_pool_id.as_ref().map(|p| p.as_str()))
    .bind(optional.weight_snapshot)
    .bind(optional.sequence_id)
    .bind(optional.stage_index)
    .bind(optional.stage_time_limit_minutes)
    .bind(optional.transition_state)
    .bind(optional.transition_target)
    .execute(executor)
    .await?;

    Ok(())
}

/// Find sessions matching a filter, oldest first
pub async fn find(pool: &SqlitePool, filter: &SessionFilter) -> Result<Vec<PlaybackSession>> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
    push_filter(&mut qb, filter);
    qb.push(" ORDER BY start_time, id");

    let rows = qb.build().fetch_all(pool).await?;
    Ok(rows
        .iter()
        .map(from_row)
        .collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Replace a stored session; returns false if it does not exist
pub async fn update(pool: &SqlitePool, session: &PlaybackSession) -> Result<bool> {
    let optional = OptionalColumns::of(session)?;

    let result = sqlx::query(
        r#"
        UPDATE playback_sessions
        SET blend_id = ?, start_time = ?, last_activity_time = ?,
            current_pool_id = ?, weight_snapshot_json = ?,
            sequence_id = ?, stage_index = ?, stage_time_limit_minutes = ?,
            transition_state = ?, transition_target = ?
        WHERE id = ?
        "#,
    )
    .bind(session.blend_id.as_str())
    .bind(to_millis(session.start_time))
    .bind(to_millis(session.last_activity_time))
    .bind(session.current_pool_id.as_ref().map(|p| p.as_str()))
    .bind(optional.weight_snapshot)
    .bind(optional.sequence_id)
    .bind(optional.stage_index)
    .bind(optional.stage_time_limit_minutes)
    .bind(optional.transition_state)
    .bind(optional.transition_target)
    .bind(session.id.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete sessions matching a filter
pub async fn delete(pool: &SqlitePool, filter: &SessionFilter) -> Result<u64> {
    let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM playback_sessions WHERE 1 = 1");
    push_filter(&mut qb, filter);

    let result = qb.build().execute(pool).await?;
    Ok(result.rows_affected())
}

/// [`Repository`] over the `playback_sessions` table
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<PlaybackSession> for SessionRepository {
    async fn insert(&self, entity: &PlaybackSession) -> Result<()> {
        insert(&self.pool, entity).await
    }

    async fn insert_many(&self, entities: &[PlaybackSession]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        for session in entities {
            insert(&mut *tx, session).await?;
        }
        tx.commit().await?;
        Ok(entities.len() as u64)
    }

    async fn find(&self, filter: &SessionFilter) -> Result<Vec<PlaybackSession>> {
        find(&self.pool, filter).await
    }

    async fn update(&self, entity: &PlaybackSession) -> Result<bool> {
        update(&self.pool, entity).await
    }

    async fn update_many(&self, _filter: &SessionFilter, patch: &Infallible) -> Result<u64> {
        match *patch {}
    }

    async fn delete(&self, filter: &SessionFilter) -> Result<u64> {
        delete(&self.pool, filter).await
    }
}
