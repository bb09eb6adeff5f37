//! Session item persistence
//!
//! Items are the per-session copies the selector draws from. Reads return
//! them in insertion order, which is provider order within each pool.

use crate::error::StorageError;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use weave_core::error::Result;
use weave_core::storage::{Repository, SessionItemFilter, SessionItemPatch};
use weave_core::types::*;

const KIND: &str = "session item";

// 12 columns per row keeps a chunk under SQLite's 999 bind parameter floor
const INSERT_CHUNK: usize = 80;

const SELECT_COLUMNS: &str = r#"
    SELECT id, session_id, blend_id, pool_id, track_id, title, artists_json,
           album, duration_ms, cover_url, position, played
    FROM session_items
    WHERE 1 = 1"#;

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &SessionItemFilter) {
    if let Some(id) = &filter.id {
        qb.push(" AND id = ").push_bind(id.as_str().to_owned());
    }
    if let Some(session_id) = &filter.session_id {
        qb.push(" AND session_id = ").push_bind(session_id.as_str().to_owned());
    }
    if let Some(pool_id) = &filter.pool_id {
        qb.push(" AND pool_id = ").push_bind(pool_id.as_str().to_owned());
    }
    if let Some(played) = filter.played {
        qb.push(" AND played = ").push_bind(i64::from(played));
    }
}

fn from_row(row: &SqliteRow) -> std::result::Result<SessionItem, StorageError> {
    let id: String = row.get("id");

    let duration: i64 = row.get("duration_ms");
    let duration_ms = u64::try_from(duration)
        .map_err(|_| StorageError::corrupt(KIND, &id, format!("bad duration {duration}")))?;

    let position: i64 = row.get("position");
    let position = u32::try_from(position)
        .map_err(|_| StorageError::corrupt(KIND, &id, format!("bad position {position}")))?;

    Ok(SessionItem {
        track_id: TrackId::new(row.get::<String, _>("track_id")),
        title: row.get("title"),
        artists: serde_json::from_str(row.get::<&str, _>("artists_json"))?,
        album: row.get("album"),
        duration_ms,
        cover_url: row.get("cover_url"),
        position,
        pool_id: PoolId::new(row.get::<String, _>("pool_id")),
        blend_id: BlendId::new(row.get::<String, _>("blend_id")),
        session_id: SessionId::new(row.get::<String, _>("session_id")),
        played: row.get::<i64, _>("played") != 0,
        id: SessionItemId::new(id),
    })
}

/// Insert items in chunks inside one transaction
pub async fn insert_many(pool: &SqlitePool, items: &[SessionItem]) -> Result<u64> {
    if items.is_empty() {
        return Ok(0);
    }

    // Serialize up front so a bad row aborts before anything is written
    let artists = items
        .iter()
        .map(|item| serde_json::to_string(&item.artists))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut tx = pool.begin().await?;
    let mut written = 0;

    for (chunk, artists) in items.chunks(INSERT_CHUNK).zip(artists.chunks(INSERT_CHUNK)) {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "INSERT INTO session_items (id, session_id, blend_id, pool_id, track_id, title, \
             artists_json, album, duration_ms, cover_url, position, played) ",
        );
        qb.push_values(chunk.iter().zip(artists), |mut row, (item, artists)| {
            row.push_bind(item.id.as_str().to_owned())
                .push_bind(item.session_id.as_str().to_owned())
                .push_bind(item.blend_id.as_str().to_owned())
                .push_bind(item.pool_id.as_str().to_owned())
                .push_bind(item.track_id.as_str().to_owned())
                .push_bind(item.title.clone())
                .push_bind(artists.clone())
                .push_bind(item.album.clone())
                .push_bind(i64::try_from(item.duration_ms).unwrap_or(i64::MAX))
                .push_bind(item.cover_url.clone())
                .push_bind(i64::from(item.position))
                .push_bind(i64::from(item.played));
        });

        written += qb.build().execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;

    tracing::debug!(count = written, "Inserted session items");
    Ok(written)
}

/// Find items matching a filter, in insertion order
pub async fn find(pool: &SqlitePool, filter: &SessionItemFilter) -> Result<Vec<SessionItem>> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
    push_filter(&mut qb, filter);
    qb.push(" ORDER BY rowid");

    let rows = qb.build().fetch_all(pool).await?;
    Ok(rows
        .iter()
        .map(from_row)
        .collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Count items matching a filter
pub async fn count(pool: &SqlitePool, filter: &SessionItemFilter) -> Result<u64> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS n FROM session_items WHERE 1 = 1");
    push_filter(&mut qb, filter);

    let row = qb.build().fetch_one(pool).await?;
    Ok(u64::try_from(row.get::<i64, _>("n")).unwrap_or(0))
}

/// Replace a stored item; returns false if it does not exist
pub async fn update(pool: &SqlitePool, item: &SessionItem) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE session_items
        SET title = ?, artists_json = ?, album = ?, duration_ms = ?,
            cover_url = ?, position = ?, played = ?
        WHERE id = ?
        "#,
    )
    .bind(&item.title)
    .bind(serde_json::to_string(&item.artists)?)
    .bind(&item.album)
    .bind(i64::try_from(item.duration_ms).unwrap_or(i64::MAX))
    .bind(&item.cover_url)
    .bind(i64::from(item.position))
    .bind(i64::from(item.played))
    .bind(item.id.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Set the played flag on every matching item
pub async fn set_played(
    pool: &SqlitePool,
    filter: &SessionItemFilter,
    patch: SessionItemPatch,
) -> Result<u64> {
    let mut qb = QueryBuilder::<Sqlite>::new("UPDATE session_items SET played = ");
    qb.push_bind(i64::from(patch.played));
    qb.push(" WHERE 1 = 1");
    push_filter(&mut qb, filter);

    let result = qb.build().execute(pool).await?;
    Ok(result.rows_affected())
}

/// Delete items matching a filter
pub async fn delete(pool: &SqlitePool, filter: &SessionItemFilter) -> Result<u64> {
    let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM session_items WHERE 1 = 1");
    push_filter(&mut qb, filter);

    let result = qb.build().execute(pool).await?;
    Ok(result.rows_affected())
}

/// [`Repository`] over the `session_items` table
#[derive(Debug, Clone)]
pub struct SessionItemRepository {
    pool: SqlitePool,
}

impl SessionItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository<SessionItem> for SessionItemRepository {
    async fn insert(&self, entity: &SessionItem) -> Result<()> {
        insert_many(&self.pool, std::slice::from_ref(entity)).await?;
        Ok(())
    }

    async fn insert_many(&self, entities: &[SessionItem]) -> Result<u64> {
        insert_many(&self.pool, entities).await
    }

    async fn find(&self, filter: &SessionItemFilter) -> Result<Vec<SessionItem>> {
        find(&self.pool, filter).await
    }

    async fn count(&self, filter: &SessionItemFilter) -> Result<u64> {
        count(&self.pool, filter).await
    }

    async fn update(&self, entity: &SessionItem) -> Result<bool> {
        update(&self.pool, entity).await
    }

    async fn update_many(
        &self,
        filter: &SessionItemFilter,
        patch: &SessionItemPatch,
    ) -> Result<u64> {
        set_played(&self.pool, filter, *patch).await
    }

    async fn delete(&self, filter: &SessionItemFilter) -> Result<u64> {
        delete(&self.pool, filter).await
    }
}
