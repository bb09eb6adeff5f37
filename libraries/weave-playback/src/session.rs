//! Session lifecycle on top of the storage context

use chrono::{DateTime, Utc};
use tracing::debug;
use weave_core::storage::{SessionFilter, SessionItemFilter, SessionItemPatch};
use weave_core::{PlaybackSession, Result, SessionId, StorageContext, UserId, WeaveError};

/// Owns creation, lookup, activity and teardown of playback sessions
pub struct SessionStore<'a> {
    storage: &'a dyn StorageContext,
}

impl<'a> SessionStore<'a> {
    pub fn new(storage: &'a dyn StorageContext) -> Self {
        Self { storage }
    }

    /// Persist a new session
    pub async fn create(&self, session: &PlaybackSession) -> Result<()> {
        self.storage.sessions().insert(session).await
    }

    /// Load a session by id
    pub async fn load(&self, id: &SessionId) -> Result<PlaybackSession> {
        self.storage
            .sessions()
            .find_one(&SessionFilter::by_id(id))
            .await?
            .ok_or_else(|| WeaveError::SessionNotFound(id.clone()))
    }

    /// Load a session owned by `owner_id`; someone else's session is reported as missing
    pub async fn load_owned(&self, id: &SessionId, owner_id: &UserId) -> Result<PlaybackSession> {
        let session = self.load(id).await?;
        if session.is_owned_by(owner_id) {
            Ok(session)
        } else {
            Err(WeaveError::SessionNotFound(id.clone()))
        }
    }

    /// Write every field of a session back
    pub async fn save(&self, session: &PlaybackSession) -> Result<()> {
        if self.storage.sessions().update(session).await? {
            Ok(())
        } else {
            Err(WeaveError::SessionNotFound(session.id.clone()))
        }
    }

    /// Record activity at `now` and persist
    pub async fn touch(&self, session: &mut PlaybackSession, now: DateTime<Utc>) -> Result<()> {
        session.touch(now);
        self.save(session).await
    }

    /// Flip every item of the session back to unplayed
    pub async fn clear_played(&self, id: &SessionId) -> Result<u64> {
        let cleared = self
            .storage
            .session_items()
            .update_many(&SessionItemFilter::session(id), &SessionItemPatch::UNPLAYED)
            .await?;
        debug!(session = %id, cleared, "Cleared played flags");
        Ok(cleared)
    }

    /// Remove every item of the session
    pub async fn purge_items(&self, id: &SessionId) -> Result<u64> {
        self.storage
            .session_items()
            .delete(&SessionItemFilter::session(id))
            .await
    }

    /// Remove the session and its items; returns false if it did not exist
    pub async fn destroy(&self, id: &SessionId) -> Result<bool> {
        self.purge_items(id).await?;
        let removed = self
            .storage
            .sessions()
            .delete(&SessionFilter::by_id(id))
            .await?;
        Ok(removed > 0)
    }
}
