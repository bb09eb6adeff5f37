//! Storage abstraction for Weave entities
//!
//! Persistence is reached through one generic [`Repository`] per entity type.
//! The only primitives the engine relies on are field-match queries (each
//! entity's `Filter`), bulk insert, and per-call atomic writes. No
//! cross-entity transactions are assumed.

use crate::error::Result;
use crate::types::{
    BlendDefinition, BlendId, PlaybackSession, PoolId, Sequence, SequenceId, SessionId,
    SessionItem, SessionItemId, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::convert::Infallible;

/// A persistable entity
pub trait Entity: Clone + Send + Sync + 'static {
    /// Human-readable entity kind (used in errors and logs)
    const KIND: &'static str;

    /// Field-match query; unset fields match everything
    type Filter: Send + Sync;

    /// Partial update applied by [`Repository::update_many`]
    type Patch: Send + Sync;
}

/// Generic repository over one entity type
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Insert one entity
    async fn insert(&self, entity: &E) -> Result<()>;

    /// Insert many entities; returns the number written
    async fn insert_many(&self, entities: &[E]) -> Result<u64>;

    /// All entities matching the filter
    async fn find(&self, filter: &E::Filter) -> Result<Vec<E>>;

    /// First entity matching the filter
    async fn find_one(&self, filter: &E::Filter) -> Result<Option<E>> {
        Ok(self.find(filter).await?.into_iter().next())
    }

    /// Number of entities matching the filter
    async fn count(&self, filter: &E::Filter) -> Result<u64> {
        Ok(self.find(filter).await?.len() as u64)
    }

    /// Replace a stored entity by identity; returns false if it did not exist
    async fn update(&self, entity: &E) -> Result<bool>;

    /// Apply a patch to every matching entity; returns the number touched
    async fn update_many(&self, filter: &E::Filter, patch: &E::Patch) -> Result<u64>;

    /// Delete every matching entity; returns the number removed
    async fn delete(&self, filter: &E::Filter) -> Result<u64>;
}

/// Access to every repository the engine needs
pub trait StorageContext: Send + Sync {
    /// Blend definitions
    fn definitions(&self) -> &dyn Repository<BlendDefinition>;

    /// Sequences
    fn sequences(&self) -> &dyn Repository<Sequence>;

    /// Playback sessions
    fn sessions(&self) -> &dyn Repository<PlaybackSession>;

    /// Session-scoped item copies
    fn session_items(&self) -> &dyn Repository<SessionItem>;
}

// ============================================================================
// Filters and patches
// ============================================================================

/// Query for blend definitions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionFilter {
    pub id: Option<BlendId>,
    pub owner_id: Option<UserId>,
}

impl DefinitionFilter {
    /// Match one definition by id
    pub fn by_id(id: &BlendId) -> Self {
        Self {
            id: Some(id.clone()),
            ..Self::default()
        }
    }

    /// Match every definition of an owner
    pub fn by_owner(owner_id: &UserId) -> Self {
        Self {
            owner_id: Some(owner_id.clone()),
            ..Self::default()
        }
    }

    /// Narrow to one owner
    #[must_use]
    pub fn owned_by(mut self, owner_id: &UserId) -> Self {
        self.owner_id = Some(owner_id.clone());
        self
    }
}

/// Query for sequences
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceFilter {
    pub id: Option<SequenceId>,
    pub owner_id: Option<UserId>,
}

impl SequenceFilter {
    /// Match one sequence by id
    pub fn by_id(id: &SequenceId) -> Self {
        Self {
            id: Some(id.clone()),
            ..Self::default()
        }
    }

    /// Match every sequence of an owner
    pub fn by_owner(owner_id: &UserId) -> Self {
        Self {
            owner_id: Some(owner_id.clone()),
            ..Self::default()
        }
    }

    /// Narrow to one owner
    #[must_use]
    pub fn owned_by(mut self, owner_id: &UserId) -> Self {
        self.owner_id = Some(owner_id.clone());
        self
    }
}

/// Query for playback sessions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFilter {
    pub id: Option<SessionId>,
    pub owner_id: Option<UserId>,
    pub blend_id: Option<BlendId>,
    pub sequence_id: Option<SequenceId>,

    /// Only sessions whose last activity is strictly older than this
    pub idle_since: Option<DateTime<Utc>>,
}

impl SessionFilter {
    /// Match one session by id
    pub fn by_id(id: &SessionId) -> Self {
        Self {
            id: Some(id.clone()),
            ..Self::default()
        }
    }

    /// Match every session of an owner
    pub fn by_owner(owner_id: &UserId) -> Self {
        Self {
            owner_id: Some(owner_id.clone()),
            ..Self::default()
        }
    }

    /// Match sessions inactive since `cutoff`
    pub fn idle_since(cutoff: DateTime<Utc>) -> Self {
        Self {
            idle_since: Some(cutoff),
            ..Self::default()
        }
    }
}

/// Query for session items
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionItemFilter {
    pub id: Option<SessionItemId>,
    pub session_id: Option<SessionId>,
    pub pool_id: Option<PoolId>,
    pub played: Option<bool>,
}

impl SessionItemFilter {
    /// Match one item by id
    pub fn by_id(id: &SessionItemId) -> Self {
        Self {
            id: Some(id.clone()),
            ..Self::default()
        }
    }

    /// Match every item of a session
    pub fn session(session_id: &SessionId) -> Self {
        Self {
            session_id: Some(session_id.clone()),
            ..Self::default()
        }
    }

    /// Narrow to one pool
    #[must_use]
    pub fn pool(mut self, pool_id: &PoolId) -> Self {
        self.pool_id = Some(pool_id.clone());
        self
    }

    /// Narrow to unplayed items
    #[must_use]
    pub fn unplayed(mut self) -> Self {
        self.played = Some(false);
        self
    }

    /// Narrow to played items
    #[must_use]
    pub fn played(mut self) -> Self {
        self.played = Some(true);
        self
    }
}

/// Bulk change to session items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionItemPatch {
    pub played: bool,
}

impl SessionItemPatch {
    /// Flip to played
    pub const PLAYED: Self = Self { played: true };

    /// Flip back to unplayed
    pub const UNPLAYED: Self = Self { played: false };
}

impl Entity for BlendDefinition {
    const KIND: &'static str = "blend definition";
    type Filter = DefinitionFilter;
    type Patch = Infallible;
}

impl Entity for Sequence {
    const KIND: &'static str = "sequence";
    type Filter = SequenceFilter;
    type Patch = Infallible;
}

impl Entity for PlaybackSession {
    const KIND: &'static str = "session";
    type Filter = SessionFilter;
    type Patch = Infallible;
}

impl Entity for SessionItem {
    const KIND: &'static str = "session item";
    type Filter = SessionItemFilter;
    type Patch = SessionItemPatch;
}
