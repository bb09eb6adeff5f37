use crate::definitions::DefinitionRepository;
use crate::sequences::SequenceRepository;
use crate::session_items::SessionItemRepository;
use crate::sessions::SessionRepository;
use sqlx::SqlitePool;
use weave_core::storage::{Repository, StorageContext};
use weave_core::types::{BlendDefinition, PlaybackSession, Sequence, SessionItem};

/// Storage context backed by one `SQLite` pool
#[derive(Clone)]
pub struct SqliteStorageContext {
    pool: SqlitePool,
    definitions: DefinitionRepository,
    sequences: SequenceRepository,
    sessions: SessionRepository,
    session_items: SessionItemRepository,
}

impl SqliteStorageContext {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            definitions: DefinitionRepository::new(pool.clone()),
            sequences: SequenceRepository::new(pool.clone()),
            sessions: SessionRepository::new(pool.clone()),
            session_items: SessionItemRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl StorageContext for SqliteStorageContext {
    fn definitions(&self) -> &dyn Repository<BlendDefinition> {
        &self.definitions
    }

    fn sequences(&self) -> &dyn Repository<Sequence> {
        &self.sequences
    }

    fn sessions(&self) -> &dyn Repository<PlaybackSession> {
        &self.sessions
    }

    fn session_items(&self) -> &dyn Repository<SessionItem> {
        &self.session_items
    }
}
