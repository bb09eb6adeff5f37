//! Weave Storage
//!
//! `SQLite` persistence for blend definitions, sequences, playback sessions
//! and their session-scoped item copies.
//!
//! # Architecture
//!
//! - **Vertical Slicing**: Each entity owns its own queries and row mapping
//! - **Generic repositories**: Every slice exposes a
//!   [`Repository`](weave_core::storage::Repository) implementation so the
//!   engine never sees SQL
//! - **Per-call atomicity**: Bulk writes run inside one transaction; nothing
//!   spans entities
//!
//! # Example
//!
//! ```rust,no_run
//! use weave_storage::{SqliteStorageContext, create_pool, run_migrations};
//! use weave_core::storage::{DefinitionFilter, StorageContext};
//! use weave_core::UserId;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool("sqlite://weave.db").await?;
//! run_migrations(&pool).await?;
//!
//! let storage = SqliteStorageContext::new(pool);
//! let mine = storage
//!     .definitions()
//!     .find(&DefinitionFilter::by_owner(&UserId::new("alice")))
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod context;
mod error;
mod timestamps;

// Vertical slices
pub mod definitions;
pub mod sequences;
pub mod session_items;
pub mod sessions;

pub use context::SqliteStorageContext;
pub use error::StorageError;

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// This should be called once when the application starts to ensure
/// the database schema is up to date.
///
/// # Errors
///
/// Returns an error if migrations fail to run
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `<sqlite://weave.db>`)
///
/// # Errors
///
/// Returns an error if the connection fails
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    create_pool_with(database_url, 5).await
}

/// Create a new `SQLite` pool with an explicit connection cap
///
/// # Errors
///
/// Returns an error if the connection fails
pub async fn create_pool_with(
    database_url: &str,
    max_connections: u32,
) -> Result<SqlitePool, sqlx::Error> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    tracing::debug!(url = %database_url, max_connections, "Creating SQLite pool");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(options)
        .await?;

    tracing::info!(url = %database_url, "SQLite pool ready");

    Ok(pool)
}
