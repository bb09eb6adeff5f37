//! Weave Core
//!
//! Platform-agnostic domain types, traits, and error handling for Weave.
//!
//! This crate provides the foundational building blocks shared by the storage
//! backend, the content provider client and the playback engine.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `BlendDefinition`, `Sequence`, `PlaybackSession`, `SessionItem`
//! - **Core Traits**: `ContentProvider`, `Clock`, `Repository`, `StorageContext`
//! - **Error Handling**: Unified `WeaveError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use weave_core::types::{CreateBlendDefinition, PoolId, PoolWeight, UserId};
//!
//! let draft = CreateBlendDefinition::new(
//!     "Morning mix",
//!     vec![
//!         PoolWeight::new(PoolId::new("focus"), 70.0),
//!         PoolWeight::new(PoolId::new("upbeat"), 30.0),
//!     ],
//! );
//!
//! let definition = draft
//!     .into_definition(UserId::new("alice"), chrono::Utc::now())
//!     .unwrap();
//! assert_eq!(definition.pools.len(), 2);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod error;
pub mod storage;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, WeaveError};
pub use storage::{Entity, Repository, StorageContext};
pub use traits::ContentProvider;

pub use types::{
    BlendDefinition, BlendId, CreateBlendDefinition, CreateSequence, DrawnItem, PlaybackOrder,
    PlaybackSession, PoolId, PoolWeight, ProviderItem, RepeatMode, ScheduledReweight, Sequence,
    SequenceId, SequenceLink, SequenceStage, SessionId, SessionItem, SessionItemId, SessionTrack,
    StageTransition, TrackId, UserId,
};
