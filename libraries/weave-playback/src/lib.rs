//! Weave - Playback Session Engine
//!
//! Blends several ordered source pools into one stream of items, each pool
//! contributing in proportion to its weight.
//!
//! This crate provides:
//! - Per-session materialization of every pool's items
//! - Weighted selection without repetition (sequential or shuffled within a pool)
//! - Scheduled reweights keyed by elapsed session time
//! - Exhaustion and repeat-all handling
//! - Single-pool lock
//! - Sequences of blends with per-stage time budgets and deferred or immediate stage switches
//!
//! # Architecture
//!
//! `weave-playback` knows nothing about SQL or HTTP:
//! - Persistence goes through [`weave_core::StorageContext`]
//! - Pool listings and names come from a [`weave_core::ContentProvider`]
//! - Time comes from a [`weave_core::Clock`], so timers are evaluated lazily per call
//!
//! The decision logic ([`selector`], [`reweight`], [`exhaustion`],
//! [`sequence`]) is pure and unit tested on its own; [`WeaveEngine`] carries
//! the decisions out against storage.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use weave_core::{BlendId, ContentProvider, StorageContext, UserId};
//! use weave_playback::{EngineConfig, WeaveEngine};
//!
//! # async fn example(
//! #     storage: Arc<dyn StorageContext>,
//! #     provider: Arc<dyn ContentProvider>,
//! # ) -> weave_core::Result<()> {
//! let engine = WeaveEngine::new(storage, provider, EngineConfig::default());
//! let owner = UserId::new("alice");
//!
//! let started = engine.start_session(&BlendId::new("morning"), &owner).await?;
//! println!("Now playing {} from {}", started.item.item.title, started.item.pool_name);
//!
//! let next = engine.next_item(&started.session.id, &owner).await?;
//! println!("Up next: {}", next.item.title);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod exhaustion;
pub mod materializer;
pub mod pool_names;
pub mod reweight;
pub mod selector;
pub mod sequence;
pub mod session;

pub use config::{EngineConfig, ReweightScope};
pub use engine::{SessionStart, WeaveEngine};
pub use pool_names::PoolNameCache;
pub use session::SessionStore;
