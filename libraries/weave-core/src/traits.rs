/// Core traits for Weave
use crate::error::Result;
use crate::types::{PoolId, ProviderItem, TrackId};
use async_trait::async_trait;

/// External content provider (the catalog the pools live in)
///
/// Implementations report every failure as [`crate::WeaveError::UpstreamFetch`];
/// retrying is left to callers outside the engine.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Full ordered item list of a pool
    ///
    /// # Errors
    /// Returns an error if the provider is unreachable or rejects the request
    async fn pool_items(&self, pool_id: &PoolId) -> Result<Vec<ProviderItem>>;

    /// Display name of a pool
    ///
    /// # Errors
    /// Returns an error if the pool cannot be looked up
    async fn pool_name(&self, pool_id: &PoolId) -> Result<String>;

    /// Metadata of one item
    ///
    /// # Errors
    /// Returns an error if the item cannot be looked up
    async fn item(&self, track_id: &TrackId) -> Result<ProviderItem>;
}
