//! Session-scoped copies of every pool a blend can draw from

use tracing::{debug, info};
use weave_core::{
    BlendDefinition, ContentProvider, PoolId, Result, SessionId, SessionItem, StorageContext,
};

/// Every pool a definition can reach: active weights first, then pools only
/// named by scheduled reweights, each once.
pub fn reachable_pools(definition: &BlendDefinition) -> Vec<PoolId> {
    let mut pools: Vec<PoolId> = Vec::new();
    let named = definition
        .pools
        .iter()
        .chain(definition.scheduled_reweights.iter().flat_map(|r| &r.new_weights));

    for weight in named {
        if !pools.contains(&weight.pool_id) {
            pools.push(weight.pool_id.clone());
        }
    }
    pools
}

/// Fetch every pool's items and write them, unplayed, into the session.
///
/// All pools are fetched before anything is written, so a provider failure
/// leaves the session without items rather than half populated.
pub async fn materialize(
    provider: &dyn ContentProvider,
    storage: &dyn StorageContext,
    definition: &BlendDefinition,
    session_id: &SessionId,
) -> Result<u64> {
    let mut items = Vec::new();

    for pool_id in reachable_pools(definition) {
        let listing = provider.pool_items(&pool_id).await?;
        debug!(pool = %pool_id, count = listing.len(), "Fetched pool listing");

        items.extend(listing.into_iter().zip(0u32..).map(|(item, position)| {
            SessionItem::from_provider(
                item,
                position,
                pool_id.clone(),
                definition.id.clone(),
                session_id.clone(),
            )
        }));
    }

    let written = storage.session_items().insert_many(&items).await?;
    info!(session = %session_id, blend = %definition.id, items = written, "Materialized session");

    Ok(written)
}
