//! Weighted pool choice and in-pool item pick
//!
//! Both functions are pure: randomness comes in as an argument so the same
//! inputs always give the same answer.

use rand::Rng;
use weave_core::{PlaybackOrder, PoolId, PoolWeight, SessionItem};

/// One pool as seen by the selector
#[derive(Debug, Clone, PartialEq)]
pub struct PoolCandidate {
    pub pool_id: PoolId,
    pub weight: f64,
    pub unplayed: usize,
}

impl PoolCandidate {
    pub fn new(pool_id: PoolId, weight: f64, unplayed: usize) -> Self {
        Self {
            pool_id,
            weight,
            unplayed,
        }
    }
}

/// Build the candidate list for a draw.
///
/// Weighted pools come first, in definition order. Pools that still hold
/// unplayed items but carry no weight entry are appended with weight 0 so the
/// fallthrough can reach them.
pub fn candidates(weights: &[PoolWeight], unplayed: &[SessionItem]) -> Vec<PoolCandidate> {
    let count = |pool: &PoolId| unplayed.iter().filter(|i| &i.pool_id == pool).count();

    let mut out: Vec<PoolCandidate> = weights
        .iter()
        .map(|w| PoolCandidate::new(w.pool_id.clone(), w.weight, count(&w.pool_id)))
        .collect();

    for item in unplayed {
        if !out.iter().any(|c| c.pool_id == item.pool_id) {
            out.push(PoolCandidate::new(item.pool_id.clone(), 0.0, count(&item.pool_id)));
        }
    }

    out
}

/// Index of the pool that serves a draw, or `None` if every pool is empty.
///
/// `r` is a point in `[0, 100)`. Weights accumulate in order and the first
/// positively weighted pool whose running total reaches `r` is the target;
/// rounding slack at the top end lands on the last positively weighted pool.
/// An empty target falls through to the following pools, then wraps around
/// to the earlier ones.
pub fn choose_pool(candidates: &[PoolCandidate], r: f64) -> Option<usize> {
    if candidates.is_empty() {
        return None;
    }

    let mut cumulative = 0.0;
    let mut target = None;
    for (index, candidate) in candidates.iter().enumerate() {
        if candidate.weight <= 0.0 {
            continue;
        }
        cumulative += candidate.weight;
        target = Some(index);
        if cumulative >= r {
            break;
        }
    }

    let start = target.unwrap_or(0);
    (0..candidates.len())
        .map(|offset| (start + offset) % candidates.len())
        .find(|&index| candidates[index].unplayed > 0)
}

/// Index of the item to play from one pool's unplayed items.
///
/// Sequential takes the lowest stable position; shuffle picks uniformly.
pub fn pick_item<R: Rng + ?Sized>(
    items: &[&SessionItem],
    order: PlaybackOrder,
    rng: &mut R,
) -> Option<usize> {
    if items.is_empty() {
        return None;
    }

    match order {
        PlaybackOrder::Sequential => items
            .iter()
            .enumerate()
            .min_by_key(|(_, item)| item.position)
            .map(|(index, _)| index),
        PlaybackOrder::Shuffle => Some(rng.gen_range(0..items.len())),
    }
}
