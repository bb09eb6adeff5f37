//! Parsers for the compact argument forms used on the command line
//!
//! - pool weight: `POOL=WEIGHT` (e.g. `focus=70`)
//! - scheduled reweight: `MINUTES:POOL=WEIGHT,POOL=WEIGHT` (e.g. `10:focus=0,chill=100`)
//! - sequence stage: `BLEND[:MINUTES]` (e.g. `4f1c...:30`)

use crate::error::{CliError, Result};
use weave_core::{BlendId, PoolId, PoolWeight, ScheduledReweight, SequenceStage};

/// Parse `POOL=WEIGHT`
pub fn parse_pool_weight(input: &str) -> Result<PoolWeight> {
    let (pool, weight) = input
        .split_once('=')
        .ok_or_else(|| CliError::Argument(format!("expected POOL=WEIGHT, got '{input}'")))?;

    let pool = pool.trim();
    if pool.is_empty() {
        return Err(CliError::Argument(format!("missing pool id in '{input}'")));
    }

    let weight: f64 = weight
        .trim()
        .parse()
        .map_err(|_| CliError::Argument(format!("invalid weight in '{input}'")))?;

    Ok(PoolWeight::new(PoolId::new(pool), weight))
}

/// Parse `MINUTES:POOL=WEIGHT,POOL=WEIGHT`
pub fn parse_reweight(input: &str) -> Result<ScheduledReweight> {
    let (minutes, weights) = input.split_once(':').ok_or_else(|| {
        CliError::Argument(format!("expected MINUTES:POOL=WEIGHT,..., got '{input}'"))
    })?;

    let after_minutes: u32 = minutes
        .trim()
        .parse()
        .map_err(|_| CliError::Argument(format!("invalid minutes in '{input}'")))?;

    let new_weights = weights
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(parse_pool_weight)
        .collect::<Result<Vec<_>>>()?;

    Ok(ScheduledReweight {
        after_minutes,
        new_weights,
    })
}

/// Parse `BLEND[:MINUTES]`
pub fn parse_stage(input: &str) -> Result<SequenceStage> {
    match input.split_once(':') {
        Some((blend, minutes)) => {
            let minutes: u32 = minutes
                .trim()
                .parse()
                .map_err(|_| CliError::Argument(format!("invalid time limit in '{input}'")))?;
            Ok(SequenceStage::new(BlendId::new(blend.trim()), Some(minutes)))
        }
        None => Ok(SequenceStage::new(BlendId::new(input.trim()), None)),
    }
}
