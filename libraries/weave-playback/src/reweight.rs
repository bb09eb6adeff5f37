//! Scheduled reweight evaluation

use crate::config::ReweightScope;
use chrono::{DateTime, Duration, Utc};
use weave_core::types::validate_weights;
use weave_core::{BlendDefinition, PlaybackSession, PoolWeight, Result, ScheduledReweight};

/// What a due rule changed, so the caller knows what to persist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReweightOutcome {
    /// No rule is due, or the due rule's weights are already active
    Unchanged,
    /// The definition's active weights were replaced
    Definition { after_minutes: u32 },
    /// The session's weight snapshot was replaced
    Session { after_minutes: u32 },
}

/// The rule with the largest `after_minutes` not exceeding the elapsed whole minutes
pub fn due_rule(rules: &[ScheduledReweight], elapsed: Duration) -> Option<&ScheduledReweight> {
    let minutes = elapsed.num_minutes();
    rules
        .iter()
        .filter(|rule| i64::from(rule.after_minutes) <= minutes)
        .max_by_key(|rule| rule.after_minutes)
}

/// Weights a draw should use under `scope`
pub fn active_weights<'a>(
    definition: &'a BlendDefinition,
    session: &'a PlaybackSession,
    scope: ReweightScope,
) -> &'a [PoolWeight] {
    match (scope, &session.weight_snapshot) {
        (ReweightScope::SessionSnapshot, Some(snapshot)) => snapshot,
        _ => &definition.pools,
    }
}

/// Apply the due rule in memory.
///
/// A due rule whose weights do not form a valid distribution is rejected
/// with `InvalidWeights` and nothing is changed.
pub fn apply_due(
    definition: &mut BlendDefinition,
    session: &mut PlaybackSession,
    scope: ReweightScope,
    now: DateTime<Utc>,
) -> Result<ReweightOutcome> {
    let Some(rule) = due_rule(&definition.scheduled_reweights, session.elapsed(now)) else {
        return Ok(ReweightOutcome::Unchanged);
    };
    let after_minutes = rule.after_minutes;
    validate_weights(&rule.new_weights)?;

    match scope {
        ReweightScope::SharedDefinition => {
            if definition.pools == rule.new_weights {
                return Ok(ReweightOutcome::Unchanged);
            }
            definition.pools = rule.new_weights.clone();
            definition.updated_at = now;
            Ok(ReweightOutcome::Definition { after_minutes })
        }
        ReweightScope::SessionSnapshot => {
            if session.weight_snapshot.as_ref() == Some(&rule.new_weights) {
                return Ok(ReweightOutcome::Unchanged);
            }
            session.weight_snapshot = Some(rule.new_weights.clone());
            Ok(ReweightOutcome::Session { after_minutes })
        }
    }
}
