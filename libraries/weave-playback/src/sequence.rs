//! Stage planning for sequence sessions
//!
//! Decides, before each draw, whether the session keeps playing its current
//! stage or cuts over to another one. The engine carries the decision out.

use chrono::Duration;
use weave_core::{SequenceLink, StageTransition};

/// What the next sequence call must do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStep {
    /// Draw from the current stage
    Draw,

    /// Draw one more item from the current stage, then arm the cut
    DrawThenArm { target: usize },

    /// Cut to `target` before drawing
    Cut { target: usize },
}

/// Plan the next call for a session playing stage `link.stage_index` of a
/// sequence with `stage_count` stages.
pub fn plan(link: &SequenceLink, stage_count: usize, elapsed: Duration) -> StageStep {
    let fallback_target = link.stage_index + 1;

    if let StageTransition::Advancing { target } = link.transition {
        return StageStep::Cut { target };
    }

    let is_final = link.stage_index + 1 >= stage_count;
    let limit_reached = !is_final
        && link
            .stage_time_limit_minutes
            .is_some_and(|limit| elapsed >= Duration::minutes(i64::from(limit)));

    if limit_reached {
        let target = link.transition.target().unwrap_or(fallback_target);
        return StageStep::Cut { target };
    }

    match link.transition {
        StageTransition::PendingAdvance { target } => StageStep::DrawThenArm { target },
        _ => StageStep::Draw,
    }
}

/// Stage to move to when the current one runs dry, if any
pub fn on_stage_exhausted(link: &SequenceLink, stage_count: usize) -> Option<usize> {
    if let Some(target) = link.transition.target() {
        return Some(target);
    }
    let next = link.stage_index + 1;
    (next < stage_count).then_some(next)
}
