//! What to do when no unplayed item remains in any eligible pool

use weave_core::RepeatMode;

/// Draw state as seen by the exhaustion policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawState {
    HasCandidates,
    Exhausted,
}

/// Resolution of an exhausted draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Clear every played flag in the session and draw again
    ResetAndRetry,
    /// Report `Exhausted` to the caller
    Surface,
}

/// Decide how to continue after a draw attempt.
///
/// `retries` is the number of resets already performed for this draw. A
/// repeat-all blend gets exactly one; exhausting again right after a reset
/// means the session holds no items at all.
pub fn resolve(state: DrawState, repeat: RepeatMode, retries: u32) -> Option<Resolution> {
    match state {
        DrawState::HasCandidates => None,
        DrawState::Exhausted => match repeat {
            RepeatMode::All if retries == 0 => Some(Resolution::ResetAndRetry),
            RepeatMode::All | RepeatMode::None | RepeatMode::One => Some(Resolution::Surface),
        },
    }
}
