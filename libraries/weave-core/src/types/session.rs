/// Playback session types
use crate::types::{BlendId, PoolId, PoolWeight, SequenceId, SessionId, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Where a sequence session stands with respect to its next stage cut
///
/// ```text
///  Playing ──switch(deferred)──▶ PendingAdvance ──one more draw──▶ Advancing ──cut──▶ Playing
///     │                                                                ▲
///     └──────────────── time limit / early exhaustion ─────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StageTransition {
    /// Drawing from the current stage
    #[default]
    Playing,

    /// A deferred switch was requested; the item already lined up from the
    /// current stage still plays before the cut
    PendingAdvance { target: usize },

    /// The boundary has been reached; the next call performs the cut.
    /// Also persisted while a cut is in flight so an interrupted one resumes.
    Advancing { target: usize },
}

impl StageTransition {
    /// Convert to the stored tag
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Playing => "playing",
            Self::PendingAdvance { .. } => "pending_advance",
            Self::Advancing { .. } => "advancing",
        }
    }

    /// Stage the transition is heading to, if any
    #[must_use]
    pub fn target(&self) -> Option<usize> {
        match self {
            Self::Playing => None,
            Self::PendingAdvance { target } | Self::Advancing { target } => Some(*target),
        }
    }

    /// Rebuild from the stored tag and target column
    #[must_use]
    pub fn from_parts(tag: &str, target: Option<usize>) -> Option<Self> {
        match (tag, target) {
            ("playing", _) => Some(Self::Playing),
            ("pending_advance", Some(target)) => Some(Self::PendingAdvance { target }),
            ("advancing", Some(target)) => Some(Self::Advancing { target }),
            _ => None,
        }
    }
}

/// Sequence linkage of a session that plays one stage of a sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceLink {
    pub sequence_id: SequenceId,
    pub stage_index: usize,

    /// `None` on the final stage
    pub stage_time_limit_minutes: Option<u32>,

    #[serde(default)]
    pub transition: StageTransition,
}

/// Runtime instance of a blend being played
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSession {
    pub id: SessionId,
    pub blend_id: BlendId,
    pub owner_id: UserId,

    /// Start of the current blend (reset on every stage cut)
    pub start_time: DateTime<Utc>,
    pub last_activity_time: DateTime<Utc>,

    /// Pool the session is locked to in single-pool-lock mode
    pub current_pool_id: Option<PoolId>,

    /// Session-local weights written by the snapshot reweight scope
    #[serde(default)]
    pub weight_snapshot: Option<Vec<PoolWeight>>,

    #[serde(default)]
    pub sequence: Option<SequenceLink>,
}

impl PlaybackSession {
    /// Create a fresh session for a blend
    pub fn new(blend_id: BlendId, owner_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::generate(),
            blend_id,
            owner_id,
            start_time: now,
            last_activity_time: now,
            current_pool_id: None,
            weight_snapshot: None,
            sequence: None,
        }
    }

    /// Time since the current blend started
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        now - self.start_time
    }

    /// Record activity
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity_time = now;
    }

    /// Stage index when the session belongs to a sequence
    pub fn stage_index(&self) -> Option<usize> {
        self.sequence.as_ref().map(|s| s.stage_index)
    }

    /// True if the session is owned by `owner_id`
    pub fn is_owned_by(&self, owner_id: &UserId) -> bool {
        &self.owner_id == owner_id
    }
}
