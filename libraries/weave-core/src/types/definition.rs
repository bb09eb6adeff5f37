/// Blend definition domain types
use crate::error::{Result, WeaveError};
use crate::types::{BlendId, PoolId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Allowed distance between a weight total and 100
pub const WEIGHT_TOLERANCE: f64 = 0.01;

/// Upper bound for crossfade between two items
pub const MAX_CROSSFADE_SECONDS: u8 = 15;

/// Order in which items are taken from within a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackOrder {
    /// First unplayed item in the pool's original order
    #[default]
    Sequential,
    /// Uniform random pick among the pool's unplayed items
    Shuffle,
}

impl PlaybackOrder {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Shuffle => "shuffle",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sequential" => Some(Self::Sequential),
            "shuffle" => Some(Self::Shuffle),
            _ => None,
        }
    }
}

/// Repeat mode for a blend
///
/// Only `All` changes draw behaviour; `One` is honoured by whoever drives
/// playback continuation and is a plain "stop on exhaustion" to the selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepeatMode {
    /// Stop once every pool is exhausted
    #[default]
    None,
    /// Restart the whole blend once every pool is exhausted
    #[serde(rename = "repeat-all")]
    All,
    /// Repeat the current item (playback layer concern)
    #[serde(rename = "repeat-one")]
    One,
}

impl RepeatMode {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::All => "repeat-all",
            Self::One => "repeat-one",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Self::None),
            "repeat-all" => Some(Self::All),
            "repeat-one" => Some(Self::One),
            _ => None,
        }
    }
}

impl std::fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One source pool and its share of the blend, in percent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolWeight {
    pub pool_id: PoolId,
    pub weight: f64,
}

impl PoolWeight {
    pub fn new(pool_id: PoolId, weight: f64) -> Self {
        Self { pool_id, weight }
    }
}

/// A timed replacement of the blend's weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReweight {
    /// Whole minutes of session time after which the rule becomes due
    pub after_minutes: u32,
    pub new_weights: Vec<PoolWeight>,
}

/// User-authored blend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlendDefinition {
    pub id: BlendId,
    pub owner_id: UserId,
    pub name: String,

    /// Active weights, in definition order
    pub pools: Vec<PoolWeight>,

    /// Sorted ascending by `after_minutes`
    #[serde(default)]
    pub scheduled_reweights: Vec<ScheduledReweight>,

    #[serde(default)]
    pub playback_order: PlaybackOrder,

    #[serde(default)]
    pub repeat_mode: RepeatMode,

    #[serde(default)]
    pub single_pool_lock: bool,

    #[serde(default)]
    pub crossfade_seconds: u8,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlendDefinition {
    /// Check every invariant a stored definition must hold
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(WeaveError::invalid_input("blend name cannot be empty"));
        }
        if self.crossfade_seconds > MAX_CROSSFADE_SECONDS {
            return Err(WeaveError::invalid_input(format!(
                "crossfade must be between 0 and {MAX_CROSSFADE_SECONDS} seconds, got {}",
                self.crossfade_seconds
            )));
        }

        validate_weights(&self.pools)?;

        for rule in &self.scheduled_reweights {
            if rule.after_minutes == 0 {
                return Err(WeaveError::invalid_input(
                    "scheduled reweight must trigger after at least one minute",
                ));
            }
            validate_weights(&rule.new_weights).map_err(|e| match e {
                WeaveError::InvalidWeights(msg) => WeaveError::invalid_weights(format!(
                    "scheduled reweight after {} min: {msg}",
                    rule.after_minutes
                )),
                other => other,
            })?;
        }

        if self
            .scheduled_reweights
            .windows(2)
            .any(|w| w[0].after_minutes > w[1].after_minutes)
        {
            return Err(WeaveError::invalid_input(
                "scheduled reweights must be sorted by trigger time",
            ));
        }

        Ok(())
    }

    /// Replace every user-editable field with the draft's, keeping identity,
    /// owner and creation time
    pub fn apply_draft(&mut self, draft: CreateBlendDefinition, now: DateTime<Utc>) -> Result<()> {
        let mut updated = draft.into_definition(self.owner_id.clone(), now)?;
        updated.id = self.id.clone();
        updated.created_at = self.created_at;
        *self = updated;
        Ok(())
    }

    /// Look up the configured weight of a pool
    pub fn weight_of(&self, pool_id: &PoolId) -> Option<f64> {
        self.pools
            .iter()
            .find(|p| &p.pool_id == pool_id)
            .map(|p| p.weight)
    }

    /// True if the pool is part of this blend
    pub fn contains_pool(&self, pool_id: &PoolId) -> bool {
        self.pools.iter().any(|p| &p.pool_id == pool_id)
    }
}

/// Input for creating a blend definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlendDefinition {
    pub name: String,
    pub pools: Vec<PoolWeight>,
    #[serde(default)]
    pub scheduled_reweights: Vec<ScheduledReweight>,
    #[serde(default)]
    pub playback_order: PlaybackOrder,
    #[serde(default)]
    pub repeat_mode: RepeatMode,
    #[serde(default)]
    pub single_pool_lock: bool,
    #[serde(default)]
    pub crossfade_seconds: u8,
}

impl CreateBlendDefinition {
    /// Draft with default modes and no schedule
    pub fn new(name: impl Into<String>, pools: Vec<PoolWeight>) -> Self {
        Self {
            name: name.into(),
            pools,
            scheduled_reweights: Vec::new(),
            playback_order: PlaybackOrder::default(),
            repeat_mode: RepeatMode::default(),
            single_pool_lock: false,
            crossfade_seconds: 0,
        }
    }

    /// Turn the draft into a validated definition owned by `owner_id`
    ///
    /// Scheduled reweights are sorted by trigger time before validation.
    pub fn into_definition(self, owner_id: UserId, now: DateTime<Utc>) -> Result<BlendDefinition> {
        let mut scheduled_reweights = self.scheduled_reweights;
        scheduled_reweights.sort_by_key(|r| r.after_minutes);

        let definition = BlendDefinition {
            id: BlendId::generate(),
            owner_id,
            name: self.name,
            pools: self.pools,
            scheduled_reweights,
            playback_order: self.playback_order,
            repeat_mode: self.repeat_mode,
            single_pool_lock: self.single_pool_lock,
            crossfade_seconds: self.crossfade_seconds,
            created_at: now,
            updated_at: now,
        };
        definition.validate()?;
        Ok(definition)
    }
}

/// Validate one weight distribution
///
/// Weights must be finite, within 0-100, name each pool once and sum to 100
/// within [`WEIGHT_TOLERANCE`].
pub fn validate_weights(weights: &[PoolWeight]) -> Result<()> {
    if weights.is_empty() {
        return Err(WeaveError::invalid_weights("at least one pool is required"));
    }

    let mut seen = HashSet::with_capacity(weights.len());
    for w in weights {
        if !w.weight.is_finite() || !(0.0..=100.0).contains(&w.weight) {
            return Err(WeaveError::invalid_weights(format!(
                "weight for pool {} must be between 0 and 100, got {}",
                w.pool_id, w.weight
            )));
        }
        if !seen.insert(&w.pool_id) {
            return Err(WeaveError::invalid_weights(format!(
                "pool {} listed more than once",
                w.pool_id
            )));
        }
    }

    let total: f64 = weights.iter().map(|w| w.weight).sum();
    if (total - 100.0).abs() > WEIGHT_TOLERANCE {
        return Err(WeaveError::invalid_weights(format!(
            "weights must sum to 100%, got {total}"
        )));
    }

    Ok(())
}
