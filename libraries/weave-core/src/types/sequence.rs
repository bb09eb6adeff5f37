/// Sequence domain types
use crate::error::{Result, WeaveError};
use crate::types::{BlendId, SequenceId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest time budget a single stage may have (one day)
pub const MAX_STAGE_MINUTES: u32 = 1440;

/// One blend played as part of a sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceStage {
    pub blend_id: BlendId,

    /// Time budget in minutes; `None` only for the final stage
    #[serde(default)]
    pub time_limit_minutes: Option<u32>,
}

impl SequenceStage {
    pub fn new(blend_id: BlendId, time_limit_minutes: Option<u32>) -> Self {
        Self {
            blend_id,
            time_limit_minutes,
        }
    }
}

/// Ordered chain of blends with per-stage time budgets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sequence {
    pub id: SequenceId,
    pub owner_id: UserId,
    pub name: String,
    pub stages: Vec<SequenceStage>,
    pub created_at: DateTime<Utc>,
}

impl Sequence {
    /// Number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// True if the sequence has no stages
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage at `index`, if any
    pub fn stage(&self, index: usize) -> Option<&SequenceStage> {
        self.stages.get(index)
    }

    /// True if `index` is the last stage
    pub fn is_final(&self, index: usize) -> bool {
        index + 1 >= self.stages.len()
    }

    /// Effective time limit of a stage (always `None` for the final stage)
    pub fn limit_for(&self, index: usize) -> Option<u32> {
        if self.is_final(index) {
            return None;
        }
        self.stage(index).and_then(|s| s.time_limit_minutes)
    }

    /// Check stage count and time budgets
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(WeaveError::invalid_input("sequence name cannot be empty"));
        }
        if self.stages.is_empty() {
            return Err(WeaveError::invalid_input(
                "sequence must contain at least one stage",
            ));
        }

        for (index, stage) in self.stages.iter().enumerate() {
            if self.is_final(index) {
                if stage.time_limit_minutes.is_some() {
                    return Err(WeaveError::invalid_input(
                        "final stage cannot have a time limit",
                    ));
                }
                continue;
            }
            match stage.time_limit_minutes {
                Some(limit) if (1..=MAX_STAGE_MINUTES).contains(&limit) => {}
                Some(limit) => {
                    return Err(WeaveError::invalid_input(format!(
                        "stage {index} time limit must be 1-{MAX_STAGE_MINUTES} minutes, got {limit}"
                    )))
                }
                None => {
                    return Err(WeaveError::invalid_input(format!(
                        "stage {index} needs a time limit (only the final stage may omit it)"
                    )))
                }
            }
        }

        Ok(())
    }
}

/// Input for creating a sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSequence {
    pub name: String,
    pub stages: Vec<SequenceStage>,
}

impl CreateSequence {
    /// Turn the draft into a validated sequence
    ///
    /// A limit given for the final stage is dropped: the final stage always
    /// runs until its own exhaustion rules end it.
    pub fn into_sequence(self, owner_id: UserId, now: DateTime<Utc>) -> Result<Sequence> {
        let mut stages = self.stages;
        if let Some(last) = stages.last_mut() {
            last.time_limit_minutes = None;
        }

        let sequence = Sequence {
            id: SequenceId::generate(),
            owner_id,
            name: self.name,
            stages,
            created_at: now,
        };
        sequence.validate()?;
        Ok(sequence)
    }
}

impl Sequence {
    /// Replace name and stages with the draft's, keeping identity, owner and
    /// creation time
    pub fn apply_draft(&mut self, draft: CreateSequence) -> Result<()> {
        let mut updated = draft.into_sequence(self.owner_id.clone(), self.created_at)?;
        updated.id = self.id.clone();
        *self = updated;
        Ok(())
    }
}
