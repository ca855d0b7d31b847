//! Stage bookkeeping shared by the async stage engine and offline tools.
pub mod plan;

pub use plan::StagePlan;

use crate::damage::DamageResult;
use crate::state::EntityId;

/// Where a hazard ended up after a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HazardStage {
    Stage(u32),
    Removed,
}

/// Outcome reported to the host for `advance_hazard` / `recover_hazard`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HazardOutcome {
    pub hazard: EntityId,
    pub new_stage: HazardStage,
    /// Stage damage, when it was evaluated during this transition.
    pub damage: Option<DamageResult>,
}

impl HazardOutcome {
    pub fn stage(hazard: EntityId, stage: u32) -> Self {
        Self {
            hazard,
            new_stage: HazardStage::Stage(stage),
            damage: None,
        }
    }

    pub fn removed(hazard: EntityId) -> Self {
        Self {
            hazard,
            new_stage: HazardStage::Removed,
            damage: None,
        }
    }

    pub fn is_removed(&self) -> bool {
        self.new_stage == HazardStage::Removed
    }
}
