//! Event types for different topics.

use serde::{Deserialize, Serialize};
use status_core::{ActorId, DamageResult, EntityId, StageTransition};

/// Events related to hazard progression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HazardEvent {
    /// A hazard's persisted stage changed and the stage was re-applied.
    StageChanged {
        actor: ActorId,
        hazard: EntityId,
        transition: StageTransition,
        stage: u32,
    },

    /// A hazard regressed below stage 1 and was deleted.
    Removed { actor: ActorId, hazard: EntityId },
}

/// Events related to damage the engine evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageEvent {
    /// Stage damage was evaluated; applying it is up to the host.
    StageDamage {
        actor: ActorId,
        hazard: EntityId,
        stage: u32,
        formula: String,
        result: DamageResult,
    },
}
