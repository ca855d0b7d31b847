//! Shared data model: status markers and hazards owned by a character.
//!
//! Stores hold these records; the resolver and the stage planner read them and
//! never mutate stored fields except through the transitions defined here.
pub mod common;
pub mod hazard;
pub mod marker;

pub use common::{ActorId, EntityId, WorldTime};
pub use hazard::{
    ConditionEntry, DamageCategory, DamageEntry, Hazard, HazardPhase, Onset, StageDefinition,
    StageDirection, StageTransition,
};
pub use marker::{GrantRecord, MarkerDraft, MarkerUpdate, PersistentInfo, StatusMarker};
