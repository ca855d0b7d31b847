//! Deterministic status-effect rules shared by the runtime and content tools.
//!
//! `status-core` owns the data model (status markers, hazards), the read-only
//! condition catalog, the override resolver that decides which markers are in
//! force, and the pure parts of hazard progression: the stage state machine
//! and the marker plan for a stage. Nothing here performs I/O; the async
//! orchestration against an entity store lives in `status-runtime`.
pub mod catalog;
pub mod check;
pub mod config;
pub mod damage;
pub mod error;
pub mod resolver;
pub mod stage;
pub mod state;

pub use catalog::{CatalogError, ConditionCatalog, ConditionType};
pub use check::{DegreeOfSuccess, SaveType};
pub use config::EngineConfig;
pub use damage::{
    CompositeDamage, DamageGroup, DamageResult, FormulaError, compose, expected_value,
};
pub use error::{ErrorSeverity, StatusError};
pub use resolver::{OverrideResolver, resolve_overrides};
pub use stage::{HazardOutcome, HazardStage, StagePlan};
pub use state::{
    ActorId, ConditionEntry, DamageCategory, DamageEntry, EntityId, GrantRecord, Hazard,
    HazardPhase, MarkerDraft, MarkerUpdate, Onset, PersistentInfo, StageDefinition,
    StageDirection, StageTransition, StatusMarker, WorldTime,
};
