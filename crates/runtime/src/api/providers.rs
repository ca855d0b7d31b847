//! Asynchronous abstractions for the collaborators the stage engine calls out to.
//!
//! Hosts plug in [`DamageEvaluator`] and [`SavingThrowService`]
//! implementations so stage damage and recovery saves can come from a real
//! dice roller, a fixed table, or a test double.
use async_trait::async_trait;
use status_core::{
    ActorId, CompositeDamage, DamageResult, DegreeOfSuccess, FormulaError, SaveType,
};

use super::errors::ServiceError;

/// Evaluates a composite damage formula.
///
/// Failures are reported, never raised past the engine: a stage whose damage
/// cannot be evaluated still applies its markers.
#[async_trait]
pub trait DamageEvaluator: Send + Sync {
    async fn evaluate(&self, damage: &CompositeDamage) -> Result<DamageResult, FormulaError>;
}

/// Rolls a saving throw for a character.
#[async_trait]
pub trait SavingThrowService: Send + Sync {
    /// Roll `save` against `dc` for `actor` and report the degree of success.
    async fn roll(
        &self,
        actor: ActorId,
        save: SaveType,
        dc: u32,
    ) -> Result<DegreeOfSuccess, ServiceError>;
}
