//! Error types raised by entity store implementations.

use status_core::{ActorId, EntityId};
use thiserror::Error;

/// Errors surfaced by entity store implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("entity store lock was poisoned")]
    LockPoisoned,

    #[error("actor {0} is not known to the store")]
    ActorNotFound(ActorId),

    #[error("actor {0} already exists")]
    ActorExists(ActorId),

    #[error("marker {marker} not found on {actor}")]
    MarkerNotFound { actor: ActorId, marker: EntityId },

    #[error("hazard {0} not found")]
    HazardNotFound(EntityId),

    #[error("store rejected the change: {0}")]
    Rejected(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
