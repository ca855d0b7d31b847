//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from the entity store and the injected collaborators so
//! hosts can bubble them up with consistent context.
use status_core::{ActorId, EntityId, ErrorSeverity, SaveType, StatusError};
use thiserror::Error;

pub use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("hazard {0} not found")]
    HazardNotFound(EntityId),

    #[error("entity store rejected {operation}")]
    StoreRejected {
        operation: &'static str,
        #[source]
        source: RepositoryError,
    },

    #[error("{save} saving throw for {actor} could not be rolled")]
    SavingThrow {
        actor: ActorId,
        save: SaveType,
        #[source]
        source: ServiceError,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("stage engine requires a {0} before building")]
    MissingCollaborator(&'static str),
}

impl RuntimeError {
    pub(crate) fn store(operation: &'static str) -> impl FnOnce(RepositoryError) -> Self {
        move |source| RuntimeError::StoreRejected { operation, source }
    }
}

impl StatusError for RuntimeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::HazardNotFound(_) | Self::SavingThrow { .. } => ErrorSeverity::Recoverable,
            Self::StoreRejected { .. } | Self::Repository(_) | Self::MissingCollaborator(_) => {
                ErrorSeverity::Internal
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::HazardNotFound(_) => "HAZARD_NOT_FOUND",
            Self::StoreRejected { .. } => "STORE_REJECTED",
            Self::SavingThrow { .. } => "SAVING_THROW_FAILED",
            Self::Repository(_) => "REPOSITORY",
            Self::MissingCollaborator(_) => "MISSING_COLLABORATOR",
        }
    }
}

/// Failure reported by an external collaborator such as a dice service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("service lock was poisoned")]
    LockPoisoned,
}
