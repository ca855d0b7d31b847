//! Public runtime API surface.
//!
//! Gathers the error types and collaborator traits exposed to hosts so the
//! engine and adapters can stay focused on orchestration.

pub mod errors;
pub mod providers;

pub use errors::{Result, RuntimeError, ServiceError};
pub use providers::{DamageEvaluator, SavingThrowService};
