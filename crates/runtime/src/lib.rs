//! Async orchestration for status effects and hazards.
//!
//! This crate wires the pure rules from `status-core` to an entity store and
//! the external collaborators (damage evaluation, saving throws). Hosts embed
//! [`StageEngine`] to advance or recover hazards and to resolve which status
//! markers are in force.
//!
//! Modules are organized by responsibility:
//! - [`engine`] hosts the stage engine and its builder
//! - [`api`] exposes the error types and collaborator traits hosts implement
//! - [`events`] provides a topic-based event bus for stage and damage outcomes
//! - [`repository`] and [`providers`] provide reference adapters for local runs
pub mod api;
pub mod engine;
pub mod events;
pub mod providers;
pub mod repository;

pub use api::{DamageEvaluator, Result, RuntimeError, SavingThrowService, ServiceError};
pub use engine::{RuntimeConfig, StageEngine, StageEngineBuilder};
pub use events::{DamageEvent, Event, EventBus, HazardEvent, Topic};
pub use providers::{AverageDamageEvaluator, D20SavingThrow, FixedSavingThrow};
pub use repository::{EntityStore, InMemoryEntityStore, RepositoryError, StoredHazard};
