//! Reference collaborator implementations.
//!
//! Hosts with their own dice and damage pipeline implement the traits in
//! [`crate::api`] directly; these cover local runs and tests.

mod damage;
mod saves;

pub use damage::AverageDamageEvaluator;
pub use saves::{D20SavingThrow, FixedSavingThrow};
