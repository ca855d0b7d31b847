//! Data-driven status content and loaders.
//!
//! This crate reads status content from data files:
//! - Engine tuning (TOML)
//! - Condition catalog (TOML)
//! - Hazard definitions: poisons, diseases, curses (RON)
//!
//! Content is consumed by the runtime when it builds a stage engine and never
//! appears in stored marker or hazard state beyond what it was used to create.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{
    CatalogLoader, ConfigLoader, ContentFactory, HazardLoader, HazardSpec, OnsetSpec,
};
