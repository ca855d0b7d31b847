//! Command implementations for statusctl
//!
//! Each command is a separate module that implements its own CLI args and execution logic.

mod catalog;
mod run;

pub use catalog::Catalog;
pub use run::Run;
