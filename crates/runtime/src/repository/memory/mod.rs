//! In-memory store implementations for tests and local runs.

mod entity;

pub use entity::InMemoryEntityStore;
