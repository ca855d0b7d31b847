//! Entity store abstraction and the in-memory reference implementation.

mod error;
pub mod memory;
pub mod traits;

pub use error::{RepositoryError, Result};
pub use memory::InMemoryEntityStore;
pub use traits::{EntityStore, StoredHazard};
