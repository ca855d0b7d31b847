//! Store contract for the per-character entities the engine reads and writes.

use async_trait::async_trait;
use status_core::{ActorId, EntityId, Hazard, MarkerDraft, MarkerUpdate, StatusMarker};

use super::error::Result;

/// A hazard together with the character that owns it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredHazard {
    pub actor: ActorId,
    pub hazard: Hazard,
}

/// Entity store holding status markers and hazards, keyed by character.
///
/// Each bulk call is all-or-nothing from the engine's point of view: if the
/// store returns an error, the engine abandons the remaining steps of the
/// change it was applying.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// All markers currently on the character.
    async fn list_markers(&self, actor: ActorId) -> Result<Vec<StatusMarker>>;

    /// Create markers and return their freshly minted ids, in order.
    async fn create_markers(&self, actor: ActorId, drafts: Vec<MarkerDraft>)
    -> Result<Vec<EntityId>>;

    async fn update_markers(&self, actor: ActorId, updates: Vec<MarkerUpdate>) -> Result<()>;

    async fn delete_markers(&self, actor: ActorId, ids: Vec<EntityId>) -> Result<()>;

    /// Attach a hazard to the character under a freshly minted id.
    ///
    /// A hazard with onset data starts Dormant at stage 1.
    async fn add_hazard(&self, actor: ActorId, hazard: Hazard) -> Result<Hazard>;

    /// Look up a hazard by id on any character.
    async fn hazard(&self, id: EntityId) -> Result<Option<StoredHazard>>;

    /// All hazards on the character.
    async fn hazards(&self, actor: ActorId) -> Result<Vec<Hazard>>;

    /// Persist a hazard's stage and onset state.
    async fn save_hazard(&self, actor: ActorId, hazard: &Hazard) -> Result<()>;

    async fn delete_hazard(&self, actor: ActorId, id: EntityId) -> Result<()>;
}
