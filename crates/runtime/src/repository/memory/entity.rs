//! In-memory EntityStore implementation for tests and local runs.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use status_core::{ActorId, EntityId, Hazard, MarkerDraft, MarkerUpdate, StatusMarker};

use crate::repository::{EntityStore, RepositoryError, Result, StoredHazard};

#[derive(Debug, Default)]
struct ActorRecord {
    markers: Vec<StatusMarker>,
    hazards: Vec<Hazard>,
}

/// In-memory implementation of [`EntityStore`].
///
/// Entity ids are minted from a single counter shared by markers and hazards,
/// so an id never names two entities.
pub struct InMemoryEntityStore {
    actors: RwLock<HashMap<ActorId, ActorRecord>>,
    next_id: AtomicU32,
}

impl InMemoryEntityStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            actors: RwLock::new(HashMap::new()),
            next_id: AtomicU32::new(1),
        }
    }

    /// Register a character with no markers or hazards.
    pub fn add_actor(&self, actor: ActorId) -> Result<()> {
        let mut actors = self
            .actors
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        if actors.contains_key(&actor) {
            return Err(RepositoryError::ActorExists(actor));
        }
        actors.insert(actor, ActorRecord::default());
        Ok(())
    }

    pub fn remove_actor(&self, actor: ActorId) -> Result<()> {
        let mut actors = self
            .actors
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        actors
            .remove(&actor)
            .map(|_| ())
            .ok_or(RepositoryError::ActorNotFound(actor))
    }

    /// Place a marker directly, outside any hazard.
    pub fn insert_marker(&self, actor: ActorId, draft: MarkerDraft) -> Result<EntityId> {
        let mut actors = self
            .actors
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let record = actors
            .get_mut(&actor)
            .ok_or(RepositoryError::ActorNotFound(actor))?;
        let id = self.mint();
        record.markers.push(StatusMarker::from_draft(id, draft));
        Ok(id)
    }

    fn mint(&self) -> EntityId {
        EntityId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for InMemoryEntityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn list_markers(&self, actor: ActorId) -> Result<Vec<StatusMarker>> {
        let actors = self
            .actors
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        actors
            .get(&actor)
            .map(|record| record.markers.clone())
            .ok_or(RepositoryError::ActorNotFound(actor))
    }

    async fn create_markers(
        &self,
        actor: ActorId,
        drafts: Vec<MarkerDraft>,
    ) -> Result<Vec<EntityId>> {
        let mut actors = self
            .actors
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let record = actors
            .get_mut(&actor)
            .ok_or(RepositoryError::ActorNotFound(actor))?;

        let mut ids = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let id = self.mint();
            record.markers.push(StatusMarker::from_draft(id, draft));
            ids.push(id);
        }
        Ok(ids)
    }

    async fn update_markers(&self, actor: ActorId, updates: Vec<MarkerUpdate>) -> Result<()> {
        let mut actors = self
            .actors
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let record = actors
            .get_mut(&actor)
            .ok_or(RepositoryError::ActorNotFound(actor))?;

        // Validate first so a bad id leaves every marker untouched.
        if let Some(missing) = updates
            .iter()
            .find(|update| !record.markers.iter().any(|m| m.id == update.id))
        {
            return Err(RepositoryError::MarkerNotFound {
                actor,
                marker: missing.id,
            });
        }
        for update in &updates {
            if let Some(marker) = record.markers.iter_mut().find(|m| m.id == update.id) {
                update.apply_to(marker);
            }
        }
        Ok(())
    }

    async fn delete_markers(&self, actor: ActorId, ids: Vec<EntityId>) -> Result<()> {
        let mut actors = self
            .actors
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let record = actors
            .get_mut(&actor)
            .ok_or(RepositoryError::ActorNotFound(actor))?;
        record.markers.retain(|marker| !ids.contains(&marker.id));
        Ok(())
    }

    async fn add_hazard(&self, actor: ActorId, hazard: Hazard) -> Result<Hazard> {
        let mut actors = self
            .actors
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let record = actors
            .get_mut(&actor)
            .ok_or(RepositoryError::ActorNotFound(actor))?;
        let hazard = hazard.with_id(self.mint()).attach();
        record.hazards.push(hazard.clone());
        Ok(hazard)
    }

    async fn hazard(&self, id: EntityId) -> Result<Option<StoredHazard>> {
        let actors = self
            .actors
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(actors.iter().find_map(|(actor, record)| {
            record
                .hazards
                .iter()
                .find(|hazard| hazard.id() == id)
                .map(|hazard| StoredHazard {
                    actor: *actor,
                    hazard: hazard.clone().prepared(),
                })
        }))
    }

    async fn hazards(&self, actor: ActorId) -> Result<Vec<Hazard>> {
        let actors = self
            .actors
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        actors
            .get(&actor)
            .map(|record| {
                record
                    .hazards
                    .iter()
                    .cloned()
                    .map(Hazard::prepared)
                    .collect()
            })
            .ok_or(RepositoryError::ActorNotFound(actor))
    }

    async fn save_hazard(&self, actor: ActorId, hazard: &Hazard) -> Result<()> {
        let mut actors = self
            .actors
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let record = actors
            .get_mut(&actor)
            .ok_or(RepositoryError::ActorNotFound(actor))?;
        let stored = record
            .hazards
            .iter_mut()
            .find(|stored| stored.id() == hazard.id())
            .ok_or(RepositoryError::HazardNotFound(hazard.id()))?;
        *stored = hazard.clone();
        Ok(())
    }

    async fn delete_hazard(&self, actor: ActorId, id: EntityId) -> Result<()> {
        let mut actors = self
            .actors
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let record = actors
            .get_mut(&actor)
            .ok_or(RepositoryError::ActorNotFound(actor))?;
        let before = record.hazards.len();
        record.hazards.retain(|hazard| hazard.id() != id);
        if record.hazards.len() == before {
            return Err(RepositoryError::HazardNotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use status_core::{SaveType, StageDefinition};

    fn poison() -> Hazard {
        Hazard::new(
            EntityId(0),
            "Arsenic",
            18,
            SaveType::Fortitude,
            vec![StageDefinition::new(), StageDefinition::new()],
        )
    }

    #[tokio::test]
    async fn ids_are_unique_across_markers_and_hazards() {
        let store = InMemoryEntityStore::new();
        let actor = ActorId(1);
        store.add_actor(actor).unwrap();

        let marker = store
            .insert_marker(actor, MarkerDraft::new("frightened").with_value(Some(1)))
            .unwrap();
        let hazard = store.add_hazard(actor, poison()).await.unwrap();
        let created = store
            .create_markers(actor, vec![MarkerDraft::new("dazzled")])
            .await
            .unwrap();

        assert_ne!(marker, hazard.id());
        assert_ne!(created[0], hazard.id());
        assert_ne!(created[0], marker);
        assert_eq!(store.list_markers(actor).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_with_unknown_id_changes_nothing() {
        let store = InMemoryEntityStore::new();
        let actor = ActorId(1);
        store.add_actor(actor).unwrap();
        let id = store
            .insert_marker(actor, MarkerDraft::new("frightened").with_value(Some(1)))
            .unwrap();

        let result = store
            .update_markers(
                actor,
                vec![
                    MarkerUpdate::confirm(id, Some(3)),
                    MarkerUpdate::confirm(EntityId(999), Some(1)),
                ],
            )
            .await;

        assert!(matches!(
            result,
            Err(RepositoryError::MarkerNotFound { .. })
        ));
        assert_eq!(store.list_markers(actor).await.unwrap()[0].value, Some(1));
    }

    #[tokio::test]
    async fn hazard_lookup_reports_owner_and_clamps_stage() {
        let store = InMemoryEntityStore::new();
        store.add_actor(ActorId(1)).unwrap();
        store.add_actor(ActorId(2)).unwrap();
        let hazard = store
            .add_hazard(ActorId(2), poison().with_stage(2))
            .await
            .unwrap();

        let stored = store.hazard(hazard.id()).await.unwrap().unwrap();
        assert_eq!(stored.actor, ActorId(2));
        assert_eq!(stored.hazard.stage(), 2);

        store.delete_hazard(ActorId(2), hazard.id()).await.unwrap();
        assert!(store.hazard(hazard.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_actor_is_an_error() {
        let store = InMemoryEntityStore::new();
        assert!(matches!(
            store.list_markers(ActorId(7)).await,
            Err(RepositoryError::ActorNotFound(ActorId(7)))
        ));
    }
}
