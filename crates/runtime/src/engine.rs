//! Hazard stage orchestration.
//!
//! [`StageEngine`] drives hazards through their stages against an
//! [`EntityStore`]: it persists the new stage, reconciles the hazard's status
//! markers with the stage definition, and evaluates stage damage through the
//! injected [`DamageEvaluator`]. Pure decisions (the state machine and the
//! marker plan) come from `status-core`; this module only sequences I/O.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use status_core::{
    ActorId, ConditionCatalog, DamageResult, EngineConfig, EntityId, Hazard, HazardOutcome,
    OverrideResolver, StageDirection, StagePlan, StageTransition, StatusError, StatusMarker,
    WorldTime, compose,
};

use crate::api::{DamageEvaluator, Result, RuntimeError, SavingThrowService};
use crate::events::{DamageEvent, Event, EventBus, HazardEvent, Topic};
use crate::repository::{EntityStore, StoredHazard};

/// Runtime configuration shared by the engine and its event bus.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub engine: EngineConfig,
    pub event_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            event_buffer_size: 100,
        }
    }
}

/// Serializes transitions per hazard.
///
/// Two concurrent `advance_hazard` calls on one hazard would otherwise both
/// read the same stage and apply the same transition twice.
#[derive(Default)]
struct HazardLocks {
    locks: Mutex<HashMap<EntityId, Arc<tokio::sync::Mutex<()>>>>,
}

impl HazardLocks {
    fn lock_for(&self, id: EntityId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(id).or_default())
    }

    fn forget(&self, id: EntityId) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.remove(&id);
    }
}

/// Drives hazards through their stages.
pub struct StageEngine {
    store: Arc<dyn EntityStore>,
    damage: Arc<dyn DamageEvaluator>,
    saves: Arc<dyn SavingThrowService>,
    catalog: Arc<ConditionCatalog>,
    events: EventBus,
    locks: HazardLocks,
}

impl StageEngine {
    /// Create a new engine builder
    pub fn builder() -> StageEngineBuilder {
        StageEngineBuilder::new()
    }

    pub fn catalog(&self) -> &ConditionCatalog {
        &self.catalog
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to engine events on one topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.events.subscribe(topic)
    }

    /// Prepares markers against the catalog and resolves which are in force.
    pub fn resolve_overrides(&self, markers: Vec<StatusMarker>) -> Vec<StatusMarker> {
        OverrideResolver::new(&self.catalog).resolve(markers)
    }

    /// The character's markers as the store holds them, resolved.
    pub async fn resolved_markers(&self, actor: ActorId) -> Result<Vec<StatusMarker>> {
        let markers = self.store.list_markers(actor).await?;
        Ok(self.resolve_overrides(markers))
    }

    /// Attaches a hazard to the character and applies its first stage.
    ///
    /// A hazard with onset data stays Dormant and applies nothing until the
    /// onset clears.
    pub async fn apply_hazard(&self, actor: ActorId, hazard: Hazard) -> Result<HazardOutcome> {
        let hazard = self
            .store
            .add_hazard(actor, hazard)
            .await
            .map_err(RuntimeError::store("hazard creation"))?;
        let id = hazard.id();
        info!(hazard = %id, %actor, name = %hazard.name, phase = ?hazard.phase(), "hazard applied");

        if hazard.is_dormant() {
            return Ok(HazardOutcome::stage(id, hazard.stage()));
        }
        let lock = self.locks.lock_for(id);
        let _guard = lock.lock().await;
        let damage = self.reconcile(actor, &hazard).await?;
        Ok(HazardOutcome {
            damage,
            ..HazardOutcome::stage(id, hazard.stage())
        })
    }

    /// Applies one explicit transition to a hazard.
    pub async fn advance_hazard(
        &self,
        hazard_id: EntityId,
        direction: StageDirection,
    ) -> Result<HazardOutcome> {
        let lock = self.locks.lock_for(hazard_id);
        let _guard = lock.lock().await;

        let stored = self.load(hazard_id).await?;
        self.transition(stored, direction).await
    }

    /// Rolls the hazard's saving throw and regresses on a success or better,
    /// advances otherwise.
    pub async fn recover_hazard(&self, hazard_id: EntityId) -> Result<HazardOutcome> {
        let lock = self.locks.lock_for(hazard_id);
        let _guard = lock.lock().await;

        let stored = self.load(hazard_id).await?;
        let (actor, save, dc) = (stored.actor, stored.hazard.save_type, stored.hazard.save_dc);
        let degree = self
            .saves
            .roll(actor, save, dc)
            .await
            .map_err(|source| RuntimeError::SavingThrow {
                actor,
                save,
                source,
            })?;

        let direction = if degree.is_success() {
            StageDirection::Decrease
        } else {
            StageDirection::Increase
        };
        info!(
            hazard = %hazard_id,
            %actor,
            %save,
            dc,
            %degree,
            %direction,
            "recovery save resolved"
        );
        self.transition(stored, direction).await
    }

    /// Clears the onset of every dormant hazard on the character whose onset
    /// has elapsed by `now`.
    ///
    /// A hazard that fails to advance is logged and left as it is; the others
    /// still advance.
    pub async fn expire_onsets(
        &self,
        actor: ActorId,
        now: WorldTime,
    ) -> Result<Vec<HazardOutcome>> {
        let due: Vec<EntityId> = self
            .store
            .hazards(actor)
            .await?
            .iter()
            .filter(|hazard| hazard.onset_elapsed(now))
            .map(Hazard::id)
            .collect();

        let mut outcomes = Vec::with_capacity(due.len());
        for id in due {
            match self.advance_hazard(id, StageDirection::Increase).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(RuntimeError::HazardNotFound(_)) => {
                    debug!(hazard = %id, %actor, "hazard gone before its onset expired");
                }
                Err(err) => {
                    warn!(
                        hazard = %id,
                        %actor,
                        error = %err,
                        code = err.error_code(),
                        "onset expiry failed; hazard left dormant"
                    );
                }
            }
        }
        Ok(outcomes)
    }

    /// Re-applies the hazard's current stage to its character.
    ///
    /// Runs under the hazard's lock, like any transition. Store rejections are
    /// returned; damage failures are logged and leave `damage` empty.
    pub async fn on_stage_change(&self, hazard_id: EntityId) -> Result<HazardOutcome> {
        let lock = self.locks.lock_for(hazard_id);
        let _guard = lock.lock().await;

        let StoredHazard { actor, hazard } = self.load(hazard_id).await?;
        let damage = self.reconcile(actor, &hazard).await?;
        Ok(HazardOutcome {
            damage,
            ..HazardOutcome::stage(hazard_id, hazard.stage())
        })
    }

    /// Reconciles the character's markers with the hazard's current stage and
    /// evaluates stage damage unless the hazard is dormant. Callers hold the
    /// hazard's lock.
    async fn reconcile(&self, actor: ActorId, hazard: &Hazard) -> Result<Option<DamageResult>> {
        let markers = self
            .store
            .list_markers(actor)
            .await
            .map_err(RuntimeError::store("marker listing"))?;

        let plan = StagePlan::for_stage(hazard, &markers, &self.catalog);
        for err in &plan.skipped {
            warn!(
                hazard = %hazard.id(),
                stage = hazard.stage(),
                error = %err,
                code = err.error_code(),
                "stage entry skipped"
            );
        }
        self.submit(actor, plan).await?;

        if hazard.is_dormant() {
            debug!(hazard = %hazard.id(), "onset pending; stage damage skipped");
            return Ok(None);
        }
        Ok(self.evaluate_stage_damage(actor, hazard).await)
    }

    async fn load(&self, hazard_id: EntityId) -> Result<StoredHazard> {
        let mut stored = self
            .store
            .hazard(hazard_id)
            .await?
            .ok_or(RuntimeError::HazardNotFound(hazard_id))?;
        stored.hazard.normalize();
        Ok(stored)
    }

    async fn transition(
        &self,
        stored: StoredHazard,
        direction: StageDirection,
    ) -> Result<HazardOutcome> {
        let StoredHazard { actor, mut hazard } = stored;
        let id = hazard.id();
        let transition = hazard.apply(direction);
        debug!(hazard = %id, %actor, %direction, ?transition, "hazard transition");

        match transition {
            StageTransition::Unchanged => Ok(HazardOutcome::stage(id, hazard.stage())),
            StageTransition::Removed => {
                self.store
                    .delete_hazard(actor, id)
                    .await
                    .map_err(RuntimeError::store("hazard deletion"))?;
                self.locks.forget(id);
                if let Err(err) = self.release_markers(actor, id).await {
                    error!(hazard = %id, %actor, error = %err, "marker cleanup abandoned");
                }
                info!(hazard = %id, %actor, "hazard removed");
                self.events.publish(HazardEvent::Removed { actor, hazard: id });
                Ok(HazardOutcome::removed(id))
            }
            StageTransition::OnsetCleared
            | StageTransition::Advanced { .. }
            | StageTransition::Regressed { .. } => {
                // The stage is persisted before markers are applied; a store
                // failure below leaves the new stage with the old markers.
                self.store
                    .save_hazard(actor, &hazard)
                    .await
                    .map_err(RuntimeError::store("hazard save"))?;
                self.events.publish(HazardEvent::StageChanged {
                    actor,
                    hazard: id,
                    transition,
                    stage: hazard.stage(),
                });

                let damage = match self.reconcile(actor, &hazard).await {
                    Ok(damage) => damage,
                    Err(err) => {
                        error!(
                            hazard = %id,
                            %actor,
                            stage = hazard.stage(),
                            error = %err,
                            "stage change abandoned"
                        );
                        None
                    }
                };
                Ok(HazardOutcome {
                    damage,
                    ..HazardOutcome::stage(id, hazard.stage())
                })
            }
        }
    }

    async fn release_markers(&self, actor: ActorId, hazard_id: EntityId) -> Result<()> {
        let markers = self
            .store
            .list_markers(actor)
            .await
            .map_err(RuntimeError::store("marker listing"))?;
        let plan = StagePlan::for_removal(hazard_id, &markers, &self.catalog);
        self.submit(actor, plan).await
    }

    /// Submits a plan's batches in order: deletions, creations, updates.
    async fn submit(&self, actor: ActorId, plan: StagePlan) -> Result<()> {
        if plan.is_empty() {
            return Ok(());
        }
        let StagePlan {
            deletions,
            creations,
            updates,
            ..
        } = plan;
        debug!(
            %actor,
            deletions = deletions.len(),
            creations = creations.len(),
            updates = updates.len(),
            "submitting marker plan"
        );

        if !deletions.is_empty() {
            self.store
                .delete_markers(actor, deletions)
                .await
                .map_err(RuntimeError::store("marker deletion"))?;
        }
        if !creations.is_empty() {
            self.store
                .create_markers(actor, creations)
                .await
                .map_err(RuntimeError::store("marker creation"))?;
        }
        if !updates.is_empty() {
            self.store
                .update_markers(actor, updates)
                .await
                .map_err(RuntimeError::store("marker update"))?;
        }
        Ok(())
    }

    async fn evaluate_stage_damage(&self, actor: ActorId, hazard: &Hazard) -> Option<DamageResult> {
        let stage = hazard.current_stage()?;
        let composite = match compose(&stage.damage) {
            Ok(Some(composite)) => composite,
            Ok(None) => return None,
            Err(err) => {
                warn!(hazard = %hazard.id(), stage = hazard.stage(), error = %err, "stage damage skipped");
                return None;
            }
        };

        match self.damage.evaluate(&composite).await {
            Ok(result) => {
                debug!(hazard = %hazard.id(), total = result.total, "stage damage evaluated");
                self.events.publish(DamageEvent::StageDamage {
                    actor,
                    hazard: hazard.id(),
                    stage: hazard.stage(),
                    formula: composite.to_string(),
                    result: result.clone(),
                });
                Some(result)
            }
            Err(err) => {
                warn!(
                    hazard = %hazard.id(),
                    formula = %composite,
                    error = %err,
                    "stage damage could not be evaluated"
                );
                None
            }
        }
    }
}

/// Builder for [`StageEngine`].
#[derive(Default)]
pub struct StageEngineBuilder {
    config: RuntimeConfig,
    store: Option<Arc<dyn EntityStore>>,
    damage: Option<Arc<dyn DamageEvaluator>>,
    saves: Option<Arc<dyn SavingThrowService>>,
    catalog: Option<ConditionCatalog>,
}

impl StageEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(mut self, store: Arc<dyn EntityStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn damage_evaluator(mut self, evaluator: Arc<dyn DamageEvaluator>) -> Self {
        self.damage = Some(evaluator);
        self
    }

    pub fn saving_throws(mut self, saves: Arc<dyn SavingThrowService>) -> Self {
        self.saves = Some(saves);
        self
    }

    /// Catalog to resolve markers against. Defaults to the built-in catalog
    /// for the configured engine settings.
    pub fn catalog(mut self, catalog: ConditionCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn build(self) -> Result<StageEngine> {
        let store = self
            .store
            .ok_or(RuntimeError::MissingCollaborator("entity store"))?;
        let damage = self
            .damage
            .ok_or(RuntimeError::MissingCollaborator("damage evaluator"))?;
        let saves = self
            .saves
            .ok_or(RuntimeError::MissingCollaborator("saving throw service"))?;
        let catalog = self
            .catalog
            .unwrap_or_else(|| ConditionCatalog::builtin(&self.config.engine));

        Ok(StageEngine {
            store,
            damage,
            saves,
            catalog: Arc::new(catalog),
            events: EventBus::with_capacity(self.config.event_buffer_size),
            locks: HazardLocks::default(),
        })
    }
}
