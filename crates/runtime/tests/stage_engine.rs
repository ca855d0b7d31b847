use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use status_core::{
    ActorId, CompositeDamage, ConditionEntry, DamageEntry, DamageResult, DegreeOfSuccess,
    EntityId, FormulaError, Hazard, HazardStage, MarkerDraft, MarkerUpdate, Onset, SaveType,
    StageDefinition, StageDirection, StatusMarker, WorldTime,
};
use status_runtime::{
    AverageDamageEvaluator, DamageEvaluator, DamageEvent, EntityStore, Event, FixedSavingThrow,
    HazardEvent, InMemoryEntityStore, RepositoryError, RuntimeError, StageEngine, StoredHazard,
    Topic,
};
use status_runtime::repository::Result as StoreResult;

const HERO: ActorId = ActorId(1);

/// Delegates to the average evaluator and counts calls.
#[derive(Default)]
struct CountingEvaluator {
    calls: AtomicUsize,
}

impl CountingEvaluator {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DamageEvaluator for CountingEvaluator {
    async fn evaluate(&self, damage: &CompositeDamage) -> Result<DamageResult, FormulaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        AverageDamageEvaluator.evaluate(damage).await
    }
}

/// In-memory store that can be told to refuse marker creation or saving one
/// hazard.
#[derive(Default)]
struct RejectingStore {
    inner: InMemoryEntityStore,
    reject_creates: AtomicBool,
    reject_save_of: Mutex<Option<EntityId>>,
}

#[async_trait]
impl EntityStore for RejectingStore {
    async fn list_markers(&self, actor: ActorId) -> StoreResult<Vec<StatusMarker>> {
        self.inner.list_markers(actor).await
    }

    async fn create_markers(
        &self,
        actor: ActorId,
        drafts: Vec<MarkerDraft>,
    ) -> StoreResult<Vec<EntityId>> {
        if self.reject_creates.load(Ordering::SeqCst) {
            return Err(RepositoryError::Rejected("character is gone".into()));
        }
        self.inner.create_markers(actor, drafts).await
    }

    async fn update_markers(
        &self,
        actor: ActorId,
        updates: Vec<MarkerUpdate>,
    ) -> StoreResult<()> {
        self.inner.update_markers(actor, updates).await
    }

    async fn delete_markers(
        &self,
        actor: ActorId,
        ids: Vec<EntityId>,
    ) -> StoreResult<()> {
        self.inner.delete_markers(actor, ids).await
    }

    async fn add_hazard(
        &self,
        actor: ActorId,
        hazard: Hazard,
    ) -> StoreResult<Hazard> {
        self.inner.add_hazard(actor, hazard).await
    }

    async fn hazard(&self, id: EntityId) -> StoreResult<Option<StoredHazard>> {
        self.inner.hazard(id).await
    }

    async fn hazards(&self, actor: ActorId) -> StoreResult<Vec<Hazard>> {
        self.inner.hazards(actor).await
    }

    async fn save_hazard(
        &self,
        actor: ActorId,
        hazard: &Hazard,
    ) -> StoreResult<()> {
        if *self.reject_save_of.lock().unwrap() == Some(hazard.id()) {
            return Err(RepositoryError::Rejected("hazard is frozen".into()));
        }
        self.inner.save_hazard(actor, hazard).await
    }

    async fn delete_hazard(
        &self,
        actor: ActorId,
        id: EntityId,
    ) -> StoreResult<()> {
        self.inner.delete_hazard(actor, id).await
    }
}

struct Harness {
    store: Arc<InMemoryEntityStore>,
    damage: Arc<CountingEvaluator>,
    engine: StageEngine,
}

fn harness(save: DegreeOfSuccess) -> Harness {
    let store = Arc::new(InMemoryEntityStore::new());
    store.add_actor(HERO).unwrap();
    let damage = Arc::new(CountingEvaluator::default());
    let engine = StageEngine::builder()
        .store(store.clone())
        .damage_evaluator(damage.clone())
        .saving_throws(Arc::new(FixedSavingThrow(save)))
        .build()
        .unwrap();
    Harness {
        store,
        damage,
        engine,
    }
}

/// Three stages; stage 2 also frightens, which outlives the venom.
fn venom() -> Hazard {
    Hazard::new(
        EntityId(0),
        "Giant Centipede Venom",
        14,
        SaveType::Fortitude,
        vec![
            StageDefinition::new()
                .with_damage(DamageEntry::new("1d6", "poison"))
                .with_condition(ConditionEntry::new("enfeebled").with_value(1)),
            StageDefinition::new()
                .with_damage(DamageEntry::new("1d8", "poison"))
                .with_condition(ConditionEntry::new("enfeebled").with_value(2))
                .with_condition(ConditionEntry::new("frightened").with_value(1)),
            StageDefinition::new()
                .with_damage(DamageEntry::new("2d6", "poison"))
                .with_condition(ConditionEntry::new("paralyzed")),
        ],
    )
}

/// Captures formatted log output for the current thread.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn rejecting_engine(store: Arc<RejectingStore>) -> (StageEngine, Arc<CountingEvaluator>) {
    store.inner.add_actor(HERO).unwrap();
    let damage = Arc::new(CountingEvaluator::default());
    let engine = StageEngine::builder()
        .store(store)
        .damage_evaluator(damage.clone())
        .saving_throws(Arc::new(FixedSavingThrow(DegreeOfSuccess::Failure)))
        .build()
        .unwrap();
    (engine, damage)
}

fn with_slug<'a>(markers: &'a [StatusMarker], slug: &str) -> Vec<&'a StatusMarker> {
    markers.iter().filter(|m| m.slug == slug).collect()
}

#[tokio::test]
async fn hazard_lifecycle_from_onset_to_removal() {
    let h = harness(DegreeOfSuccess::Failure);
    let hazard = venom().with_onset(Onset::new(WorldTime(60)));

    let applied = h.engine.apply_hazard(HERO, hazard).await.unwrap();
    let id = applied.hazard;
    assert_eq!(applied.new_stage, HazardStage::Stage(1));
    assert!(h.store.list_markers(HERO).await.unwrap().is_empty());
    assert_eq!(h.damage.calls(), 0);

    // Clearing the onset keeps stage 1 and applies it with damage.
    let cleared = h
        .engine
        .advance_hazard(id, StageDirection::Increase)
        .await
        .unwrap();
    assert_eq!(cleared.new_stage, HazardStage::Stage(1));
    assert_eq!(cleared.damage.as_ref().map(|d| d.total), Some(3));
    let markers = h.store.list_markers(HERO).await.unwrap();
    assert_eq!(with_slug(&markers, "enfeebled")[0].value, Some(1));

    let second = h
        .engine
        .advance_hazard(id, StageDirection::Increase)
        .await
        .unwrap();
    assert_eq!(second.new_stage, HazardStage::Stage(2));
    assert_eq!(second.damage.as_ref().map(|d| d.total), Some(4));
    let markers = h.store.list_markers(HERO).await.unwrap();
    assert_eq!(with_slug(&markers, "enfeebled").len(), 1);
    assert_eq!(with_slug(&markers, "enfeebled")[0].value, Some(2));
    assert_eq!(with_slug(&markers, "frightened").len(), 1);

    let back = h
        .engine
        .advance_hazard(id, StageDirection::Decrease)
        .await
        .unwrap();
    assert_eq!(back.new_stage, HazardStage::Stage(1));

    let removed = h
        .engine
        .advance_hazard(id, StageDirection::Decrease)
        .await
        .unwrap();
    assert!(removed.is_removed());
    assert!(h.store.hazard(id).await.unwrap().is_none());
    assert_eq!(h.damage.calls(), 3);

    // Only the expiring survivor remains, released from the venom.
    let markers = h.store.list_markers(HERO).await.unwrap();
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].slug, "frightened");
    assert_eq!(markers[0].parent_id, None);
    assert!(!markers[0].is_locked());

    let err = h
        .engine
        .advance_hazard(id, StageDirection::Increase)
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::HazardNotFound(missing) if missing == id));
}

#[tokio::test]
async fn max_stage_increase_is_a_no_op() {
    let h = harness(DegreeOfSuccess::Failure);
    let id = h
        .engine
        .apply_hazard(HERO, venom().with_stage(3))
        .await
        .unwrap()
        .hazard;
    let calls = h.damage.calls();

    let outcome = h
        .engine
        .advance_hazard(id, StageDirection::Increase)
        .await
        .unwrap();

    assert_eq!(outcome.new_stage, HazardStage::Stage(3));
    assert_eq!(outcome.damage, None);
    assert_eq!(h.damage.calls(), calls);
}

#[tokio::test]
async fn dormant_stage_change_never_evaluates_damage() {
    let h = harness(DegreeOfSuccess::Failure);
    let hazard = h
        .store
        .add_hazard(HERO, venom().with_onset(Onset::new(WorldTime(60))))
        .await
        .unwrap();
    assert!(hazard.is_dormant());

    let outcome = h.engine.on_stage_change(hazard.id()).await.unwrap();

    assert_eq!(outcome.new_stage, HazardStage::Stage(1));
    assert_eq!(outcome.damage, None);
    assert_eq!(h.damage.calls(), 0);
    let markers = h.store.list_markers(HERO).await.unwrap();
    assert_eq!(with_slug(&markers, "enfeebled").len(), 1);
}

#[tokio::test]
async fn expiring_markers_survive_stage_cleanup() {
    let h = harness(DegreeOfSuccess::Failure);
    let id = h
        .engine
        .apply_hazard(HERO, venom().with_stage(2))
        .await
        .unwrap()
        .hazard;
    let frightened = with_slug(&h.store.list_markers(HERO).await.unwrap(), "frightened")[0].id;

    h.engine
        .advance_hazard(id, StageDirection::Increase)
        .await
        .unwrap();

    let markers = h.store.list_markers(HERO).await.unwrap();
    let survivor = markers.iter().find(|m| m.id == frightened).unwrap();
    assert_eq!(survivor.applied_by, Some(id));
    assert_eq!(survivor.parent_id, Some(id));
    assert!(with_slug(&markers, "enfeebled").is_empty());
    assert_eq!(with_slug(&markers, "paralyzed").len(), 1);
}

#[tokio::test]
async fn broken_formula_still_applies_markers() {
    let h = harness(DegreeOfSuccess::Failure);
    let hazard = Hazard::new(
        EntityId(0),
        "Bad Brew",
        12,
        SaveType::Fortitude,
        vec![
            StageDefinition::new().with_condition(ConditionEntry::new("sickened").with_value(1)),
            StageDefinition::new()
                .with_damage(DamageEntry::new("1d6+", "poison"))
                .with_condition(ConditionEntry::new("sickened").with_value(2)),
            StageDefinition::new()
                .with_damage(DamageEntry::new("1d6*bad", "poison"))
                .with_condition(ConditionEntry::new("clumsy").with_value(1)),
        ],
    );
    let id = h.engine.apply_hazard(HERO, hazard).await.unwrap().hazard;

    // Malformed: rejected before the evaluator is consulted.
    let outcome = h
        .engine
        .advance_hazard(id, StageDirection::Increase)
        .await
        .unwrap();
    assert_eq!(outcome.damage, None);
    assert_eq!(h.damage.calls(), 0);

    // Unevaluable: the evaluator reports the failure.
    let outcome = h
        .engine
        .advance_hazard(id, StageDirection::Increase)
        .await
        .unwrap();
    assert_eq!(outcome.new_stage, HazardStage::Stage(3));
    assert_eq!(outcome.damage, None);
    assert_eq!(h.damage.calls(), 1);

    let markers = h.store.list_markers(HERO).await.unwrap();
    assert_eq!(with_slug(&markers, "clumsy")[0].value, Some(1));
    assert_eq!(with_slug(&markers, "sickened")[0].value, Some(2));
}

#[tokio::test]
async fn rejected_store_abandons_change_but_keeps_stage() {
    let store = Arc::new(RejectingStore::default());
    let (engine, damage) = rejecting_engine(store.clone());
    let id = engine.apply_hazard(HERO, venom()).await.unwrap().hazard;
    assert_eq!(damage.calls(), 1);

    store.reject_creates.store(true, Ordering::SeqCst);
    let outcome = engine
        .advance_hazard(id, StageDirection::Increase)
        .await
        .unwrap();

    assert_eq!(outcome.new_stage, HazardStage::Stage(2));
    assert_eq!(outcome.damage, None);
    assert_eq!(damage.calls(), 1);
    let stored = store.hazard(id).await.unwrap().unwrap();
    assert_eq!(stored.hazard.stage(), 2);
}

#[tokio::test]
async fn recovery_follows_the_saving_throw() {
    let passed = harness(DegreeOfSuccess::Success);
    let id = passed
        .engine
        .apply_hazard(HERO, venom().with_stage(2))
        .await
        .unwrap()
        .hazard;
    let outcome = passed.engine.recover_hazard(id).await.unwrap();
    assert_eq!(outcome.new_stage, HazardStage::Stage(1));

    let failed = harness(DegreeOfSuccess::CriticalFailure);
    let id = failed
        .engine
        .apply_hazard(HERO, venom().with_stage(2))
        .await
        .unwrap()
        .hazard;
    let outcome = failed.engine.recover_hazard(id).await.unwrap();
    assert_eq!(outcome.new_stage, HazardStage::Stage(3));
}

#[tokio::test]
async fn successful_recovery_at_stage_one_removes_hazard() {
    let h = harness(DegreeOfSuccess::CriticalSuccess);
    let id = h.engine.apply_hazard(HERO, venom()).await.unwrap().hazard;

    let outcome = h.engine.recover_hazard(id).await.unwrap();

    assert!(outcome.is_removed());
    assert!(h.store.hazards(HERO).await.unwrap().is_empty());
    assert!(h.store.list_markers(HERO).await.unwrap().is_empty());
}

#[tokio::test]
async fn onsets_expire_with_world_time() {
    let h = harness(DegreeOfSuccess::Failure);
    let id = h
        .engine
        .apply_hazard(HERO, venom().with_onset(Onset::new(WorldTime(60))))
        .await
        .unwrap()
        .hazard;

    let early = h.engine.expire_onsets(HERO, WorldTime(30)).await.unwrap();
    assert!(early.is_empty());

    let due = h.engine.expire_onsets(HERO, WorldTime(60)).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].hazard, id);
    assert_eq!(due[0].new_stage, HazardStage::Stage(1));
    assert!(due[0].damage.is_some());

    // Already active: nothing left to expire.
    let again = h.engine.expire_onsets(HERO, WorldTime(120)).await.unwrap();
    assert!(again.is_empty());
}

#[tokio::test]
async fn unknown_conditions_are_skipped() {
    let h = harness(DegreeOfSuccess::Failure);
    let hazard = Hazard::new(
        EntityId(0),
        "Strange Spores",
        16,
        SaveType::Fortitude,
        vec![
            StageDefinition::new()
                .with_condition(ConditionEntry::new("mystery-rot"))
                .with_condition(ConditionEntry::new("dazzled")),
        ],
    );

    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    h.engine.apply_hazard(HERO, hazard).await.unwrap();

    let markers = h.store.list_markers(HERO).await.unwrap();
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].slug, "dazzled");

    let logs = logs.contents();
    assert!(logs.contains("stage entry skipped"), "{logs}");
    assert!(logs.contains("UNKNOWN_MARKER_REFERENCE"), "{logs}");
    assert!(logs.contains("mystery-rot"), "{logs}");
}

#[tokio::test]
async fn unlinked_entry_reuses_free_standing_marker() {
    let h = harness(DegreeOfSuccess::Failure);
    let existing = h
        .store
        .insert_marker(HERO, MarkerDraft::new("frightened").with_value(Some(2)))
        .unwrap();
    let hazard = Hazard::new(
        EntityId(0),
        "Haunting Whispers",
        15,
        SaveType::Will,
        vec![
            StageDefinition::new()
                .with_condition(ConditionEntry::new("frightened").with_value(3).unlinked()),
        ],
    );

    h.engine.apply_hazard(HERO, hazard).await.unwrap();

    let markers = h.store.list_markers(HERO).await.unwrap();
    let frightened = with_slug(&markers, "frightened");
    assert_eq!(frightened.len(), 1);
    assert_eq!(frightened[0].id, existing);
    assert_eq!(frightened[0].value, Some(3));
}

#[tokio::test]
async fn resolved_markers_apply_static_overrides() {
    let h = harness(DegreeOfSuccess::Failure);
    let dazzled = h
        .store
        .insert_marker(HERO, MarkerDraft::new("dazzled"))
        .unwrap();
    let blinded = h
        .store
        .insert_marker(HERO, MarkerDraft::new("blinded"))
        .unwrap();

    let markers = h.engine.resolved_markers(HERO).await.unwrap();

    let dazzled = markers.iter().find(|m| m.id == dazzled).unwrap();
    assert!(!dazzled.active);
    assert_eq!(dazzled.overridden_by, vec![blinded]);
    assert!(markers.iter().find(|m| m.id == blinded).unwrap().active);
}

#[tokio::test]
async fn stage_changes_are_published() {
    let h = harness(DegreeOfSuccess::Failure);
    let mut hazards = h.engine.subscribe(Topic::Hazard);
    let mut damage = h.engine.subscribe(Topic::Damage);
    let id = h.engine.apply_hazard(HERO, venom()).await.unwrap().hazard;

    // Stage 1 damage from applying the hazard.
    let Event::Damage(DamageEvent::StageDamage { stage, .. }) = damage.recv().await.unwrap() else {
        panic!("expected stage damage");
    };
    assert_eq!(stage, 1);

    h.engine
        .advance_hazard(id, StageDirection::Increase)
        .await
        .unwrap();

    match hazards.recv().await.unwrap() {
        Event::Hazard(HazardEvent::StageChanged { hazard, stage, .. }) => {
            assert_eq!(hazard, id);
            assert_eq!(stage, 2);
        }
        other => panic!("unexpected event {other:?}"),
    }
    match damage.recv().await.unwrap() {
        Event::Damage(DamageEvent::StageDamage {
            formula, result, ..
        }) => {
            assert_eq!(formula, "{(1d8)[poison]}");
            assert_eq!(result.total, 4);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_advances_apply_in_turn() {
    let h = harness(DegreeOfSuccess::Failure);
    let id = h.engine.apply_hazard(HERO, venom()).await.unwrap().hazard;

    let (a, b) = tokio::join!(
        h.engine.advance_hazard(id, StageDirection::Increase),
        h.engine.advance_hazard(id, StageDirection::Increase),
    );
    a.unwrap();
    b.unwrap();

    let stored = h.store.hazard(id).await.unwrap().unwrap();
    assert_eq!(stored.hazard.stage(), 3);
    let markers = h.store.list_markers(HERO).await.unwrap();
    assert_eq!(with_slug(&markers, "paralyzed").len(), 1);
    assert!(with_slug(&markers, "enfeebled").is_empty());
}

#[tokio::test]
async fn failed_onset_expiry_does_not_block_other_hazards() {
    let store = Arc::new(RejectingStore::default());
    let (engine, _) = rejecting_engine(store.clone());
    let onset = Onset::new(WorldTime(10));
    let frozen = engine
        .apply_hazard(HERO, venom().with_onset(onset))
        .await
        .unwrap()
        .hazard;
    let thawed = engine
        .apply_hazard(HERO, venom().with_onset(onset))
        .await
        .unwrap()
        .hazard;
    *store.reject_save_of.lock().unwrap() = Some(frozen);

    let outcomes = engine.expire_onsets(HERO, WorldTime(10)).await.unwrap();

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].hazard, thawed);
    assert!(store.hazard(frozen).await.unwrap().unwrap().hazard.is_dormant());
    assert!(!store.hazard(thawed).await.unwrap().unwrap().hazard.is_dormant());
}

#[tokio::test]
async fn stage_change_for_missing_hazard_is_reported() {
    let h = harness(DegreeOfSuccess::Failure);

    let err = h.engine.on_stage_change(EntityId(404)).await.unwrap_err();

    assert!(matches!(err, RuntimeError::HazardNotFound(EntityId(404))));
}

#[tokio::test]
async fn stage_change_waits_for_a_running_advance() {
    let h = harness(DegreeOfSuccess::Failure);
    let id = h.engine.apply_hazard(HERO, venom()).await.unwrap().hazard;

    let (advanced, reapplied) = tokio::join!(
        h.engine.advance_hazard(id, StageDirection::Increase),
        h.engine.on_stage_change(id),
    );
    assert_eq!(advanced.unwrap().new_stage, HazardStage::Stage(2));
    reapplied.unwrap();

    let markers = h.store.list_markers(HERO).await.unwrap();
    assert_eq!(with_slug(&markers, "enfeebled").len(), 1);
    assert_eq!(with_slug(&markers, "enfeebled")[0].value, Some(2));
    assert_eq!(with_slug(&markers, "frightened").len(), 1);
}

#[tokio::test]
async fn linked_stage_takes_over_marker_from_unlinked_stage() {
    let h = harness(DegreeOfSuccess::Failure);
    let hazard = Hazard::new(
        EntityId(0),
        "Mummy Rot",
        16,
        SaveType::Fortitude,
        vec![
            StageDefinition::new()
                .with_condition(ConditionEntry::new("clumsy").with_value(1).unlinked()),
            StageDefinition::new().with_condition(ConditionEntry::new("clumsy").with_value(2)),
        ],
    );
    let id = h.engine.apply_hazard(HERO, hazard).await.unwrap().hazard;
    let clumsy = with_slug(&h.store.list_markers(HERO).await.unwrap(), "clumsy")[0].clone();
    assert_eq!(clumsy.parent_id, None);

    h.engine
        .advance_hazard(id, StageDirection::Increase)
        .await
        .unwrap();

    let markers = h.store.list_markers(HERO).await.unwrap();
    let linked = with_slug(&markers, "clumsy");
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].id, clumsy.id);
    assert_eq!(linked[0].parent_id, Some(id));
    assert_eq!(linked[0].value, Some(2));
    assert!(linked[0].is_locked());

    // Linked now, so leaving the stage deletes it; stage 1 starts a fresh
    // free-standing marker.
    h.engine
        .advance_hazard(id, StageDirection::Decrease)
        .await
        .unwrap();
    let markers = h.store.list_markers(HERO).await.unwrap();
    let fresh = with_slug(&markers, "clumsy");
    assert_eq!(fresh.len(), 1);
    assert_ne!(fresh[0].id, clumsy.id);
    assert_eq!(fresh[0].parent_id, None);
}
