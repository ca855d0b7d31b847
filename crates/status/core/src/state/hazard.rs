//! Multi-stage hazards (poisons, diseases, curses).
//!
//! A hazard is either **Dormant** (onset pending, stage 1), **Active** at some
//! stage in `1..=max_stage`, or removed. `stage` and `onset.active` are only
//! ever changed through [`Hazard::increase`] and [`Hazard::decrease`]; every
//! other path reads them through [`Hazard::stage`] and [`Hazard::phase`].

use crate::check::SaveType;
use crate::state::{EntityId, WorldTime};

/// Delay before a hazard starts affecting its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Onset {
    pub active: bool,
    pub ready_at: WorldTime,
    /// Initiative count at which the onset elapses inside an encounter.
    pub initiative: Option<i32>,
}

impl Onset {
    pub fn new(ready_at: WorldTime) -> Self {
        Self {
            active: false,
            ready_at,
            initiative: None,
        }
    }

    pub fn with_initiative(mut self, initiative: i32) -> Self {
        self.initiative = Some(initiative);
        self
    }
}

/// Damage dealt whenever a hazard enters (or re-enters) a stage.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DamageEntry {
    pub formula: String,
    pub damage_type: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub category: Option<DamageCategory>,
}

impl DamageEntry {
    pub fn new(formula: impl Into<String>, damage_type: impl Into<String>) -> Self {
        Self {
            formula: formula.into(),
            damage_type: damage_type.into(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: DamageCategory) -> Self {
        self.category = Some(category);
        self
    }
}

/// Damage category modifier.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "lowercase")]
pub enum DamageCategory {
    Persistent,
    Precision,
    Splash,
}

/// A condition a stage applies.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConditionEntry {
    pub slug: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub value: Option<u32>,
    /// Linked markers belong to the stage and are replaced on every change.
    #[cfg_attr(feature = "serde", serde(default = "default_linked"))]
    pub linked: bool,
}

#[cfg(feature = "serde")]
fn default_linked() -> bool {
    true
}

impl ConditionEntry {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            value: None,
            linked: true,
        }
    }

    pub fn with_value(mut self, value: u32) -> Self {
        self.value = Some(value);
        self
    }

    pub fn unlinked(mut self) -> Self {
        self.linked = false;
        self
    }
}

/// Everything one stage applies.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StageDefinition {
    pub damage: Vec<DamageEntry>,
    pub conditions: Vec<ConditionEntry>,
    /// Effect slugs granted alongside the stage's conditions.
    pub linked_effects: Vec<String>,
}

impl StageDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_damage(mut self, entry: DamageEntry) -> Self {
        self.damage.push(entry);
        self
    }

    pub fn with_condition(mut self, entry: ConditionEntry) -> Self {
        self.conditions.push(entry);
        self
    }

    pub fn with_linked_effect(mut self, slug: impl Into<String>) -> Self {
        self.linked_effects.push(slug.into());
        self
    }
}

/// Observable lifecycle state of a hazard that still exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HazardPhase {
    Dormant,
    Active(u32),
}

/// Direction of an explicit stage transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StageDirection {
    Increase,
    Decrease,
}

/// Result of applying a transition to a hazard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StageTransition {
    /// Onset elapsed; the hazard is now active at stage 1.
    OnsetCleared,
    Advanced { from: u32, to: u32 },
    Regressed { from: u32, to: u32 },
    /// Already at the maximum stage.
    Unchanged,
    /// Regressed below stage 1; the hazard must be deleted.
    Removed,
}

impl StageTransition {
    /// Returns true if the persisted stage changed and the stage must be
    /// re-applied.
    pub fn changes_stage(&self) -> bool {
        matches!(
            self,
            Self::OnsetCleared | Self::Advanced { .. } | Self::Regressed { .. }
        )
    }
}

/// A multi-stage affliction owned by one character.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hazard {
    id: EntityId,
    pub name: String,
    pub save_dc: u32,
    pub save_type: SaveType,
    onset: Option<Onset>,
    stage: u32,
    stages: Vec<StageDefinition>,
}

impl Hazard {
    /// Creates an active hazard at stage 1.
    pub fn new(
        id: EntityId,
        name: impl Into<String>,
        save_dc: u32,
        save_type: SaveType,
        stages: Vec<StageDefinition>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            save_dc,
            save_type,
            onset: None,
            stage: 1,
            stages,
        }
    }

    /// Attaches onset data; takes effect once the hazard is attached to a
    /// character.
    pub fn with_onset(mut self, onset: Onset) -> Self {
        self.onset = Some(Onset {
            active: false,
            ..onset
        });
        self
    }

    /// Sets the starting stage, clamped to the defined range.
    pub fn with_stage(mut self, stage: u32) -> Self {
        self.stage = stage;
        self.normalize();
        self
    }

    /// Reassigns the hazard's identity (used by stores minting ids).
    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = id;
        self
    }

    /// Places the hazard on a character.
    ///
    /// A hazard with onset data starts Dormant at stage 1.
    pub fn attach(mut self) -> Self {
        if let Some(onset) = self.onset.as_mut() {
            onset.active = true;
            self.stage = 1;
        }
        self.normalize();
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn stage(&self) -> u32 {
        self.stage
    }

    pub fn onset(&self) -> Option<&Onset> {
        self.onset.as_ref()
    }

    pub fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }

    pub fn max_stage(&self) -> u32 {
        u32::try_from(self.stages.len()).unwrap_or(u32::MAX).max(1)
    }

    pub fn is_dormant(&self) -> bool {
        self.onset.is_some_and(|onset| onset.active)
    }

    pub fn phase(&self) -> HazardPhase {
        if self.is_dormant() {
            HazardPhase::Dormant
        } else {
            HazardPhase::Active(self.stage)
        }
    }

    /// Definition of the current stage, if content defines one.
    pub fn current_stage(&self) -> Option<&StageDefinition> {
        let index = usize::try_from(self.stage).ok()?.checked_sub(1)?;
        self.stages.get(index)
    }

    /// Returns true if a dormant hazard's onset has elapsed by `now`.
    pub fn onset_elapsed(&self, now: WorldTime) -> bool {
        self.onset
            .is_some_and(|onset| onset.active && onset.ready_at <= now)
    }

    /// Enforces `1 <= stage <= max_stage`.
    pub fn normalize(&mut self) {
        self.stage = self.stage.clamp(1, self.max_stage());
    }

    /// Normalized copy, as every read of stored hazard data must see it.
    pub fn prepared(mut self) -> Self {
        self.normalize();
        self
    }

    pub fn apply(&mut self, direction: StageDirection) -> StageTransition {
        match direction {
            StageDirection::Increase => self.increase(),
            StageDirection::Decrease => self.decrease(),
        }
    }

    /// Clears a pending onset, or advances one stage up to the maximum.
    pub fn increase(&mut self) -> StageTransition {
        self.normalize();
        if let Some(onset) = self.onset.as_mut().filter(|onset| onset.active) {
            onset.active = false;
            return StageTransition::OnsetCleared;
        }

        if self.stage < self.max_stage() {
            let from = self.stage;
            self.stage += 1;
            StageTransition::Advanced {
                from,
                to: self.stage,
            }
        } else {
            StageTransition::Unchanged
        }
    }

    /// Regresses one stage; from stage 1 the hazard is removed, dormant or not.
    pub fn decrease(&mut self) -> StageTransition {
        self.normalize();
        if self.stage <= 1 {
            return StageTransition::Removed;
        }

        let from = self.stage;
        self.stage -= 1;
        StageTransition::Regressed {
            from,
            to: self.stage,
        }
    }
}
