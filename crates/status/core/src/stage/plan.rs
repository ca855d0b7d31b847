//! Marker changes required when a hazard enters a stage or is removed.
//!
//! Planning is pure: it reads the character's current markers and produces
//! the complete set of deletions, creations, and updates before anything is
//! submitted to a store. Either the whole batch is sent or none of it is.

use std::collections::BTreeSet;

use crate::catalog::{CatalogError, ConditionCatalog};
use crate::resolver::OverrideResolver;
use crate::state::{EntityId, Hazard, MarkerDraft, MarkerUpdate, StatusMarker};

/// Batched marker mutations for one hazard.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StagePlan {
    pub deletions: Vec<EntityId>,
    pub creations: Vec<MarkerDraft>,
    pub updates: Vec<MarkerUpdate>,
    /// Stage entries the catalog does not know; skipped.
    pub skipped: Vec<CatalogError>,
}

impl StagePlan {
    /// Plans the markers for the hazard's current stage.
    ///
    /// 1. Linked markers of the hazard are deleted, except types that expire
    ///    without a duration.
    /// 2. Each condition of the stage reuses the hazard's own marker of that
    ///    slug, or for unlinked entries a free-standing marker of that slug,
    ///    or else gets a new marker.
    /// 3. Linked effects are recreated as markers owned by the hazard.
    pub fn for_stage(
        hazard: &Hazard,
        markers: &[StatusMarker],
        catalog: &ConditionCatalog,
    ) -> Self {
        let resolver = OverrideResolver::new(catalog);
        let source = hazard.id();
        let prepared = resolver.resolve(markers.to_vec());

        let mut plan = Self::default();
        let (stale, kept): (Vec<StatusMarker>, Vec<StatusMarker>) = prepared
            .into_iter()
            .partition(|m| m.is_linked_to(source) && !m.expiring_without_duration);
        plan.deletions = stale.iter().map(|m| m.id).collect();

        // Activity as it will be once the stale markers are gone.
        let remaining = resolver.resolve(kept);

        let Some(stage) = hazard.current_stage() else {
            return plan;
        };

        let mut claimed: BTreeSet<EntityId> = BTreeSet::new();
        for entry in &stage.conditions {
            let ty = match catalog.lookup(&entry.slug) {
                Ok(ty) => ty,
                Err(err) => {
                    plan.skipped.push(err);
                    continue;
                }
            };
            let value = ty
                .is_valued
                .then(|| entry.value.filter(|v| *v >= 1).unwrap_or(1));

            let own = remaining
                .iter()
                .find(|m| m.applied_by == Some(source) && m.slug == entry.slug);
            let reused = own.or_else(|| {
                (!entry.linked)
                    .then(|| free_standing(&remaining, &entry.slug, &claimed))
                    .flatten()
            });

            match reused {
                Some(marker) => {
                    claimed.insert(marker.id);
                    let mut update = MarkerUpdate::confirm(marker.id, value);
                    // A linked entry takes over an unparented marker of its own.
                    if entry.linked && marker.parent_id != Some(source) {
                        update = update.linked_to(source);
                    }
                    plan.upsert_update(update);
                }
                None => {
                    let mut draft = MarkerDraft::new(entry.slug.clone())
                        .with_value(value)
                        .applied_by(source);
                    if entry.linked {
                        draft = draft.linked_to(source);
                    }
                    plan.upsert_creation(draft);
                }
            }
        }

        for effect in &stage.linked_effects {
            let existing = remaining
                .iter()
                .find(|m| m.applied_by == Some(source) && &m.slug == effect);
            if existing.is_none() {
                plan.upsert_creation(
                    MarkerDraft::new(effect.clone())
                        .applied_by(source)
                        .linked_to(source),
                );
            }
        }

        plan
    }

    /// Plans cleanup for a hazard that is being deleted.
    ///
    /// Linked markers go with it; expiring-without-duration survivors stay but
    /// are released from the parent link so they no longer count as locked.
    pub fn for_removal(
        hazard_id: EntityId,
        markers: &[StatusMarker],
        catalog: &ConditionCatalog,
    ) -> Self {
        let resolver = OverrideResolver::new(catalog);
        let mut plan = Self::default();

        for mut marker in markers.iter().cloned() {
            resolver.prepare(&mut marker);
            if marker.parent_id != Some(hazard_id) {
                continue;
            }
            if marker.expiring_without_duration {
                plan.updates.push(MarkerUpdate::release(marker.id));
            } else if marker.applied_by == Some(hazard_id) {
                plan.deletions.push(marker.id);
            } else {
                plan.updates.push(MarkerUpdate::release(marker.id));
            }
        }

        plan
    }

    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.creations.is_empty() && self.updates.is_empty()
    }

    // A later entry for the same slug replaces the earlier value.
    fn upsert_creation(&mut self, draft: MarkerDraft) {
        match self.creations.iter_mut().find(|d| d.slug == draft.slug) {
            Some(existing) => existing.value = draft.value.or(existing.value),
            None => self.creations.push(draft),
        }
    }

    fn upsert_update(&mut self, update: MarkerUpdate) {
        match self.updates.iter_mut().find(|u| u.id == update.id) {
            Some(existing) => {
                existing.value = update.value.or(existing.value);
                existing.link_parent = update.link_parent.or(existing.link_parent);
            }
            None => self.updates.push(update),
        }
    }
}

/// Best unowned, unlocked marker of `slug`: the active one, else the highest
/// value.
fn free_standing<'a>(
    markers: &'a [StatusMarker],
    slug: &str,
    claimed: &BTreeSet<EntityId>,
) -> Option<&'a StatusMarker> {
    let candidates: Vec<&StatusMarker> = markers
        .iter()
        .filter(|m| {
            m.slug == slug && m.applied_by.is_none() && !m.locked && !claimed.contains(&m.id)
        })
        .collect();

    candidates
        .iter()
        .copied()
        .find(|m| m.active)
        .or_else(|| candidates.iter().copied().max_by_key(|m| m.value.unwrap_or(0)))
}
