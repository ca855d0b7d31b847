//! Override resolution: which of a character's status markers are in force.
//!
//! Resolution is a single left-to-right sweep over the character's markers in
//! canonical order. Each marker that is still active suppresses:
//!
//! 1. every other marker whose slug it statically overrides, and
//! 2. every other active marker of the same key that it dominates.
//!
//! A marker suppressed earlier in the sweep never suppresses anything itself.
//! The sweep always starts from scratch, so re-running it over the same input
//! yields the same `active`/`overridden_by` fields.
//!
//! # Dominance
//!
//! | contenders                 | winner                                          |
//! |----------------------------|-------------------------------------------------|
//! | both persistent damage     | higher or equal expected value                  |
//! | equal values               | the earlier one, unless only the later is locked |
//! | different values           | the higher value                                |
//! | either value missing       | no one                                          |

use crate::catalog::ConditionCatalog;
use crate::state::{EntityId, StatusMarker};

/// Prepares markers against the catalog and runs the override sweep.
#[derive(Clone, Copy, Debug)]
pub struct OverrideResolver<'a> {
    catalog: &'a ConditionCatalog,
}

impl<'a> OverrideResolver<'a> {
    pub fn new(catalog: &'a ConditionCatalog) -> Self {
        Self { catalog }
    }

    /// Normalizes one marker before resolution.
    ///
    /// Copies type-level facts from the catalog (unknown slugs keep their own),
    /// keeps `value` in sync with `is_valued`, and recomputes `key` and
    /// `locked`.
    pub fn prepare(&self, marker: &mut StatusMarker) {
        if let Some(ty) = self.catalog.get(&marker.slug) {
            marker.is_valued = ty.is_valued;
            marker.static_overrides.clone_from(&ty.static_overrides);
            marker.expiring_without_duration = ty.expiring_without_duration;
        }

        marker.value = if marker.is_valued {
            Some(marker.value.filter(|value| *value >= 1).unwrap_or(1))
        } else {
            None
        };
        marker.key = marker.grouping_key();
        marker.locked = marker.is_locked();
    }

    /// Prepares every marker and computes `active`/`overridden_by`.
    pub fn resolve(&self, mut markers: Vec<StatusMarker>) -> Vec<StatusMarker> {
        for marker in &mut markers {
            self.prepare(marker);
        }
        resolve_overrides(&mut markers);
        markers
    }
}

/// Runs the override sweep over already-prepared markers, in place.
pub fn resolve_overrides(markers: &mut [StatusMarker]) {
    for marker in markers.iter_mut() {
        marker.active = true;
        marker.overridden_by.clear();
    }

    for index in 0..markers.len() {
        if !markers[index].active {
            continue;
        }
        let contender = Contender::of(&markers[index]);

        for (other_index, other) in markers.iter_mut().enumerate() {
            if other_index != index && contender.overrides_slug(&other.slug) {
                other.deactivate(contender.id);
            }
        }

        for (other_index, other) in markers.iter_mut().enumerate() {
            if other_index == index || !other.active || other.key != contender.key {
                continue;
            }
            if contender.dominates(other) {
                other.deactivate(contender.id);
            }
        }
    }
}

/// Snapshot of the sweeping marker, detached from the slice being mutated.
struct Contender {
    id: EntityId,
    key: String,
    value: Option<u32>,
    locked: bool,
    expected_value: Option<f64>,
    static_overrides: Vec<String>,
}

impl Contender {
    fn of(marker: &StatusMarker) -> Self {
        Self {
            id: marker.id,
            key: marker.key.clone(),
            value: marker.value,
            locked: marker.locked,
            expected_value: marker.persistent.as_ref().map(|info| info.expected_value),
            static_overrides: marker.static_overrides.clone(),
        }
    }

    fn overrides_slug(&self, slug: &str) -> bool {
        self.static_overrides.iter().any(|s| s == slug)
    }

    fn dominates(&self, other: &StatusMarker) -> bool {
        if let (Some(mine), Some(theirs)) = (self.expected_value, other.persistent.as_ref()) {
            return mine >= theirs.expected_value;
        }

        match (self.value, other.value) {
            // A tie goes to the earlier marker unless only the later one is locked.
            (Some(mine), Some(theirs)) if mine == theirs => self.locked || !other.locked,
            (Some(mine), Some(theirs)) => mine > theirs,
            _ => false,
        }
    }
}
