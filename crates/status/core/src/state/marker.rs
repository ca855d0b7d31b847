//! Status markers applied to a character.
//!
//! A marker is one applied instance of a status type ("frightened 2",
//! "persistent fire damage"). Fields split into three groups:
//!
//! - **Stored**: `id`, `slug`, `value`, `applied_by`, `parent_id`, `grant`,
//!   `persistent`. These are what the entity store persists.
//! - **Type-level**: `is_valued`, `static_overrides`,
//!   `expiring_without_duration`. Copied from the condition catalog during
//!   preparation.
//! - **Derived**: `key`, `locked`, `active`, `overridden_by`. Recomputed from
//!   scratch on every resolution pass and never treated as authoritative.

use crate::config::EngineConfig;
use crate::state::EntityId;

/// Persistent-damage payload carried by `persistent-damage` markers.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PersistentInfo {
    pub damage_type: String,
    pub formula: String,
    pub dc: u32,
    /// Mean of `formula`; compared instead of `value` for this subtype.
    pub expected_value: f64,
}

/// Grant record left on a marker by the entity that granted it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GrantRecord {
    pub granter: EntityId,
    /// The granter forbids removing this marker on its own.
    pub restrict: bool,
}

/// One applied status effect instance.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusMarker {
    pub id: EntityId,
    pub slug: String,
    pub key: String,
    pub value: Option<u32>,
    pub applied_by: Option<EntityId>,
    pub parent_id: Option<EntityId>,
    pub grant: Option<GrantRecord>,
    pub persistent: Option<PersistentInfo>,

    pub is_valued: bool,
    pub static_overrides: Vec<String>,
    pub expiring_without_duration: bool,

    pub locked: bool,
    pub active: bool,
    pub overridden_by: Vec<EntityId>,
}

impl StatusMarker {
    /// Creates an unvalued marker; type-level fields are filled in by
    /// [`crate::OverrideResolver::prepare`].
    pub fn new(id: EntityId, slug: impl Into<String>) -> Self {
        let slug = slug.into();
        Self {
            id,
            key: slug.clone(),
            slug,
            value: None,
            applied_by: None,
            parent_id: None,
            grant: None,
            persistent: None,
            is_valued: false,
            static_overrides: Vec::new(),
            expiring_without_duration: false,
            locked: false,
            active: true,
            overridden_by: Vec::new(),
        }
    }

    /// Creates a persistent-damage marker of the given damage type.
    pub fn persistent(id: EntityId, info: PersistentInfo) -> Self {
        let mut marker = Self::new(id, EngineConfig::PERSISTENT_DAMAGE_SLUG);
        marker.persistent = Some(info);
        marker.key = marker.grouping_key();
        marker
    }

    /// Materializes a stored marker from a creation request.
    pub fn from_draft(id: EntityId, draft: MarkerDraft) -> Self {
        let mut marker = Self::new(id, draft.slug);
        marker.value = draft.value;
        marker.applied_by = draft.applied_by;
        marker.parent_id = draft.parent_id;
        marker.grant = draft.grant;
        marker.persistent = draft.persistent;
        marker.key = marker.grouping_key();
        marker.locked = marker.is_locked();
        marker
    }

    pub fn with_value(mut self, value: u32) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_applied_by(mut self, source: EntityId) -> Self {
        self.applied_by = Some(source);
        self
    }

    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent_id = Some(parent);
        self.locked = true;
        self
    }

    pub fn with_grant(mut self, grant: GrantRecord) -> Self {
        self.grant = Some(grant);
        self.locked = self.is_locked();
        self
    }

    /// Grouping identity: the slug, or the damage type for persistent damage.
    pub fn grouping_key(&self) -> String {
        match &self.persistent {
            Some(info) => format!("{}{}", EngineConfig::PERSISTENT_KEY_PREFIX, info.damage_type),
            None => self.slug.clone(),
        }
    }

    /// A marker is locked when it is strictly parented or its grant restricts
    /// removal.
    pub fn is_locked(&self) -> bool {
        self.parent_id.is_some() || self.grant.is_some_and(|grant| grant.restrict)
    }

    pub fn is_persistent_damage(&self) -> bool {
        self.persistent.is_some()
    }

    /// Returns true if the marker was granted by `source` and is strictly
    /// linked to it.
    pub fn is_linked_to(&self, source: EntityId) -> bool {
        self.applied_by == Some(source) && self.parent_id == Some(source)
    }

    pub(crate) fn deactivate(&mut self, by: EntityId) {
        self.active = false;
        self.overridden_by.push(by);
    }
}

/// Creation request for a marker the store has not minted yet.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MarkerDraft {
    pub slug: String,
    pub value: Option<u32>,
    pub applied_by: Option<EntityId>,
    pub parent_id: Option<EntityId>,
    pub grant: Option<GrantRecord>,
    pub persistent: Option<PersistentInfo>,
}

impl MarkerDraft {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            value: None,
            applied_by: None,
            parent_id: None,
            grant: None,
            persistent: None,
        }
    }

    pub fn with_value(mut self, value: Option<u32>) -> Self {
        self.value = value;
        self
    }

    pub fn applied_by(mut self, source: EntityId) -> Self {
        self.applied_by = Some(source);
        self
    }

    pub fn linked_to(mut self, parent: EntityId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    pub fn with_grant(mut self, grant: GrantRecord) -> Self {
        self.grant = Some(grant);
        self
    }

    pub fn with_persistent(mut self, info: PersistentInfo) -> Self {
        self.slug = EngineConfig::PERSISTENT_DAMAGE_SLUG.to_string();
        self.persistent = Some(info);
        self
    }
}

/// Field changes for an existing marker.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MarkerUpdate {
    pub id: EntityId,
    /// New value; `None` leaves the stored value untouched.
    pub value: Option<u32>,
    /// Drop the parent link so the marker outlives its parent unlocked.
    pub release_parent: bool,
    /// Link the marker to this parent, locking it.
    #[cfg_attr(feature = "serde", serde(default))]
    pub link_parent: Option<EntityId>,
}

impl MarkerUpdate {
    pub fn confirm(id: EntityId, value: Option<u32>) -> Self {
        Self {
            id,
            value,
            release_parent: false,
            link_parent: None,
        }
    }

    pub fn release(id: EntityId) -> Self {
        Self {
            release_parent: true,
            ..Self::confirm(id, None)
        }
    }

    pub fn linked_to(mut self, parent: EntityId) -> Self {
        self.link_parent = Some(parent);
        self
    }

    /// Applies the changes to a stored marker.
    pub fn apply_to(&self, marker: &mut StatusMarker) {
        if let Some(value) = self.value {
            marker.value = Some(value);
        }
        if self.release_parent {
            marker.parent_id = None;
        }
        if let Some(parent) = self.link_parent {
            marker.parent_id = Some(parent);
        }
        marker.locked = marker.is_locked();
    }
}
