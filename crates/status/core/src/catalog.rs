//! Read-only catalog of status types.
//!
//! The catalog maps a slug to the type-level facts the resolver and the stage
//! planner need: whether the type carries a value, which other slugs it
//! suppresses outright, and whether it survives the hazard that granted it.
//! It is built once (from [`ConditionCatalog::builtin`] or content files) and
//! passed by reference; nothing mutates it during resolution.

use std::collections::BTreeMap;

use crate::config::EngineConfig;
use crate::error::{ErrorSeverity, StatusError};

/// Type-level description of one status type.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConditionType {
    pub slug: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_valued: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub static_overrides: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub expiring_without_duration: bool,
}

impl ConditionType {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            is_valued: false,
            static_overrides: Vec::new(),
            expiring_without_duration: false,
        }
    }

    pub fn valued(mut self) -> Self {
        self.is_valued = true;
        self
    }

    pub fn overrides(mut self, slugs: &[&str]) -> Self {
        self.static_overrides = slugs.iter().map(|s| (*s).to_string()).collect();
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("no status type is registered for slug `{slug}`")]
    UnknownMarkerReference { slug: String },
}

impl StatusError for CatalogError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Content
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownMarkerReference { .. } => "UNKNOWN_MARKER_REFERENCE",
        }
    }
}

/// Slug → type lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConditionCatalog {
    types: BTreeMap<String, ConditionType>,
}

impl ConditionCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog of the standard conditions, flagged per `config`.
    pub fn builtin(config: &EngineConfig) -> Self {
        let valued = [
            "clumsy",
            "doomed",
            "drained",
            "dying",
            "enfeebled",
            "frightened",
            "sickened",
            "slowed",
            "stunned",
            "stupefied",
            "wounded",
        ];
        let plain = [
            "broken",
            "concealed",
            "confused",
            "controlled",
            "dazzled",
            "deafened",
            "encumbered",
            "fascinated",
            "fatigued",
            "fleeing",
            "grabbed",
            "hidden",
            "immobilized",
            "invisible",
            "off-guard",
            "paralyzed",
            "petrified",
            "prone",
            "quickened",
            "unconscious",
            EngineConfig::PERSISTENT_DAMAGE_SLUG,
        ];

        let mut catalog = Self::new();
        for slug in valued {
            catalog.insert(ConditionType::new(slug).valued());
        }
        for slug in plain {
            catalog.insert(ConditionType::new(slug));
        }
        catalog.insert(ConditionType::new("blinded").overrides(&["dazzled"]));
        catalog.insert(ConditionType::new("restrained").overrides(&["grabbed"]));
        catalog.insert(
            ConditionType::new("stunned")
                .valued()
                .overrides(&["slowed"]),
        );
        catalog.insert(ConditionType::new("undetected").overrides(&["hidden"]));
        catalog.insert(ConditionType::new("unnoticed").overrides(&["undetected", "hidden"]));

        catalog.apply_config(config);
        catalog
    }

    /// Re-derives config-driven flags for every registered type.
    pub fn apply_config(&mut self, config: &EngineConfig) {
        for ty in self.types.values_mut() {
            ty.expiring_without_duration |= config.expires_without_duration(&ty.slug);
        }
    }

    /// Registers or replaces a type.
    pub fn insert(&mut self, ty: ConditionType) {
        self.types.insert(ty.slug.clone(), ty);
    }

    pub fn get(&self, slug: &str) -> Option<&ConditionType> {
        self.types.get(slug)
    }

    /// Like [`Self::get`], but reports unknown slugs as a content error.
    pub fn lookup(&self, slug: &str) -> Result<&ConditionType, CatalogError> {
        self.get(slug)
            .ok_or_else(|| CatalogError::UnknownMarkerReference {
                slug: slug.to_string(),
            })
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.types.contains_key(slug)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConditionType> {
        self.types.values()
    }
}

impl FromIterator<ConditionType> for ConditionCatalog {
    fn from_iter<I: IntoIterator<Item = ConditionType>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for ty in iter {
            catalog.insert(ty);
        }
        catalog
    }
}
