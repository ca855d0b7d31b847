/// Engine configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Condition slugs that outlive the hazard that granted them.
    ///
    /// Markers of these types are never removed by stage cleanup; they are
    /// expected to wear off through the host's own rules.
    pub expiring_without_duration: Vec<String>,

    /// Flat-check DC attached to persistent damage when content omits one.
    pub persistent_damage_dc: u32,
}

impl EngineConfig {
    // ===== fixed identifiers =====
    /// Slug shared by every persistent-damage marker.
    pub const PERSISTENT_DAMAGE_SLUG: &'static str = "persistent-damage";
    /// Grouping key prefix for persistent damage (`persistent-damage-fire`, ...).
    pub const PERSISTENT_KEY_PREFIX: &'static str = "persistent-damage-";

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_EXPIRING_WITHOUT_DURATION: [&'static str; 6] = [
        "frightened",
        "sickened",
        "drained",
        "doomed",
        "stunned",
        "unconscious",
    ];
    pub const DEFAULT_PERSISTENT_DAMAGE_DC: u32 = 15;

    pub fn new() -> Self {
        Self {
            expiring_without_duration: Self::DEFAULT_EXPIRING_WITHOUT_DURATION
                .iter()
                .map(|slug| (*slug).to_string())
                .collect(),
            persistent_damage_dc: Self::DEFAULT_PERSISTENT_DAMAGE_DC,
        }
    }

    /// Returns true if markers of this slug survive their granting hazard.
    pub fn expires_without_duration(&self, slug: &str) -> bool {
        self.expiring_without_duration.iter().any(|s| s == slug)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
