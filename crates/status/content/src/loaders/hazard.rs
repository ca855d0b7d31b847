//! Hazard definition loader.
//!
//! Hazards are authored in RON, one per file:
//!
//! ```ron
//! (
//!     name: "Giant Centipede Venom",
//!     save_dc: 14,
//!     save_type: Fortitude,
//!     onset: Some((ready_in: 60)),
//!     stages: [
//!         (damage: [(formula: "1d6", damage_type: "poison")],
//!          conditions: [(slug: "clumsy", value: Some(1))]),
//!         (damage: [(formula: "1d8", damage_type: "poison")],
//!          conditions: [(slug: "clumsy", value: Some(2))]),
//!     ],
//! )
//! ```

use std::path::Path;

use serde::Deserialize;
use status_core::{EntityId, Hazard, Onset, SaveType, StageDefinition, WorldTime};

use crate::loaders::{LoadResult, read_file};

/// Authored onset: a delay relative to when the hazard is applied.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct OnsetSpec {
    /// Seconds of world time until the onset elapses.
    pub ready_in: u64,
    #[serde(default)]
    pub initiative: Option<i32>,
}

/// Authored hazard, before it is placed on a character.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct HazardSpec {
    pub name: String,
    pub save_dc: u32,
    pub save_type: SaveType,
    #[serde(default)]
    pub onset: Option<OnsetSpec>,
    #[serde(default)]
    pub stages: Vec<StageDefinition>,
}

impl HazardSpec {
    /// Builds a hazard applied at `now`; the onset, if any, is scheduled
    /// relative to it.
    pub fn instantiate(&self, id: EntityId, now: WorldTime) -> Hazard {
        let hazard = Hazard::new(
            id,
            self.name.clone(),
            self.save_dc,
            self.save_type,
            self.stages.clone(),
        );
        match &self.onset {
            Some(spec) => {
                let mut onset = Onset::new(now + spec.ready_in);
                onset.initiative = spec.initiative;
                hazard.with_onset(onset)
            }
            None => hazard,
        }
    }
}

/// Loader for hazard definitions from RON files.
pub struct HazardLoader;

impl HazardLoader {
    pub fn load(path: &Path) -> LoadResult<HazardSpec> {
        let content = read_file(path)?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Failed to load hazard {}: {}", path.display(), e))
    }

    pub fn parse(content: &str) -> LoadResult<HazardSpec> {
        let spec: HazardSpec = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse hazard RON: {}", e))?;

        if spec.stages.is_empty() {
            anyhow::bail!("Hazard '{}' defines no stages", spec.name);
        }
        for (index, stage) in spec.stages.iter().enumerate() {
            if let Some(entry) = stage.conditions.iter().find(|c| c.slug.trim().is_empty()) {
                anyhow::bail!(
                    "Hazard '{}' stage {} has a condition with empty slug {:?}",
                    spec.name,
                    index + 1,
                    entry
                );
            }
        }

        Ok(spec)
    }
}
