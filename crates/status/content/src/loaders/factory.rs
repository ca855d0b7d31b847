//! Content factory for loading status content from a data directory.

use std::path::{Path, PathBuf};

use status_core::{ConditionCatalog, EngineConfig};

use crate::loaders::{CatalogLoader, ConfigLoader, HazardLoader, HazardSpec, LoadResult};

/// Content factory that loads all status content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── engine.toml        (optional)
/// ├── conditions.toml    (optional)
/// └── hazards/
///     ├── giant-centipede-venom.ron
///     └── wasting-fever.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    /// Creates a new content factory pointing to a data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load engine configuration from `engine.toml`, or defaults if absent.
    pub fn load_config(&self) -> LoadResult<EngineConfig> {
        let path = self.data_dir.join("engine.toml");
        if path.exists() {
            ConfigLoader::load(&path)
        } else {
            Ok(EngineConfig::default())
        }
    }

    /// Load the condition catalog from `conditions.toml`, or the built-in
    /// catalog if absent.
    pub fn load_catalog(&self, config: &EngineConfig) -> LoadResult<ConditionCatalog> {
        let path = self.data_dir.join("conditions.toml");
        if path.exists() {
            CatalogLoader::load(&path, config)
        } else {
            Ok(ConditionCatalog::builtin(config))
        }
    }

    /// Load a hazard from `hazards/{name}.ron`.
    pub fn load_hazard(&self, name: &str) -> LoadResult<HazardSpec> {
        let path = self.data_dir.join("hazards").join(format!("{}.ron", name));
        HazardLoader::load(&path)
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
