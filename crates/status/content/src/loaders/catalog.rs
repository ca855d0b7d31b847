//! Condition catalog loader.

use std::path::Path;

use serde::Deserialize;
use status_core::{ConditionCatalog, ConditionType, EngineConfig};

use crate::loaders::{LoadResult, read_file};

/// On-disk catalog layout.
///
/// ```toml
/// include_builtin = true
///
/// [[conditions]]
/// slug = "blinded"
/// static_overrides = ["dazzled"]
///
/// [[conditions]]
/// slug = "frightened"
/// is_valued = true
/// ```
#[derive(Debug, Deserialize)]
struct CatalogFile {
    /// Start from the built-in catalog and override/extend it.
    #[serde(default = "default_include_builtin")]
    include_builtin: bool,
    #[serde(default)]
    conditions: Vec<ConditionType>,
}

fn default_include_builtin() -> bool {
    true
}

/// Loader for the condition catalog from TOML files.
pub struct CatalogLoader;

impl CatalogLoader {
    /// Load a catalog; expiring flags are derived from `config`.
    pub fn load(path: &Path, config: &EngineConfig) -> LoadResult<ConditionCatalog> {
        let content = read_file(path)?;
        Self::parse(&content, config)
    }

    pub fn parse(content: &str, config: &EngineConfig) -> LoadResult<ConditionCatalog> {
        let file: CatalogFile = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse condition catalog TOML: {}", e))?;

        let mut catalog = if file.include_builtin {
            ConditionCatalog::builtin(config)
        } else {
            ConditionCatalog::new()
        };
        for ty in file.conditions {
            if ty.slug.trim().is_empty() {
                anyhow::bail!("Condition catalog entry with empty slug");
            }
            catalog.insert(ty);
        }
        catalog.apply_config(config);

        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extends_builtin_catalog() {
        let content = r#"
[[conditions]]
slug = "hexed"
is_valued = true
static_overrides = ["blessed"]
"#;
        let catalog = CatalogLoader::parse(content, &EngineConfig::default()).unwrap();
        assert!(catalog.contains("blinded"));
        let hexed = catalog.get("hexed").unwrap();
        assert!(hexed.is_valued);
        assert_eq!(hexed.static_overrides, vec!["blessed".to_string()]);
    }

    #[test]
    fn standalone_catalog_still_flags_expiring_types() {
        let content = r#"
include_builtin = false

[[conditions]]
slug = "frightened"
is_valued = true
"#;
        let catalog = CatalogLoader::parse(content, &EngineConfig::default()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("frightened").unwrap().expiring_without_duration);
    }

    #[test]
    fn rejects_empty_slug() {
        let content = "[[conditions]]\nslug = \" \"\n";
        assert!(CatalogLoader::parse(content, &EngineConfig::default()).is_err());
    }
}
