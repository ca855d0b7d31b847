//! List the condition catalog a data directory resolves to.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use status_content::ContentFactory;

use crate::config::CliConfig;

/// List known condition types
#[derive(Parser)]
pub struct Catalog {
    /// Content directory (overrides STATUS_DATA_DIR)
    #[arg(short, long, value_name = "DIR")]
    data_dir: Option<PathBuf>,
}

impl Catalog {
    pub fn execute(self, config: CliConfig) -> Result<()> {
        let factory = ContentFactory::new(self.data_dir.unwrap_or(config.data_dir));
        let engine_config = factory.load_config()?;
        let catalog = factory.load_catalog(&engine_config)?;

        println!("{} condition types", catalog.len());
        for ty in catalog.iter() {
            let mut flags = Vec::new();
            if ty.is_valued {
                flags.push("valued".to_string());
            }
            if ty.expiring_without_duration {
                flags.push("expiring".to_string());
            }
            if !ty.static_overrides.is_empty() {
                flags.push(format!("overrides {}", ty.static_overrides.join(", ")));
            }
            println!("  {:<16} {}", ty.slug, flags.join("; "));
        }
        Ok(())
    }
}
