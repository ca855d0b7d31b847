//! Apply a hazard to a fresh character and walk it through a script.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use status_content::ContentFactory;
use status_core::{
    ActorId, EntityId, HazardOutcome, HazardStage, SaveType, StatusMarker, WorldTime,
};
use status_runtime::{
    AverageDamageEvaluator, D20SavingThrow, InMemoryEntityStore, RuntimeConfig, StageEngine,
};
use strum::IntoEnumIterator;

use crate::config::CliConfig;
use crate::script::{MarkerArg, Step};

const CHARACTER: ActorId = ActorId(1);

/// Apply a hazard and run a scripted sequence of steps
#[derive(Parser)]
pub struct Run {
    /// Hazard file name under `hazards/`, without the `.ron` extension
    #[arg(value_name = "HAZARD")]
    hazard: String,

    /// Steps to run in order: increase, decrease, recover, expire@SECONDS
    #[arg(short, long, value_delimiter = ',', value_name = "STEPS")]
    steps: Vec<Step>,

    /// Markers on the character before the hazard is applied (slug or slug=value)
    #[arg(short, long = "marker", value_name = "MARKER")]
    markers: Vec<MarkerArg>,

    /// World time at which the hazard is applied
    #[arg(long, default_value_t = 0)]
    at: u64,

    /// Modifier added to the character's recovery saves
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    modifier: i32,

    /// Seed for the saving throw dice (overrides STATUS_SEED)
    #[arg(long)]
    seed: Option<u64>,

    /// Content directory (overrides STATUS_DATA_DIR)
    #[arg(short, long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Print the final markers as JSON
    #[arg(long)]
    json: bool,
}

impl Run {
    pub async fn execute(self, config: CliConfig) -> Result<()> {
        let data_dir = self.data_dir.unwrap_or(config.data_dir);
        let factory = ContentFactory::new(&data_dir);
        let engine_config = factory.load_config()?;
        let catalog = factory.load_catalog(&engine_config)?;
        let spec = factory
            .load_hazard(&self.hazard)
            .with_context(|| format!("Failed to load hazard '{}'", self.hazard))?;

        let store = Arc::new(InMemoryEntityStore::new());
        store.add_actor(CHARACTER)?;
        for marker in &self.markers {
            store.insert_marker(CHARACTER, marker.draft())?;
        }

        let seed = self.seed.unwrap_or(config.seed);
        let saves = SaveType::iter().fold(D20SavingThrow::new(seed), |saves, save| {
            saves.with_modifier(CHARACTER, save, self.modifier)
        });
        let engine = StageEngine::builder()
            .config(RuntimeConfig {
                engine: engine_config,
                event_buffer_size: config.event_buffer,
            })
            .store(store)
            .damage_evaluator(Arc::new(AverageDamageEvaluator))
            .saving_throws(Arc::new(saves))
            .catalog(catalog)
            .build()?;

        let applied_at = WorldTime(self.at);
        let outcome = engine
            .apply_hazard(CHARACTER, spec.instantiate(EntityId(0), applied_at))
            .await?;
        let hazard = outcome.hazard;
        println!("apply {} at t={}: {}", spec.name, applied_at.0, describe(&outcome));

        for step in &self.steps {
            match step {
                Step::Advance(direction) => {
                    let outcome = engine.advance_hazard(hazard, *direction).await?;
                    println!("{step}: {}", describe(&outcome));
                    if outcome.is_removed() {
                        break;
                    }
                }
                Step::Recover => {
                    let outcome = engine.recover_hazard(hazard).await?;
                    println!("{step}: {}", describe(&outcome));
                    if outcome.is_removed() {
                        break;
                    }
                }
                Step::Expire(now) => {
                    let outcomes = engine.expire_onsets(CHARACTER, *now).await?;
                    if outcomes.is_empty() {
                        println!("{step}: no onset elapsed");
                    }
                    for outcome in &outcomes {
                        println!("{step}: {}", describe(outcome));
                    }
                }
            }
        }

        let markers = engine.resolved_markers(CHARACTER).await?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&markers)?);
        } else {
            print_markers(&markers);
        }
        Ok(())
    }
}

fn describe(outcome: &HazardOutcome) -> String {
    let stage = match outcome.new_stage {
        HazardStage::Stage(stage) => format!("stage {stage}"),
        HazardStage::Removed => "removed".to_string(),
    };
    match &outcome.damage {
        Some(damage) => format!("{stage}, {} damage ({})", damage.total, damage.breakdown),
        None => stage,
    }
}

fn print_markers(markers: &[StatusMarker]) {
    if markers.is_empty() {
        println!("no markers");
        return;
    }
    println!("{:<6} {:<24} {:>5}  {:<8} overridden by", "id", "key", "value", "state");
    for marker in markers {
        let value = marker
            .value
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        let state = match (marker.active, marker.is_locked()) {
            (true, true) => "locked",
            (true, false) => "active",
            (false, _) => "inactive",
        };
        let by = marker
            .overridden_by
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "{:<6} {:<24} {:>5}  {:<8} {}",
            marker.id.to_string(),
            marker.key,
            value,
            state,
            by
        );
    }
}
