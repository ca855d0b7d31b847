//! CLI configuration read from the environment.
use std::env;
use std::path::PathBuf;

/// Defaults applied when a command-line flag is omitted.
#[derive(Clone, Debug)]
pub struct CliConfig {
    pub data_dir: PathBuf,
    pub seed: u64,
    pub event_buffer: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            seed: 0,
            event_buffer: 100,
        }
    }
}

impl CliConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `STATUS_DATA_DIR` - Content directory (default: `data`)
    /// - `STATUS_SEED` - Seed for the d20 saving throw service (default: 0)
    /// - `STATUS_EVENT_BUFFER` - Event bus capacity per topic (default: 100)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = env::var("STATUS_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(seed) = read_env::<u64>("STATUS_SEED") {
            config.seed = seed;
        }
        if let Some(capacity) = read_env::<usize>("STATUS_EVENT_BUFFER") {
            config.event_buffer = capacity.max(1);
        }

        config
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
