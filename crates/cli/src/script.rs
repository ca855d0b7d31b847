//! Scripted hazard steps and pre-placed markers given on the command line.
use std::fmt;
use std::str::FromStr;

use status_core::{MarkerDraft, StageDirection, WorldTime};

/// One step of a scripted run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Advance(StageDirection),
    Recover,
    /// Advance world time and clear any elapsed onsets.
    Expire(WorldTime),
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(time) = s.strip_prefix("expire@") {
            return time
                .parse()
                .map(|seconds| Step::Expire(WorldTime(seconds)))
                .map_err(|_| format!("invalid world time in `{s}`"));
        }
        match s.to_ascii_lowercase().as_str() {
            "recover" => Ok(Step::Recover),
            other => other
                .parse::<StageDirection>()
                .map(Step::Advance)
                .map_err(|_| {
                    format!("unknown step `{s}` (expected increase, decrease, recover, expire@N)")
                }),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Advance(direction) => write!(f, "{direction}"),
            Step::Recover => write!(f, "recover"),
            Step::Expire(time) => write!(f, "expire@{}", time.0),
        }
    }
}

/// A marker placed on the character before the script runs: `slug` or
/// `slug=value`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkerArg {
    pub slug: String,
    pub value: Option<u32>,
}

impl MarkerArg {
    pub fn draft(&self) -> MarkerDraft {
        MarkerDraft::new(self.slug.clone()).with_value(self.value)
    }
}

impl FromStr for MarkerArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (slug, value) = match s.split_once('=') {
            Some((slug, value)) => {
                let value = value
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid marker value in `{s}`"))?;
                (slug, Some(value))
            }
            None => (s, None),
        };
        let slug = slug.trim();
        if slug.is_empty() {
            return Err(format!("missing marker slug in `{s}`"));
        }
        Ok(Self {
            slug: slug.to_string(),
            value,
        })
    }
}
