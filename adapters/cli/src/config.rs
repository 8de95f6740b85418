//! Replay settings read from an optional TOML file.

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use rescue_replay_system_replay::ReplayConfig;
use serde::Deserialize;

/// Settings accepted in the `--config` file. Every key is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FileConfig {
    /// Pause after every applied event, in milliseconds.
    pub(crate) event_delay_ms: Option<u64>,
    /// Number of cosmetic victim variants.
    pub(crate) victim_variants: Option<u8>,
    /// Seed of the cosmetic random number generator.
    pub(crate) seed: Option<u64>,
}

impl FileConfig {
    /// Reads and parses the file at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub(crate) fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("invalid replay config toml")
    }
}

/// Values given on the command line. They win over the config file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Overrides {
    pub(crate) delay_ms: Option<u64>,
    pub(crate) seed: Option<u64>,
}

/// Merges defaults, the config file and command-line overrides, in that order.
pub(crate) fn resolve(file: &FileConfig, overrides: Overrides) -> ReplayConfig {
    let defaults = ReplayConfig::default();
    let event_delay = overrides
        .delay_ms
        .or(file.event_delay_ms)
        .map_or(defaults.event_delay, Duration::from_millis);

    ReplayConfig {
        event_delay,
        victim_variants: file.victim_variants.unwrap_or(defaults.victim_variants),
        seed: overrides.seed.or(file.seed).unwrap_or(defaults.seed),
    }
}
