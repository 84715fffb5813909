use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::arena::DEFAULT_ARENA_CAPACITY;
use crate::encode::MIN_ENTRY_SIZE;
use crate::error::ConfigError;
use crate::ring::DEFAULT_RING_SIZE;

/// What a flush produces for each shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlushMode {
    /// Decoded, formatted lines.
    #[default]
    Text,
    /// The committed arena bytes, undecoded.
    Raw,
    Both,
}

impl FromStr for FlushMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(FlushMode::Text),
            "raw" => Ok(FlushMode::Raw),
            "both" => Ok(FlushMode::Both),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Bytes per arena.
    pub arena_capacity: usize,
    /// Arenas per shard.
    pub ring_size: usize,
    pub flush_mode: FlushMode,
    /// Directory for per-shard output files. Text goes to stderr if unset.
    pub output_dir: Option<PathBuf>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        TraceConfig {
            arena_capacity: DEFAULT_ARENA_CAPACITY,
            ring_size: DEFAULT_RING_SIZE,
            flush_mode: FlushMode::Text,
            output_dir: None,
        }
    }
}

const ENV_ARENA_CAPACITY: &str = "LOGTRACE_ARENA_CAPACITY";
const ENV_RING_SIZE: &str = "LOGTRACE_RING_SIZE";
const ENV_FLUSH_MODE: &str = "LOGTRACE_FLUSH_MODE";
const ENV_OUTPUT_DIR: &str = "LOGTRACE_OUTPUT_DIR";

fn parse_env<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}

impl TraceConfig {
    /// Parses a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: TraceConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// The default config with any `LOGTRACE_*` environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = TraceConfig::default();
        cfg.apply_env(|var| env::var(var).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = get(ENV_ARENA_CAPACITY) {
            self.arena_capacity = parse_env(ENV_ARENA_CAPACITY, v)?;
        }
        if let Some(v) = get(ENV_RING_SIZE) {
            self.ring_size = parse_env(ENV_RING_SIZE, v)?;
        }
        if let Some(v) = get(ENV_FLUSH_MODE) {
            self.flush_mode = parse_env(ENV_FLUSH_MODE, v)?;
        }
        if let Some(v) = get(ENV_OUTPUT_DIR).filter(|v| !v.is_empty()) {
            self.output_dir = Some(PathBuf::from(v));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.arena_capacity < MIN_ENTRY_SIZE {
            return Err(ConfigError::ArenaTooSmall(self.arena_capacity));
        }
        if self.ring_size < 2 {
            return Err(ConfigError::RingTooSmall(self.ring_size));
        }
        if self.flush_mode != FlushMode::Text && self.output_dir.is_none() {
            return Err(ConfigError::MissingOutputDir(self.flush_mode));
        }
        Ok(())
    }
}
