// src/config/engine.rs
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::lifecycle::DEFAULT_MODEL_PATH;
use crate::settings::Settings;
use crate::training::TrainingParams;

pub const DEFAULT_CONFIG_PATH: &str = "config/phishguard.toml";
pub const DEFAULT_RDAP_ENDPOINT: &str = "https://rdap.org/domain/";
pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 1500;

pub const ENV_CONFIG_PATH: &str = "PHISHGUARD_CONFIG_PATH";
pub const ENV_MODEL_PATH: &str = "PHISHGUARD_MODEL_PATH";
pub const ENV_THRESHOLD: &str = "PHISHGUARD_THRESHOLD";
pub const ENV_LOOKUP: &str = "PHISHGUARD_LOOKUP";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    pub path: PathBuf,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_MODEL_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupSection {
    pub enabled: bool,
    pub endpoint: String,
    pub timeout_ms: u64,
}

impl Default for LookupSection {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: DEFAULT_RDAP_ENDPOINT.to_string(),
            timeout_ms: DEFAULT_LOOKUP_TIMEOUT_MS,
        }
    }
}

impl LookupSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Engine configuration. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub model: ModelSection,
    pub training: TrainingParams,
    pub lookup: LookupSection,
    pub defaults: Settings,
}

impl EngineConfig {
    /// Resolve `$PHISHGUARD_CONFIG_PATH`, then `config/phishguard.toml`, then
    /// built-in defaults; apply env overrides last.
    ///
    /// An explicitly configured path that cannot be read is an error; a
    /// missing default file is not.
    pub fn load() -> anyhow::Result<Self> {
        let cfg = match env::var(ENV_CONFIG_PATH) {
            Ok(p) => Self::from_file(&p)?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).is_file() => Self::from_file(DEFAULT_CONFIG_PATH)?,
            Err(_) => Self::default(),
        };
        Ok(cfg.with_env_overrides())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read engine config at {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse engine config at {}", path.display()))
    }

    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let cfg: EngineConfig = toml::from_str(toml_str)?;
        Ok(cfg.sanitized())
    }

    /// Clamp every numeric knob into range.
    pub fn sanitized(mut self) -> Self {
        self.training = self.training.sanitized();
        self.defaults = self.defaults.sanitized();
        if self.lookup.timeout_ms == 0 {
            self.lookup.timeout_ms = DEFAULT_LOOKUP_TIMEOUT_MS;
        }
        self
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Some(p) = env::var(ENV_MODEL_PATH).ok().filter(|p| !p.trim().is_empty()) {
            self.model.path = PathBuf::from(p);
        }
        if let Some(t) = parse_threshold_env(env::var(ENV_THRESHOLD).ok()) {
            self.defaults.threshold = t;
        }
        if let Ok(v) = env::var(ENV_LOOKUP) {
            self.lookup.enabled = v.trim() == "1";
        }
        self
    }
}

// parse optional float env and clamp to <0.0..=1.0>
pub(crate) fn parse_threshold_env(raw: Option<String>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
}
