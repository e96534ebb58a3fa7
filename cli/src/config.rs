//! Configuration management for the facecrm CLI.
//!
//! Configuration is stored in ~/.facecrm/{app_name}/config.yaml

use std::path::{Path, PathBuf};
use std::time::Duration;

use facecrm_faceid::{DEFAULT_DIMENSION, DEFAULT_THRESHOLD, MatchConfig};
use facecrm_recognize::{FrameConstraints, RecognizerConfig};
use serde::{Deserialize, Serialize};

use crate::paths::{DEFAULT_CONFIG_FILE, Paths, StoreLayout};

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Application name (not serialized).
    #[serde(skip)]
    pub app_name: String,

    #[serde(default)]
    pub matching: MatchingConfig,

    #[serde(default)]
    pub recognition: RecognitionConfig,

    #[serde(default)]
    pub store: StoreConfig,

    /// Path to the config file (not serialized).
    #[serde(skip)]
    config_path: PathBuf,
}

/// Face matching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Maximum Euclidean distance (exclusive) for a match.
    pub threshold: f32,

    /// Embedding dimensionality produced by the face model.
    pub dimension: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            dimension: DEFAULT_DIMENSION,
        }
    }
}

/// Scan loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    pub interval_ms: u64,
    pub backoff_ms: u64,
    /// Zero writes `last_seen` on every matching cycle.
    pub last_seen_throttle_secs: u64,
    pub width: u32,
    pub height: u32,
    pub event_buffer: usize,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        let d = RecognizerConfig::default();
        Self {
            interval_ms: d.interval.as_millis() as u64,
            backoff_ms: d.backoff.as_millis() as u64,
            last_seen_throttle_secs: d.last_seen_throttle.as_secs(),
            width: d.constraints.width,
            height: d.constraints.height,
            event_buffer: d.event_buffer,
        }
    }
}

/// Contact store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Data directory. Empty means ~/.facecrm/<app>/data.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
}

impl Config {
    /// Gets the default config directory.
    pub fn default_config_dir(app_name: &str) -> Option<PathBuf> {
        Paths::new(app_name).ok().map(|p| p.app_dir())
    }

    /// Gets the default config file path.
    pub fn default_config_path(app_name: &str) -> Option<PathBuf> {
        Self::default_config_dir(app_name).map(|dir| dir.join(DEFAULT_CONFIG_FILE))
    }

    /// Returns the config file path.
    pub fn path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Returns the config directory path.
    pub fn dir(&self) -> Option<&Path> {
        self.config_path.parent()
    }

    /// Saves the configuration to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        self.validate()?;
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }

    /// Rejects settings the matcher or scan loop cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let m = &self.matching;
        if !(m.threshold.is_finite() && m.threshold > 0.0) {
            anyhow::bail!("matching.threshold must be a positive number, got {}", m.threshold);
        }
        if m.dimension == 0 {
            anyhow::bail!("matching.dimension must be positive");
        }
        let r = &self.recognition;
        if r.interval_ms == 0 {
            anyhow::bail!("recognition.interval_ms must be positive");
        }
        if r.backoff_ms == 0 {
            anyhow::bail!("recognition.backoff_ms must be positive");
        }
        if r.event_buffer == 0 {
            anyhow::bail!("recognition.event_buffer must be positive");
        }
        Ok(())
    }

    /// Updates the match threshold and saves.
    pub fn set_threshold(&mut self, threshold: f32) -> anyhow::Result<()> {
        let previous = self.matching.threshold;
        self.matching.threshold = threshold;
        if let Err(e) = self.save() {
            self.matching.threshold = previous;
            return Err(e);
        }
        Ok(())
    }

    pub fn match_config(&self) -> MatchConfig {
        MatchConfig {
            threshold: self.matching.threshold,
            dimension: self.matching.dimension,
        }
    }

    pub fn recognizer_config(&self) -> RecognizerConfig {
        let r = &self.recognition;
        RecognizerConfig {
            interval: Duration::from_millis(r.interval_ms),
            backoff: Duration::from_millis(r.backoff_ms),
            constraints: FrameConstraints {
                width: r.width,
                height: r.height,
            },
            last_seen_throttle: Duration::from_secs(r.last_seen_throttle_secs),
            event_buffer: r.event_buffer,
        }
    }

    /// Resolves the contact store directory.
    ///
    /// A relative `store.path` is taken relative to the config directory.
    pub fn store_layout(&self) -> anyhow::Result<StoreLayout> {
        if self.store.path.is_empty() {
            let base = match self.dir() {
                Some(dir) if !dir.as_os_str().is_empty() => dir.join("data"),
                _ => Paths::new(&self.app_name)?.data_dir(),
            };
            return Ok(StoreLayout::new(base));
        }
        let p = PathBuf::from(&self.store.path);
        if p.is_absolute() {
            return Ok(StoreLayout::new(p));
        }
        match self.dir() {
            Some(dir) => Ok(StoreLayout::new(dir.join(p))),
            None => Ok(StoreLayout::new(p)),
        }
    }
}

fn resolve_path(app_name: &str, custom_path: Option<&str>) -> anyhow::Result<PathBuf> {
    match custom_path {
        Some(p) => Ok(PathBuf::from(p)),
        None => Config::default_config_path(app_name)
            .ok_or_else(|| anyhow::anyhow!("cannot determine config path")),
    }
}

/// Loads configuration for the specified app.
///
/// A missing file is created with default settings.
pub fn load_config(app_name: &str, custom_path: Option<&str>) -> anyhow::Result<Config> {
    let config_path = resolve_path(app_name, custom_path)?;

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut cfg: Config = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        if content.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(&content)?
        }
    } else {
        let cfg = Config::default();
        let content = serde_yaml::to_string(&cfg)?;
        std::fs::write(&config_path, content)?;
        cfg
    };

    cfg.app_name = app_name.to_string();
    cfg.config_path = config_path;
    cfg.validate()?;

    Ok(cfg)
}

/// Saves configuration to the specified path.
pub fn save_config(
    app_name: &str,
    config: &Config,
    custom_path: Option<&str>,
) -> anyhow::Result<()> {
    config.validate()?;
    let config_path = resolve_path(app_name, custom_path)?;

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_yaml::to_string(config)?;
    std::fs::write(&config_path, content)?;
    Ok(())
}
