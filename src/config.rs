// SPDX-License-Identifier: GPL-3.0-only

//! Pipeline configuration
//!
//! Every field has a default from [`crate::constants`], so a config file
//! only needs the values it wants to override.

use crate::constants;
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Point sampler tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Length of the sampling window
    pub window_ms: u64,
    /// Interval between sample ticks
    pub interval_ms: u64,
    /// Minimum accepted samples for a stabilized point
    pub min_samples: usize,
    /// Maximum stability spread (cm)
    pub max_spread_cm: f64,
    /// Consecutive bad-tracking ticks tolerated
    pub max_bad_tracking_frames: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            window_ms: constants::SAMPLING_WINDOW_MS,
            interval_ms: constants::SAMPLE_INTERVAL_MS,
            min_samples: constants::MIN_SAMPLES,
            max_spread_cm: constants::MAX_STABILITY_SPREAD_CM,
            max_bad_tracking_frames: constants::MAX_BAD_TRACKING_FRAMES,
        }
    }
}

impl SamplingConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Flow controller tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Max height difference between door bottom corners (meters)
    pub level_threshold_m: f64,
    /// Uncertainty floor for every measurement (cm)
    pub base_uncertainty_cm: f64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            level_threshold_m: constants::LEVEL_THRESHOLD_M,
            base_uncertainty_cm: constants::BASE_UNCERTAINTY_CM,
        }
    }
}

/// Verdict engine thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerdictConfig {
    /// Clearance required beyond uncertainty before a Pass (cm)
    pub safety_margin_cm: f64,
    /// Lowest confidence that can still Pass
    pub min_pass_confidence: f64,
}

impl Default for VerdictConfig {
    fn default() -> Self {
        Self {
            safety_margin_cm: constants::SAFETY_MARGIN_CM,
            min_pass_confidence: constants::MIN_PASS_CONFIDENCE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sampling: SamplingConfig,
    pub flow: FlowConfig,
    pub verdict: VerdictConfig,
    /// Product catalog to use instead of the built-in one
    pub catalog_path: Option<PathBuf>,
}

impl Config {
    /// Default config file location, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| {
            dir.join(constants::APP_DIR_NAME)
                .join(constants::CONFIG_FILE_NAME)
        })
    }

    /// Load a config file
    pub fn load(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::from_json(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config {}: {e}", path.display())))
    }

    /// Parse config JSON
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    /// Load from the default location, falling back to defaults when the file
    /// doesn't exist
    pub fn load_or_default() -> AppResult<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => {
                info!(path = %path.display(), "Loading config");
                Self::load(&path)
            }
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Config(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }
        let json = self.to_json()?;
        std::fs::write(path, json)
            .map_err(|e| AppError::Config(format!("Failed to write {}: {e}", path.display())))
    }

    pub fn to_json(&self) -> AppResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(format!("Failed to serialize config: {e}")))
    }
}
