//! Rotation configuration loading
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `ROTATION_CONFIG` environment variable
//! 3. `<config_dir>/rotation-engine/config.toml`
//! 4. Compiled defaults (fallback)
//!
//! A missing config file is not an error: a warning is logged and the
//! defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "ROTATION_CONFIG";

/// Processing configuration for the rotation pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Azimuth tolerance used to decide that a previously rotated channel is
    /// replaced by a new rotation (default: 1.0 degree)
    ///
    /// Reconciliation refuses to run when this is unset.
    #[serde(default = "default_azimuth_tolerance")]
    pub rotation_replacement_azimuth_tolerance_deg: Option<f64>,

    /// Event bus buffer size (default: 100)
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Phases accepted by channel-pair rotation
    #[serde(default = "default_valid_phases")]
    pub valid_phases: Vec<String>,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Fallback tolerances and window when no rotation template is available
    #[serde(default)]
    pub default_template: Option<DefaultTemplateConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// tracing-subscriber filter directive (default: "rotation_engine=info")
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Template values used when the template source has nothing for a station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultTemplateConfig {
    pub lead_duration_secs: f64,
    pub duration_secs: f64,
    pub location_tolerance_km: f64,
    pub orientation_angle_tolerance_deg: f64,
    pub sample_rate_tolerance_hz: f64,
}

fn default_azimuth_tolerance() -> Option<f64> {
    Some(1.0)
}

fn default_event_bus_capacity() -> usize {
    100
}

fn default_log_level() -> String {
    "rotation_engine=info".to_string()
}

fn default_valid_phases() -> Vec<String> {
    [
        "P", "Pn", "Pg", "PcP", "PKP", "PKPdf", "PKPbc", "PKPab", "pP", "sP", "S", "Sn", "Sg",
        "ScS", "SKS", "Lg", "Rg", "LR", "LQ", "T", "I", "H", "N", "Px", "Sx", "tx",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            rotation_replacement_azimuth_tolerance_deg: default_azimuth_tolerance(),
            event_bus_capacity: default_event_bus_capacity(),
            valid_phases: default_valid_phases(),
            logging: LoggingConfig::default(),
            default_template: None,
        }
    }
}

impl RotationConfig {
    /// Resolve the config path and load it, falling back to defaults
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_path) {
            Some(path) if path.exists() => Self::from_file(&path),
            Some(path) => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Loaded rotation configuration");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(tolerance) = self.rotation_replacement_azimuth_tolerance_deg {
            if !(tolerance.is_finite() && tolerance >= 0.0) {
                return Err(Error::Config(format!(
                    "rotation_replacement_azimuth_tolerance_deg must be a non-negative number, got {}",
                    tolerance
                )));
            }
        }
        if self.event_bus_capacity == 0 {
            return Err(Error::Config(
                "event_bus_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_valid_phase(&self, phase: &str) -> bool {
        self.valid_phases.iter().any(|p| p == phase)
    }
}

/// Config file path following the priority order in the module docs
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: platform config directory
    dirs::config_dir().map(|d| d.join("rotation-engine").join("config.toml"))
}
