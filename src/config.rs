use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ClimbRsError;
use crate::load::LoadThresholds;
use crate::logging::LogConfig;
use crate::projection::{SeededJitter, TimeRange};
use crate::training_plan::PlannerSettings;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration metadata
    pub metadata: ConfigMetadata,

    pub logging: LogConfig,

    /// Overtraining signal thresholds
    pub load: LoadThresholds,

    pub projection: ProjectionSettings,

    pub planner: PlannerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Last time the file was written by climbrs
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            updated_at: None,
        }
    }
}

/// Progression chart settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionSettings {
    /// Seed for progression noise; no seed draws a smooth curve
    pub jitter_seed: Option<u64>,

    /// Months of history shown when none is requested (1, 3, 6 or 12)
    pub default_range_months: u32,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            jitter_seed: None,
            default_range_months: 3,
        }
    }
}

impl ProjectionSettings {
    pub fn default_range(&self) -> Result<TimeRange> {
        TimeRange::from_months(self.default_range_months)
            .with_context(|| "Invalid projection.default_range_months")
    }

    pub fn jitter(&self) -> Option<SeededJitter> {
        self.jitter_seed.map(SeededJitter::new)
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Some(Utc::now());

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".climbrs")
            .join("config.toml")
    }

    /// Load from the default location, falling back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_path_or_default(Self::default_config_path())
    }

    /// A missing file silently yields defaults. An unreadable or invalid one
    /// is reported on stderr, since logging is configured from the result.
    pub fn load_from_path_or_default<P: AsRef<Path>>(path: P) -> Self {
        if !path.as_ref().exists() {
            return Self::default();
        }
        match Self::load_from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Invalid config file, using defaults: {}: {:#}", path.as_ref().display(), e);
                Self::default()
            }
        }
    }

    /// Reject threshold combinations the analytics cannot use
    pub fn validate(&self) -> Result<()> {
        self.load.validate().context("Invalid [load] section")?;
        if self.planner.max_weeks == 0 {
            return Err(ClimbRsError::Configuration("planner.max_weeks must be at least 1".to_string()).into());
        }
        self.projection.default_range()?;
        Ok(())
    }
}
