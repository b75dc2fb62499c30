//! Configuration for pcbmill
//!
//! Provides configuration file handling and validation. Supports JSON and
//! TOML file formats; the default file lives in the platform config
//! directory.
//!
//! Configuration is organized into sections:
//! - Generation settings (units, precision, tolerance, worker count)
//! - Default parameters for newly created tools
//! - Location of the tools database

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pcbmill_camtools::{validate_tool, CavcKernel, GenerationContext};
pub use pcbmill_core::Units;
use pcbmill_core::{ParamSet, ToolRecord, ToolsDatabase};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{SettingsError, SettingsResult};

/// Directory name under the platform config directory
pub const APP_DIR: &str = "pcbmill";
/// Config file name inside [`APP_DIR`]
pub const CONFIG_FILE: &str = "config.toml";

/// Largest number of decimals accepted for G-code words
const MAX_DECIMALS: usize = 10;

/// Settings shared by every generation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub units: Units,
    /// Decimals written for X, Y and Z words
    pub coord_decimals: usize,
    /// Decimals written for F words
    pub feed_decimals: usize,
    /// Geometry tolerance
    pub tolerance: f64,
    /// Segments per full circle when arcs are linearized
    pub steps_per_circle: usize,
    /// Margin added to the tool radius around exclusion areas
    pub exclusion_margin: f64,
    /// Background worker threads
    pub workers: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            units: Units::Mm,
            coord_decimals: 4,
            feed_decimals: 2,
            tolerance: 1e-5,
            steps_per_circle: 64,
            exclusion_margin: 0.5,
            workers: 2,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub generation: GenerationSettings,
    /// Parameters for new tools without a tools database match
    pub defaults: ParamSet,
    /// JSON tools database
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools_db: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> SettingsResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(SettingsError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config file location
    pub fn default_path() -> SettingsResult<PathBuf> {
        let dir = dirs::config_dir().ok_or_else(|| {
            SettingsError::ConfigDirectory("no config directory on this platform".to_string())
        })?;
        Ok(dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path)?;
        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };
        config.validate()?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load the config at `path`, or the defaults when the file is absent
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;
        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        let g = &self.generation;
        if g.coord_decimals > MAX_DECIMALS {
            return Err(SettingsError::invalid(
                "generation.coord_decimals",
                format!("must be at most {}", MAX_DECIMALS),
            ));
        }
        if g.feed_decimals > MAX_DECIMALS {
            return Err(SettingsError::invalid(
                "generation.feed_decimals",
                format!("must be at most {}", MAX_DECIMALS),
            ));
        }
        if !(g.tolerance > 0.0 && g.tolerance.is_finite()) {
            return Err(SettingsError::invalid(
                "generation.tolerance",
                "must be > 0",
            ));
        }
        if g.steps_per_circle < 4 {
            return Err(SettingsError::invalid(
                "generation.steps_per_circle",
                "must be at least 4",
            ));
        }
        if !(g.exclusion_margin >= 0.0 && g.exclusion_margin.is_finite()) {
            return Err(SettingsError::invalid(
                "generation.exclusion_margin",
                "must be >= 0",
            ));
        }
        if g.workers == 0 {
            return Err(SettingsError::invalid("generation.workers", "must be > 0"));
        }

        // Defaults are checked as a unit-diameter tool
        validate_tool(&ToolRecord::new(1, 1.0, self.defaults.clone()))
            .map_err(|e| SettingsError::invalid("defaults", e.to_string()))?;
        Ok(())
    }

    /// Generation context for the engine
    pub fn generation_context(&self) -> GenerationContext {
        let g = &self.generation;
        GenerationContext {
            units: g.units,
            coord_decimals: g.coord_decimals,
            feed_decimals: g.feed_decimals,
            tolerance: g.tolerance,
            steps_per_circle: g.steps_per_circle,
            exclusion_margin: g.exclusion_margin,
            ..GenerationContext::default()
        }
        .with_kernel(Arc::new(CavcKernel::new(g.steps_per_circle, g.tolerance)))
    }

    /// Load the configured tools database, if any
    pub fn load_tools_db(&self) -> SettingsResult<Option<ToolsDatabase>> {
        let Some(path) = &self.tools_db else {
            return Ok(None);
        };
        ToolsDatabase::load_from_file(path)
            .map(Some)
            .map_err(|e| SettingsError::ToolsDatabase(format!("{}: {}", path.display(), e)))
    }
}
