//! # Configuration Module
//!
//! This module handles build settings and data directory setup for Fluid.
//!
//! ## Data Storage
//!
//! The track library lives in the platform-standard data directory:
//! - Linux: `~/.local/share/fluid/library.db`
//! - macOS: `~/Library/Application Support/fluid/library.db`
//! - Windows: `%APPDATA%\fluid\library.db`
//!
//! ## Build Settings
//!
//! Settings are read from `fluid.json` in the platform config directory
//! (`~/.config/fluid/fluid.json` on Linux) when it exists. Every field is
//! optional; missing fields take the defaults of [`FluidConfig`].

use crate::builder::BuildParams;
use crate::error::Error;
use crate::track::Feature;
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Returns the platform-appropriate library database path.
///
/// Creates the `fluid` data directory if it doesn't exist.
///
/// # Errors
///
/// This function will return an error if:
/// - The system data directory cannot be determined
/// - The fluid subdirectory cannot be created due to permissions
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("library.db"))
}

/// Returns the platform-appropriate data directory for Fluid
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    let fluid_dir = data_dir.join("fluid");
    fs::create_dir_all(&fluid_dir).with_context(|| {
        format!(
            "Failed to create Fluid data directory at {}. Please check file permissions.",
            fluid_dir.display()
        )
    })?;

    Ok(fluid_dir)
}

/// Location of the optional settings file. Not created.
pub fn get_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine system config directory."))?;
    Ok(config_dir.join("fluid").join("fluid.json"))
}

/// Settings for a fluid playlist build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FluidConfig {
    /// Feature the trajectory advances along
    pub axis_x: Feature,
    /// Feature fitted as a function of `axis_x`
    pub axis_y: Feature,
    /// Trajectory samples, and so playlist length
    pub num_points: usize,
    pub initial_threshold: f64,
    pub threshold_step: f64,
    pub max_threshold: f64,
    /// Name the playlist is published under
    pub playlist_name: String,
    /// Saved tracks kept, in library order
    pub saved_track_limit: usize,
    /// Featured tracks kept, randomly sampled
    pub featured_track_limit: usize,
}

impl Default for FluidConfig {
    fn default() -> Self {
        let params = BuildParams::default();
        Self {
            axis_x: Feature::Energy,
            axis_y: Feature::Danceability,
            num_points: 100,
            initial_threshold: params.initial_threshold,
            threshold_step: params.threshold_step,
            max_threshold: params.max_threshold,
            playlist_name: "Fluid Playlist".to_string(),
            saved_track_limit: 2000,
            featured_track_limit: 2000,
        }
    }
}

impl FluidConfig {
    /// Loads `path`, or the defaults if the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Loads settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
        debug!("Loaded settings from {}", path.display());
        Ok(config)
    }

    #[must_use]
    pub const fn build_params(&self) -> BuildParams {
        BuildParams {
            initial_threshold: self.initial_threshold,
            threshold_step: self.threshold_step,
            max_threshold: self.max_threshold,
        }
    }

    /// Checks every setting before any fitting or selection runs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the first bad setting.
    pub fn validate(&self) -> std::result::Result<(), Error> {
        if self.num_points == 0 {
            return Err(Error::Configuration(
                "number of points must be positive".to_string(),
            ));
        }
        self.build_params().validate()?;
        if self.playlist_name.trim().is_empty() {
            return Err(Error::Configuration("playlist name must not be empty".to_string()));
        }
        if self.saved_track_limit == 0 || self.featured_track_limit == 0 {
            return Err(Error::Configuration("track limits must be positive".to_string()));
        }
        Ok(())
    }
}

/// Configuration for runtime behavior
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Path to the library database
    pub db_path: PathBuf,
    pub settings: FluidConfig,
}

impl RuntimeConfig {
    /// Resolves the library path and settings, preferring explicit paths.
    ///
    /// An explicit settings file must exist; the default one may be absent.
    pub fn resolve(db_path: Option<PathBuf>, settings_path: Option<&Path>) -> Result<Self> {
        let db_path = match db_path {
            Some(path) => path,
            None => get_db_path()?,
        };
        let settings = match settings_path {
            Some(path) => FluidConfig::load(path)?,
            None => FluidConfig::load_or_default(&get_config_path()?)?,
        };
        Ok(Self { db_path, settings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_get_db_path_structure() {
        let path = get_db_path().expect("Should get valid path");

        assert_eq!(path.file_name().unwrap(), "library.db");
        let parent = path.parent().expect("Should have parent directory");
        assert_eq!(parent.file_name().unwrap(), "fluid");
        assert!(parent.is_dir());
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = FluidConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_points, 100);
        assert_eq!(config.axis_x, Feature::Energy);
        assert_eq!(config.axis_y, Feature::Danceability);
    }

    #[test]
    fn test_partial_settings_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("fluid.json");
        fs::write(&path, r#"{"num_points": 25, "axis_y": "valence"}"#)?;

        let config = FluidConfig::load(&path)?;
        assert_eq!(config.num_points, 25);
        assert_eq!(config.axis_y, Feature::Valence);
        assert_eq!(config.axis_x, Feature::Energy);
        assert_eq!(config.playlist_name, "Fluid Playlist");
        Ok(())
    }

    #[test]
    fn test_missing_settings_file_uses_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let config = FluidConfig::load_or_default(&dir.path().join("absent.json"))?;
        assert_eq!(config, FluidConfig::default());
        Ok(())
    }

    #[test]
    fn test_malformed_settings_file_errors() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("fluid.json");
        fs::write(&path, r#"{"axis_x": "tempo"}"#)?;

        assert!(FluidConfig::load(&path).is_err());
        Ok(())
    }

    #[test]
    fn test_runtime_config_explicit_paths() -> Result<()> {
        let dir = TempDir::new()?;
        let db_path = dir.path().join("library.db");
        let settings_path = dir.path().join("fluid.json");
        fs::write(&settings_path, r#"{"playlist_name": "Evening"}"#)?;

        let runtime = RuntimeConfig::resolve(Some(db_path.clone()), Some(&settings_path))?;
        assert_eq!(runtime.db_path, db_path);
        assert_eq!(runtime.settings.playlist_name, "Evening");

        assert!(RuntimeConfig::resolve(Some(db_path), Some(&dir.path().join("absent.json"))).is_err());
        Ok(())
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases = [
            FluidConfig { num_points: 0, ..FluidConfig::default() },
            FluidConfig { threshold_step: -0.01, ..FluidConfig::default() },
            FluidConfig { initial_threshold: -1.0, ..FluidConfig::default() },
            FluidConfig { playlist_name: "  ".to_string(), ..FluidConfig::default() },
            FluidConfig { featured_track_limit: 0, ..FluidConfig::default() },
        ];

        for config in cases {
            assert!(matches!(config.validate(), Err(Error::Configuration(_))), "{config:?}");
        }
    }
}
