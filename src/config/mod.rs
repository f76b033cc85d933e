//! Configuration file support for snapframe.
//!
//! Settings are read from `~/.config/snapframe/config.toml`: capture timing,
//! the selection tool, default frame style and export options. A missing file
//! means defaults; out-of-range values are clamped with a warning.

pub mod types;

pub use types::{CaptureConfig, ExportConfig, SelectionConfig, StyleConfig};

use anyhow::{Context, Result};
use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::{capture::CaptureDependencies, compose::preset_by_name};

/// Main configuration structure containing all user settings.
///
/// # Example TOML
/// ```toml
/// [capture]
/// full_screen_settle_ms = 800
/// show_cursor = false
///
/// [style]
/// padding = 64.0
/// gradient = "Ocean"
///
/// [export]
/// format = "jpeg"
/// jpeg_quality = 0.9
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default, JsonSchema)]
pub struct Config {
    /// Capture timing and provider options
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Interactive selection tool
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Default frame style
    #[serde(default)]
    pub style: StyleConfig,

    /// Export destination and format
    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    /// Validates and clamps all configuration values to acceptable ranges.
    ///
    /// Invalid values are clamped to the nearest valid value (or reset to the
    /// default when they cannot be clamped) and a warning is logged.
    fn validate_and_clamp(&mut self) {
        clamp_u64(
            "full_screen_settle_ms",
            &mut self.capture.full_screen_settle_ms,
            0,
            10_000,
        );
        clamp_u64(
            "selection_settle_ms",
            &mut self.capture.selection_settle_ms,
            0,
            10_000,
        );
        clamp_f64(
            "default_window_scale",
            &mut self.capture.default_window_scale,
            0.5,
            8.0,
            2.0,
        );

        if self.selection.program.trim().is_empty() {
            log::warn!("Empty selection program, falling back to the platform tool");
            self.selection.program = types::default_selection_program();
            self.selection.args = types::default_selection_args();
        }

        let style = &mut self.style;
        clamp_f64("padding", &mut style.padding, 0.0, 512.0, 48.0);
        clamp_f64(
            "screenshot_corner_radius",
            &mut style.screenshot_corner_radius,
            0.0,
            256.0,
            24.0,
        );
        clamp_f64(
            "background_corner_radius",
            &mut style.background_corner_radius,
            0.0,
            256.0,
            32.0,
        );
        clamp_f64("shadow_opacity", &mut style.shadow_opacity, 0.0, 1.0, 0.35);
        clamp_f64("shadow_radius", &mut style.shadow_radius, 0.0, 200.0, 45.0);
        clamp_f64(
            "shadow_y_offset",
            &mut style.shadow_y_offset,
            -200.0,
            200.0,
            25.0,
        );
        if preset_by_name(&style.gradient).is_none() {
            log::warn!(
                "Unknown gradient preset '{}', falling back to '{}'",
                style.gradient,
                types::default_gradient()
            );
            style.gradient = types::default_gradient();
        }

        if self.export.filename_template.trim().is_empty() {
            log::warn!("Empty filename_template, falling back to the default");
            self.export.filename_template = types::default_filename_template();
        } else if !crate::export::is_valid_template(&self.export.filename_template) {
            log::warn!(
                "Invalid filename_template '{}', falling back to the default",
                self.export.filename_template
            );
            self.export.filename_template = types::default_filename_template();
        }
        if !(0.01..=1.0).contains(&self.export.jpeg_quality) {
            log::warn!(
                "Invalid jpeg_quality {:.2}, clamping to 0.01-1.0 range",
                self.export.jpeg_quality
            );
            self.export.jpeg_quality = if self.export.jpeg_quality.is_nan() {
                crate::export::DEFAULT_JPEG_QUALITY
            } else {
                self.export.jpeg_quality.clamp(0.01, 1.0)
            };
        }
    }

    /// Returns the path to the configuration file.
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined (e.g., HOME not set).
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("snapframe");

        Ok(config_dir.join("config.toml"))
    }

    /// Loads configuration from the default path, or returns defaults if not found.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Loads and validates configuration from `config_path`.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!("Config file not found, using defaults");
            debug!("Expected config at: {}", config_path.display());
            return Ok(Self::default());
        }

        let config_str = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

        config.validate_and_clamp();

        info!("Loaded config from {}", config_path.display());
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Saves the current configuration to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let config_str = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(config_path, config_str)
            .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

        info!("Saved config to {}", config_path.display());
        Ok(())
    }

    /// Writes the documented example config to the user's config directory.
    ///
    /// # Errors
    /// Returns an error if a config file already exists or cannot be written.
    pub fn create_default_file() -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;

        if config_path.exists() {
            return Err(anyhow::anyhow!(
                "Config file already exists at {}",
                config_path.display()
            ));
        }

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&config_path, Self::example_toml())?;

        info!("Created default config at {}", config_path.display());
        Ok(config_path)
    }

    /// The bundled, commented example configuration.
    pub fn example_toml() -> &'static str {
        include_str!("../../config.example.toml")
    }

    /// JSON schema describing the config file.
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Config)
    }

    /// Capture stack built from the `[selection]` and `[capture]` sections.
    pub fn capture_dependencies(&self) -> CaptureDependencies {
        CaptureDependencies::platform(
            self.selection.tool_settings(),
            self.capture.selection_settle(),
        )
    }
}

fn clamp_u64(name: &str, value: &mut u64, min: u64, max: u64) {
    if !(min..=max).contains(&*value) {
        log::warn!(
            "Invalid {} {}, clamping to {}-{} range",
            name,
            value,
            min,
            max
        );
        *value = (*value).clamp(min, max);
    }
}

fn clamp_f64(name: &str, value: &mut f64, min: f64, max: f64, fallback: f64) {
    if value.is_nan() {
        log::warn!("Invalid {} (NaN), falling back to {}", name, fallback);
        *value = fallback;
    } else if !(min..=max).contains(&*value) {
        log::warn!(
            "Invalid {} {:.2}, clamping to {}-{} range",
            name,
            value,
            min,
            max
        );
        *value = value.clamp(min, max);
    }
}
