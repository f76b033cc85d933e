//! Configuration type definitions.

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    capture::{CaptureSettings, DEFAULT_WINDOW_SCALE, SelectionToolSettings},
    compose::{GradientSpec, StyleParameters, preset_by_name},
    export::{DEFAULT_JPEG_QUALITY, ExportFormat, ExportSettings, expand_tilde},
};

/// Capture timing and provider options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CaptureConfig {
    /// Milliseconds to wait after hiding the app before a full screen capture
    /// (valid range: 0 - 10000)
    #[serde(default = "default_full_screen_settle_ms")]
    pub full_screen_settle_ms: u64,

    /// Milliseconds to wait after hiding the app before the selection tool starts
    /// (valid range: 0 - 10000)
    #[serde(default = "default_selection_settle_ms")]
    pub selection_settle_ms: u64,

    /// Pixels per point used when a window's display reports no scale
    /// (valid range: 0.5 - 8.0)
    #[serde(default = "default_window_scale")]
    pub default_window_scale: f64,

    /// Include the mouse cursor in provider captures
    #[serde(default = "default_true")]
    pub show_cursor: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            full_screen_settle_ms: default_full_screen_settle_ms(),
            selection_settle_ms: default_selection_settle_ms(),
            default_window_scale: default_window_scale(),
            show_cursor: true,
        }
    }
}

impl CaptureConfig {
    pub fn settings(&self) -> CaptureSettings {
        CaptureSettings {
            full_screen_settle: Duration::from_millis(self.full_screen_settle_ms),
            default_window_scale: self.default_window_scale,
            show_cursor: self.show_cursor,
        }
    }

    pub fn selection_settle(&self) -> Duration {
        Duration::from_millis(self.selection_settle_ms)
    }
}

/// External interactive selection tool.
///
/// `{output}` in `args` is replaced with the PNG path the tool must write;
/// without it the path is appended as the last argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SelectionConfig {
    #[serde(default = "default_selection_program")]
    pub program: String,

    #[serde(default = "default_selection_args")]
    pub args: Vec<String>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            program: default_selection_program(),
            args: default_selection_args(),
        }
    }
}

impl SelectionConfig {
    pub fn tool_settings(&self) -> SelectionToolSettings {
        SelectionToolSettings {
            program: self.program.clone(),
            args: self.args.clone(),
        }
    }
}

/// Default look applied to new captures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StyleConfig {
    /// Space between the screenshot and the canvas edge in points (valid range: 0 - 512)
    #[serde(default = "default_padding")]
    pub padding: f64,

    /// Corner radius of the screenshot in points (valid range: 0 - 256)
    #[serde(default = "default_screenshot_radius")]
    pub screenshot_corner_radius: f64,

    /// Corner radius of the gradient card in points (valid range: 0 - 256)
    #[serde(default = "default_background_radius")]
    pub background_corner_radius: f64,

    /// Gradient preset: Sunset, Ocean, Twilight, Emerald, Sky, Rose or Graphite
    #[serde(default = "default_gradient")]
    pub gradient: String,

    #[serde(default = "default_true")]
    pub show_gradient: bool,

    #[serde(default = "default_true")]
    pub show_shadow: bool,

    /// Shadow opacity (valid range: 0.0 - 1.0)
    #[serde(default = "default_shadow_opacity")]
    pub shadow_opacity: f64,

    /// Shadow blur radius in points (valid range: 0 - 200)
    #[serde(default = "default_shadow_radius")]
    pub shadow_radius: f64,

    /// Vertical shadow offset in points (valid range: -200 - 200)
    #[serde(default = "default_shadow_y_offset")]
    pub shadow_y_offset: f64,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            padding: default_padding(),
            screenshot_corner_radius: default_screenshot_radius(),
            background_corner_radius: default_background_radius(),
            gradient: default_gradient(),
            show_gradient: true,
            show_shadow: true,
            shadow_opacity: default_shadow_opacity(),
            shadow_radius: default_shadow_radius(),
            shadow_y_offset: default_shadow_y_offset(),
        }
    }
}

impl StyleConfig {
    /// Style parameters for the compositor. Unknown presets use the default gradient.
    pub fn style_parameters(&self) -> StyleParameters {
        let gradient = preset_by_name(&self.gradient).unwrap_or_else(|| {
            log::warn!("Unknown gradient preset '{}', using default", self.gradient);
            GradientSpec::default()
        });
        StyleParameters {
            padding: self.padding,
            screenshot_corner_radius: self.screenshot_corner_radius,
            background_corner_radius: self.background_corner_radius,
            gradient,
            show_gradient: self.show_gradient,
            show_shadow: self.show_shadow,
            shadow_opacity: self.shadow_opacity,
            shadow_radius: self.shadow_radius,
            shadow_y_offset: self.shadow_y_offset,
        }
    }
}

/// Where and how finished images are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExportConfig {
    /// Save directory; `~/` is expanded
    #[serde(default = "default_export_directory")]
    pub directory: String,

    /// Filename template with chrono specifiers, without extension
    #[serde(default = "default_filename_template")]
    pub filename_template: String,

    /// "png" or "jpeg"
    #[serde(default)]
    pub format: ExportFormat,

    /// JPEG quality (valid range: 0.01 - 1.0)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: f32,

    /// Copy to the clipboard after saving
    #[serde(default)]
    pub copy_to_clipboard: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: default_export_directory(),
            filename_template: default_filename_template(),
            format: ExportFormat::default(),
            jpeg_quality: default_jpeg_quality(),
            copy_to_clipboard: false,
        }
    }
}

impl ExportConfig {
    pub fn settings(&self) -> ExportSettings {
        ExportSettings {
            directory: expand_tilde(&self.directory),
            filename_template: self.filename_template.clone(),
            format: self.format,
            jpeg_quality: self.jpeg_quality,
            copy_to_clipboard: self.copy_to_clipboard,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_full_screen_settle_ms() -> u64 {
    800
}

fn default_selection_settle_ms() -> u64 {
    500
}

fn default_window_scale() -> f64 {
    DEFAULT_WINDOW_SCALE
}

pub(crate) fn default_selection_program() -> String {
    SelectionToolSettings::default().program
}

pub(crate) fn default_selection_args() -> Vec<String> {
    SelectionToolSettings::default().args
}

fn default_padding() -> f64 {
    48.0
}

fn default_screenshot_radius() -> f64 {
    24.0
}

fn default_background_radius() -> f64 {
    32.0
}

pub(crate) fn default_gradient() -> String {
    "Sunset".to_string()
}

fn default_shadow_opacity() -> f64 {
    0.35
}

fn default_shadow_radius() -> f64 {
    45.0
}

fn default_shadow_y_offset() -> f64 {
    25.0
}

fn default_export_directory() -> String {
    "~/Pictures/Screenshots".to_string()
}

pub(crate) fn default_filename_template() -> String {
    "Screenshot-%Y-%m-%d-%H%M%S".to_string()
}

fn default_jpeg_quality() -> f32 {
    DEFAULT_JPEG_QUALITY
}
