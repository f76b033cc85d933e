//! Style parameters read by the compositing pipeline.

use super::gradient::GradientSpec;

/// Look of the framed screenshot. Lengths are logical pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct StyleParameters {
    pub padding: f64,
    pub screenshot_corner_radius: f64,
    pub background_corner_radius: f64,
    pub gradient: GradientSpec,
    pub show_gradient: bool,
    pub show_shadow: bool,
    /// Shadow alpha in `0.0..=1.0`.
    pub shadow_opacity: f64,
    pub shadow_radius: f64,
    pub shadow_y_offset: f64,
}

impl Default for StyleParameters {
    fn default() -> Self {
        Self {
            padding: 48.0,
            screenshot_corner_radius: 24.0,
            background_corner_radius: 32.0,
            gradient: GradientSpec::default(),
            show_gradient: true,
            show_shadow: true,
            shadow_opacity: 0.35,
            shadow_radius: 45.0,
            shadow_y_offset: 25.0,
        }
    }
}

impl StyleParameters {
    /// Copy with every numeric field forced into its valid range.
    ///
    /// Negative lengths become zero, non-finite values fall back to zero and
    /// the opacity is clamped to `0.0..=1.0`.
    pub fn sanitized(&self) -> Self {
        Self {
            padding: non_negative(self.padding),
            screenshot_corner_radius: non_negative(self.screenshot_corner_radius),
            background_corner_radius: non_negative(self.background_corner_radius),
            gradient: self.gradient.clone(),
            show_gradient: self.show_gradient,
            show_shadow: self.show_shadow,
            shadow_opacity: finite_or_zero(self.shadow_opacity).clamp(0.0, 1.0),
            shadow_radius: non_negative(self.shadow_radius),
            shadow_y_offset: finite_or_zero(self.shadow_y_offset),
        }
    }

    /// True when the shadow contributes any pixels at all.
    pub fn shadow_enabled(&self) -> bool {
        self.show_shadow && self.shadow_opacity > 0.0
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

fn non_negative(value: f64) -> f64 {
    finite_or_zero(value).max(0.0)
}
