//! Linear gradients used to fill the background card.

use thiserror::Error;

use super::color::{self, Color};

/// A point in unit space where (0,0) is the top-left and (1,1) the bottom-right corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitPoint {
    pub x: f64,
    pub y: f64,
}

impl UnitPoint {
    pub const TOP_LEADING: Self = Self { x: 0.0, y: 0.0 };
    pub const TOP: Self = Self { x: 0.5, y: 0.0 };
    pub const BOTTOM: Self = Self { x: 0.5, y: 1.0 };
    pub const BOTTOM_TRAILING: Self = Self { x: 1.0, y: 1.0 };
    pub const LEADING: Self = Self { x: 0.0, y: 0.5 };
    pub const TRAILING: Self = Self { x: 1.0, y: 0.5 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum GradientError {
    #[error("A gradient needs at least two colors, got {0}")]
    TooFewColors(usize),
}

/// Ordered color stops (evenly spaced) plus a direction.
#[derive(Clone, Debug, PartialEq)]
pub struct GradientSpec {
    colors: Vec<Color>,
    pub start: UnitPoint,
    pub end: UnitPoint,
}

impl GradientSpec {
    pub fn new(colors: Vec<Color>, start: UnitPoint, end: UnitPoint) -> Result<Self, GradientError> {
        if colors.len() < 2 {
            return Err(GradientError::TooFewColors(colors.len()));
        }
        Ok(Self { colors, start, end })
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Stops as `(offset, color)` pairs with offsets spread over `0.0..=1.0`.
    pub fn stops(&self) -> impl Iterator<Item = (f64, Color)> + '_ {
        let last = self.colors.len().saturating_sub(1).max(1) as f64;
        self.colors
            .iter()
            .enumerate()
            .map(move |(i, color)| (i as f64 / last, *color))
    }

    /// Builds a cairo pattern spanning a `width` x `height` box at the origin.
    pub fn to_pattern(&self, width: f64, height: f64) -> cairo::LinearGradient {
        let pattern = cairo::LinearGradient::new(
            self.start.x * width,
            self.start.y * height,
            self.end.x * width,
            self.end.y * height,
        );
        for (offset, c) in self.stops() {
            pattern.add_color_stop_rgba(offset, c.r, c.g, c.b, c.a);
        }
        pattern
    }
}

/// A named gradient from the built-in palette.
#[derive(Clone, Debug, PartialEq)]
pub struct PresetGradient {
    pub name: &'static str,
    pub gradient: GradientSpec,
}

fn preset(name: &'static str, colors: Vec<Color>, start: UnitPoint, end: UnitPoint) -> PresetGradient {
    PresetGradient {
        name,
        gradient: GradientSpec { colors, start, end },
    }
}

fn hex(value: &str) -> Color {
    Color::from_hex(value).unwrap_or(color::BLACK)
}

/// The built-in palette, in display order. The first entry is the default.
pub fn presets() -> Vec<PresetGradient> {
    vec![
        preset(
            "Sunset",
            vec![color::ORANGE, color::RED, color::PURPLE],
            UnitPoint::TOP_LEADING,
            UnitPoint::BOTTOM_TRAILING,
        ),
        preset(
            "Ocean",
            vec![color::BLUE, color::GREEN],
            UnitPoint::TOP,
            UnitPoint::BOTTOM,
        ),
        preset(
            "Twilight",
            vec![hex("#0f2027"), hex("#203a43"), hex("#2c5364")],
            UnitPoint::TOP,
            UnitPoint::BOTTOM,
        ),
        preset(
            "Emerald",
            vec![hex("#237A57"), hex("#093028")],
            UnitPoint::TOP_LEADING,
            UnitPoint::BOTTOM_TRAILING,
        ),
        preset(
            "Sky",
            vec![hex("#0072ff"), hex("#00c6ff")],
            UnitPoint::TOP,
            UnitPoint::BOTTOM,
        ),
        preset(
            "Rose",
            vec![hex("#F390A4"), hex("#FDE9E8")],
            UnitPoint::TOP,
            UnitPoint::BOTTOM,
        ),
        preset(
            "Graphite",
            vec![hex("#434343"), hex("#000000")],
            UnitPoint::TOP,
            UnitPoint::BOTTOM,
        ),
    ]
}

/// Looks up a preset by name, ignoring ASCII case.
pub fn preset_by_name(name: &str) -> Option<GradientSpec> {
    presets()
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .map(|p| p.gradient)
}

impl Default for GradientSpec {
    fn default() -> Self {
        presets()
            .into_iter()
            .next()
            .map(|p| p.gradient)
            .unwrap_or(GradientSpec {
                colors: vec![color::BLACK, color::WHITE],
                start: UnitPoint::TOP,
                end: UnitPoint::BOTTOM,
            })
    }
}
