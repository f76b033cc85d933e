//! RGBA color type and hex parsing.

/// Represents an RGBA color with floating-point components.
///
/// All components are in the range 0.0 (minimum) to 1.0 (maximum).
///
/// # Examples
///
/// ```
/// use snapframe::compose::Color;
/// let red = Color { r: 1.0, g: 0.0, b: 0.0, a: 1.0 };
/// let teal = Color::from_hex("#237A57").unwrap();
/// assert!(teal.g > teal.r);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red component (0.0 = no red, 1.0 = full red)
    pub r: f64,
    /// Green component (0.0 = no green, 1.0 = full green)
    pub g: f64,
    /// Blue component (0.0 = no blue, 1.0 = full blue)
    pub b: f64,
    /// Alpha/transparency (0.0 = fully transparent, 1.0 = fully opaque)
    pub a: f64,
}

impl Color {
    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parses `#RGB`, `#RRGGBB` or `#AARRGGBB` (leading `#` optional).
    ///
    /// Returns `None` for any other length or for non-hex digits.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let value = u32::from_str_radix(digits, 16).ok()?;
        let (a, r, g, b) = match digits.len() {
            3 => (
                255,
                ((value >> 8) & 0xf) * 17,
                ((value >> 4) & 0xf) * 17,
                (value & 0xf) * 17,
            ),
            6 => (255, (value >> 16) & 0xff, (value >> 8) & 0xff, value & 0xff),
            8 => (
                (value >> 24) & 0xff,
                (value >> 16) & 0xff,
                (value >> 8) & 0xff,
                value & 0xff,
            ),
            _ => return None,
        };
        Some(Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
            a: a as f64 / 255.0,
        })
    }
}

// System accent colors used by the preset palette.
pub const ORANGE: Color = Color::rgb(1.0, 0.584, 0.0);
pub const RED: Color = Color::rgb(1.0, 0.231, 0.188);
pub const PURPLE: Color = Color::rgb(0.686, 0.322, 0.871);
pub const BLUE: Color = Color::rgb(0.0, 0.478, 1.0);
pub const GREEN: Color = Color::rgb(0.204, 0.780, 0.349);
pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
