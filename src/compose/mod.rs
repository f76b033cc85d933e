//! Compositing pipeline for framed screenshots.
//!
//! One pure function, [`compose`], turns a captured [`Bitmap`](crate::bitmap::Bitmap)
//! and a set of [`StyleParameters`] into the final image. Live previews and
//! exports both go through it; only the output scale differs.

pub mod color;
pub mod gradient;
pub mod style;

mod blur;
mod render;
mod shape;
#[cfg(test)]
mod tests;

pub use color::Color;
pub use gradient::{GradientSpec, PresetGradient, UnitPoint, preset_by_name, presets};
pub use render::{CompositeResult, ComposeError, EXPORT_SCALE, canvas_size, compose};
pub use style::StyleParameters;
