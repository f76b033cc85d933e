//! The compositing pipeline: source bitmap + style -> framed bitmap.

use cairo::{Antialias, Context, Filter, Format, ImageSurface};
use thiserror::Error;

use super::{blur, shape::rounded_rect, style::StyleParameters};
use crate::{
    bitmap::{Bitmap, BitmapError},
    geometry::Rect,
};

/// Output multiplier used for clipboard and file export.
pub const EXPORT_SCALE: f64 = 2.0;

/// Cairo refuses surfaces larger than this on either axis.
const MAX_SURFACE_DIMENSION: u32 = 32_767;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("Output scale must be a positive number, got {0}")]
    InvalidScale(f64),

    #[error("Composited canvas {width}x{height} exceeds the maximum surface size")]
    CanvasTooLarge { width: u32, height: u32 },

    #[error("Cairo drawing failed: {0}")]
    Cairo(#[from] cairo::Error),

    #[error(transparent)]
    Bitmap(#[from] BitmapError),
}

/// A rendered frame plus the logical size it was laid out at.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositeResult {
    pub bitmap: Bitmap,
    pub logical_width: f64,
    pub logical_height: f64,
}

impl CompositeResult {
    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }
}

/// Logical canvas size: the source's logical size plus padding on every side.
pub fn canvas_size(source: &Bitmap, style: &StyleParameters) -> (f64, f64) {
    let padding = style.sanitized().padding;
    let (w, h) = source.logical_size();
    (w + 2.0 * padding, h + 2.0 * padding)
}

fn pixel_size(logical: (f64, f64), scale: f64) -> (u32, u32) {
    (
        (logical.0 * scale).round().max(1.0) as u32,
        (logical.1 * scale).round().max(1.0) as u32,
    )
}

/// Renders `source` onto a padded, rounded, gradient card.
///
/// Layers, bottom to top:
/// 1. the gradient, painted through a rounded-rect clip so the corners stay
///    transparent (skipped when `show_gradient` is off);
/// 2. the blurred drop shadow of the screenshot (skipped entirely when the
///    shadow is off or fully transparent);
/// 3. the screenshot itself, clipped to its own corner radius.
///
/// `output_scale` multiplies the logical canvas into output pixels; previews
/// pass the display scale, export passes [`EXPORT_SCALE`]. The function keeps
/// no state, so identical inputs give byte-identical output.
pub fn compose(
    source: &Bitmap,
    style: &StyleParameters,
    output_scale: f64,
) -> Result<CompositeResult, ComposeError> {
    if !(output_scale.is_finite() && output_scale > 0.0) {
        return Err(ComposeError::InvalidScale(output_scale));
    }

    let style = style.sanitized();
    let (source_w, source_h) = source.logical_size();
    let (canvas_w, canvas_h) = canvas_size(source, &style);
    let (pixel_w, pixel_h) = pixel_size((canvas_w, canvas_h), output_scale);
    if pixel_w > MAX_SURFACE_DIMENSION || pixel_h > MAX_SURFACE_DIMENSION {
        return Err(ComposeError::CanvasTooLarge {
            width: pixel_w,
            height: pixel_h,
        });
    }

    log::debug!(
        "Compositing {}x{} source onto {:.0}x{:.0} canvas at {}x ({}x{} px)",
        source.width(),
        source.height(),
        canvas_w,
        canvas_h,
        output_scale,
        pixel_w,
        pixel_h
    );

    let background = Rect::new(0.0, 0.0, canvas_w, canvas_h);
    let foreground = Rect::new(style.padding, style.padding, source_w, source_h);

    let surface = ImageSurface::create(Format::ARgb32, pixel_w as i32, pixel_h as i32)?;
    {
        let ctx = Context::new(&surface)?;
        ctx.set_antialias(Antialias::Best);
        ctx.scale(output_scale, output_scale);

        if style.show_gradient {
            draw_background(&ctx, background, &style)?;
        }
        if style.shadow_enabled() {
            draw_shadow(&ctx, &style, foreground, background, (pixel_w, pixel_h), output_scale)?;
        }
        draw_foreground(&ctx, source, foreground, style.screenshot_corner_radius)?;
    }

    Ok(CompositeResult {
        bitmap: Bitmap::from_surface(surface, output_scale)?,
        logical_width: canvas_w,
        logical_height: canvas_h,
    })
}

fn draw_background(
    ctx: &Context,
    background: Rect,
    style: &StyleParameters,
) -> Result<(), ComposeError> {
    ctx.save()?;
    // Clip first: the fill must never reach the corners.
    rounded_rect(ctx, background, style.background_corner_radius);
    ctx.clip();
    let pattern = style
        .gradient
        .to_pattern(background.width, background.height);
    ctx.set_source(&pattern)?;
    ctx.paint()?;
    ctx.restore()?;
    Ok(())
}

fn draw_shadow(
    ctx: &Context,
    style: &StyleParameters,
    foreground: Rect,
    background: Rect,
    pixel_size: (u32, u32),
    output_scale: f64,
) -> Result<(), ComposeError> {
    let (pixel_w, pixel_h) = pixel_size;
    let layer = ImageSurface::create(Format::ARgb32, pixel_w as i32, pixel_h as i32)?;
    {
        let layer_ctx = Context::new(&layer)?;
        layer_ctx.set_antialias(Antialias::Best);
        layer_ctx.scale(output_scale, output_scale);
        rounded_rect(
            &layer_ctx,
            foreground.offset(0.0, style.shadow_y_offset),
            style.screenshot_corner_radius,
        );
        layer_ctx.set_source_rgba(0.0, 0.0, 0.0, style.shadow_opacity);
        layer_ctx.fill()?;
    }

    let silhouette = Bitmap::from_surface(layer, output_scale)?;
    let mut pixels = silhouette.into_data();
    let sigma = style.shadow_radius * output_scale / 2.0;
    blur::gaussian_blur(&mut pixels, pixel_w as usize, pixel_h as usize, sigma);
    let blurred = Bitmap::from_argb32(pixel_w, pixel_h, output_scale, pixels)?.to_surface()?;

    ctx.save()?;
    if style.show_gradient {
        rounded_rect(ctx, background, style.background_corner_radius);
        ctx.clip();
    }
    ctx.identity_matrix();
    ctx.set_source_surface(&blurred, 0.0, 0.0)?;
    ctx.paint()?;
    ctx.restore()?;
    Ok(())
}

fn draw_foreground(
    ctx: &Context,
    source: &Bitmap,
    foreground: Rect,
    corner_radius: f64,
) -> Result<(), ComposeError> {
    let image = source.to_surface()?;

    ctx.save()?;
    rounded_rect(ctx, foreground, corner_radius);
    ctx.clip();
    ctx.translate(foreground.x, foreground.y);
    ctx.scale(1.0 / source.scale(), 1.0 / source.scale());
    ctx.set_source_surface(&image, 0.0, 0.0)?;
    ctx.source().set_filter(Filter::Good);
    ctx.paint()?;
    ctx.restore()?;
    Ok(())
}
