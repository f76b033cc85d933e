//! Path helpers for rounded rectangles.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::geometry::Rect;

/// Appends a rounded rectangle sub-path to the current path.
///
/// The radius is clamped to half of the shorter side; a zero radius yields a
/// plain rectangle.
pub fn rounded_rect(ctx: &cairo::Context, rect: Rect, radius: f64) {
    let r = radius
        .min(rect.width / 2.0)
        .min(rect.height / 2.0)
        .max(0.0);

    if r <= 0.0 {
        ctx.rectangle(rect.x, rect.y, rect.width, rect.height);
        return;
    }

    let (x, y, w, h) = (rect.x, rect.y, rect.width, rect.height);
    ctx.new_sub_path();
    ctx.arc(x + w - r, y + r, r, -FRAC_PI_2, 0.0);
    ctx.arc(x + w - r, y + h - r, r, 0.0, FRAC_PI_2);
    ctx.arc(x + r, y + h - r, r, FRAC_PI_2, PI);
    ctx.arc(x + r, y + r, r, PI, 3.0 * FRAC_PI_2);
    ctx.close_path();
}
