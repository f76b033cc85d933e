use super::{
    ComposeError, EXPORT_SCALE, StyleParameters, canvas_size, compose,
    gradient::{GradientSpec, UnitPoint},
    color,
};
use crate::bitmap::Bitmap;

const RED: [u8; 4] = [255, 0, 0, 255];

fn red_source(width: u32, height: u32) -> Bitmap {
    Bitmap::solid(width, height, 1.0, RED).unwrap()
}

fn bare_style(padding: f64) -> StyleParameters {
    StyleParameters {
        padding,
        show_gradient: false,
        show_shadow: false,
        ..StyleParameters::default()
    }
}

fn solid_gradient() -> GradientSpec {
    GradientSpec::new(
        vec![color::BLUE, color::BLUE],
        UnitPoint::TOP,
        UnitPoint::BOTTOM,
    )
    .unwrap()
}

#[test]
fn canvas_adds_padding_on_both_sides() {
    let style = StyleParameters {
        padding: 48.0,
        screenshot_corner_radius: 24.0,
        background_corner_radius: 32.0,
        ..StyleParameters::default()
    };
    let source = red_source(800, 600);

    assert_eq!(canvas_size(&source, &style), (896.0, 696.0));

    let logical = compose(&source, &style, 1.0).unwrap();
    assert_eq!((logical.width(), logical.height()), (896, 696));

    let exported = compose(&source, &style, EXPORT_SCALE).unwrap();
    assert_eq!((exported.width(), exported.height()), (1792, 1392));
    assert_eq!(exported.logical_width, 896.0);
    assert_eq!(exported.bitmap.scale(), 2.0);
}

#[test]
fn retina_source_is_laid_out_in_points() {
    let source = Bitmap::solid(200, 100, 2.0, RED).unwrap();
    let result = compose(&source, &bare_style(10.0), 2.0).unwrap();
    // 100x50 points + 2*10 padding, rendered at 2x.
    assert_eq!((result.width(), result.height()), (240, 140));
    assert_eq!(result.bitmap.rgba_at(120, 70), Some(RED));
}

#[test]
fn compositing_is_byte_identical_across_calls() {
    let source = red_source(60, 40);
    let style = StyleParameters {
        padding: 12.0,
        shadow_radius: 6.0,
        shadow_y_offset: 4.0,
        ..StyleParameters::default()
    };

    let first = compose(&source, &style, EXPORT_SCALE).unwrap();
    let second = compose(&source, &style, EXPORT_SCALE).unwrap();
    assert_eq!(first.bitmap.data(), second.bitmap.data());
}

#[test]
fn background_corners_stay_transparent() {
    let source = red_source(80, 60);
    let style = StyleParameters {
        padding: 20.0,
        background_corner_radius: 16.0,
        gradient: solid_gradient(),
        show_shadow: false,
        ..StyleParameters::default()
    };
    let result = compose(&source, &style, 1.0).unwrap();
    let (w, h) = (result.width(), result.height());

    for (x, y) in [(0, 0), (w - 1, 0), (0, h - 1), (w - 1, h - 1)] {
        let px = result.bitmap.rgba_at(x, y).unwrap();
        assert_eq!(px[3], 0, "corner ({x},{y}) should be transparent");
    }

    // Middle of the left padding band is solid gradient.
    let edge = result.bitmap.rgba_at(5, h / 2).unwrap();
    assert_eq!(edge[3], 255);
    assert!(edge[2] > 200 && edge[0] < 10);
}

#[test]
fn foreground_is_inset_by_padding_and_rounded() {
    let source = red_source(100, 80);
    let style = StyleParameters {
        screenshot_corner_radius: 20.0,
        ..bare_style(30.0)
    };
    let result = compose(&source, &style, 1.0).unwrap();

    // Padding band is empty without a gradient.
    assert_eq!(result.bitmap.rgba_at(10, 10).unwrap()[3], 0);
    // Rounded corner of the screenshot is cut away.
    assert_eq!(result.bitmap.rgba_at(31, 31).unwrap()[3], 0);
    // Centre shows the source untouched.
    assert_eq!(result.bitmap.rgba_at(80, 70), Some(RED));
}

#[test]
fn shadow_darkens_area_below_screenshot() {
    let source = red_source(80, 60);
    let with_shadow = StyleParameters {
        padding: 40.0,
        gradient: solid_gradient(),
        shadow_opacity: 0.8,
        shadow_radius: 8.0,
        shadow_y_offset: 12.0,
        ..StyleParameters::default()
    };
    let without_shadow = StyleParameters {
        show_shadow: false,
        ..with_shadow.clone()
    };

    let lit = compose(&source, &without_shadow, 1.0).unwrap();
    let shaded = compose(&source, &with_shadow, 1.0).unwrap();

    // Just below the screenshot's bottom edge.
    let (x, y) = (80, 40 + 60 + 6);
    let lit_px = lit.bitmap.rgba_at(x, y).unwrap();
    let shaded_px = shaded.bitmap.rgba_at(x, y).unwrap();
    assert!(shaded_px[2] < lit_px[2], "{shaded_px:?} vs {lit_px:?}");
}

#[test]
fn disabled_shadow_has_no_effect() {
    let source = red_source(50, 50);
    let off = StyleParameters {
        padding: 16.0,
        show_shadow: false,
        ..StyleParameters::default()
    };
    let invisible = StyleParameters {
        show_shadow: true,
        shadow_opacity: 0.0,
        ..off.clone()
    };
    let a = compose(&source, &off, 1.0).unwrap();
    let b = compose(&source, &invisible, 1.0).unwrap();
    assert_eq!(a.bitmap.data(), b.bitmap.data());
}

#[test]
fn rejects_non_positive_scale() {
    let source = red_source(10, 10);
    let err = compose(&source, &StyleParameters::default(), 0.0).unwrap_err();
    assert!(matches!(err, ComposeError::InvalidScale(s) if s == 0.0));
}

#[test]
fn rejects_oversized_canvas() {
    let source = red_source(20_000, 1);
    let err = compose(&source, &bare_style(0.0), 2.0).unwrap_err();
    assert!(matches!(err, ComposeError::CanvasTooLarge { width: 40_000, .. }));
}
