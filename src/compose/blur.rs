//! Gaussian blur approximation for the drop shadow layer.
//!
//! Three successive box blurs per axis give a close approximation of a
//! gaussian with the requested sigma. Pixels outside the buffer count as
//! fully transparent, so blurred edges fade out instead of smearing.

/// Box widths whose repeated application approximates a gaussian of `sigma`.
fn box_sizes(sigma: f64, passes: usize) -> Vec<usize> {
    let n = passes as f64;
    let ideal = (12.0 * sigma * sigma / n + 1.0).sqrt();
    let mut lower = ideal.floor() as usize;
    if lower % 2 == 0 {
        lower = lower.saturating_sub(1);
    }
    let lower = lower.max(1);
    let upper = lower + 2;
    let l = lower as f64;
    let m = ((12.0 * sigma * sigma - n * l * l - 4.0 * n * l - 3.0 * n) / (-4.0 * l - 4.0))
        .round()
        .max(0.0) as usize;
    (0..passes)
        .map(|i| if i < m { lower } else { upper })
        .collect()
}

/// Blurs a premultiplied ARGB32 buffer in place.
pub fn gaussian_blur(data: &mut [u8], width: usize, height: usize, sigma: f64) {
    if width == 0 || height == 0 || !(sigma.is_finite() && sigma > 0.0) {
        return;
    }
    debug_assert_eq!(data.len(), width * height * 4);

    let mut scratch = vec![0u8; data.len()];
    for size in box_sizes(sigma, 3) {
        let radius = (size - 1) / 2;
        if radius == 0 {
            continue;
        }
        // Horizontal: lines are rows, elements step by one pixel.
        box_pass(data, &mut scratch, width, height, 4, width * 4, radius);
        // Vertical: lines are columns, elements step by one row.
        box_pass(&scratch, data, height, width, width * 4, 4, radius);
    }
}

fn box_pass(
    src: &[u8],
    dst: &mut [u8],
    len: usize,
    lines: usize,
    elem_step: usize,
    line_step: usize,
    radius: usize,
) {
    let div = (2 * radius + 1) as u32;
    for line in 0..lines {
        let base = line * line_step;
        for channel in 0..4 {
            let at = |i: usize| base + i * elem_step + channel;
            let mut sum: u32 = (0..=radius.min(len - 1)).map(|i| src[at(i)] as u32).sum();
            for i in 0..len {
                dst[at(i)] = ((sum + div / 2) / div) as u8;
                let incoming = i + radius + 1;
                if incoming < len {
                    sum += src[at(incoming)] as u32;
                }
                if i >= radius {
                    sum -= src[at(i - radius)] as u32;
                }
            }
        }
    }
}
