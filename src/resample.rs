//! Reconstruction of a pixel code at a fractional source coordinate.
//!
//! Coordinates follow the matrix convention: `x` is the row, `y` the column,
//! and integer coordinates land exactly on stored pixels. Neighbors that fall
//! outside the matrix read as the background code.
//!
//! A coordinate is only sampled when every neighbor with a non-zero weight is
//! inside the image, which is the window `[0, rows-1] × [0, cols-1]`. Outside
//! it both strategies return the background directly, so no border pixel is
//! blended with the fill.

use crate::bit_depth::{BitDepth, PixelCode};
use crate::matrix::PixelMatrix;

/// Resampling strategy used for backward mapping.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Resampling {
    /// Nearest stored pixel; ties round toward the higher index.
    Nearest,
    /// Per-channel weighted average of the surrounding 2×2 pixels.
    #[default]
    Bilinear,
}

impl Resampling {
    #[inline]
    pub fn sample(
        self,
        src: &PixelMatrix,
        x: f64,
        y: f64,
        depth: BitDepth,
        background: PixelCode,
    ) -> PixelCode {
        match self {
            Resampling::Nearest => sample_nearest(src, x, y, background),
            Resampling::Bilinear => sample_bilinear(src, x, y, depth, background),
        }
    }
}

/// Slack for coordinates that should land on the border but miss it by
/// rounding error.
const EDGE_EPSILON: f64 = 1e-9;

#[inline]
fn in_window(src: &PixelMatrix, x: f64, y: f64) -> bool {
    let max_x = src.rows() as f64 - 1.0 + EDGE_EPSILON;
    let max_y = src.cols() as f64 - 1.0 + EDGE_EPSILON;
    x >= -EDGE_EPSILON && x <= max_x && y >= -EDGE_EPSILON && y <= max_y
}

pub fn sample_nearest(src: &PixelMatrix, x: f64, y: f64, background: PixelCode) -> PixelCode {
    if !in_window(src, x, y) {
        return background;
    }
    let xi = (x + 0.5).floor() as isize;
    let yi = (y + 0.5).floor() as isize;
    src.get_or_default(xi, yi, background)
}

pub fn sample_bilinear(
    src: &PixelMatrix,
    x: f64,
    y: f64,
    depth: BitDepth,
    background: PixelCode,
) -> PixelCode {
    if !in_window(src, x, y) {
        return background;
    }

    let x0 = x.floor();
    let y0 = y.floor();
    let dx = x - x0;
    let dy = y - y0;
    let r0 = x0 as isize;
    let c0 = y0 as isize;

    let neighbors = [
        (src.get_or_default(r0, c0, background), (1.0 - dx) * (1.0 - dy)),
        (src.get_or_default(r0 + 1, c0, background), dx * (1.0 - dy)),
        (src.get_or_default(r0, c0 + 1, background), (1.0 - dx) * dy),
        (src.get_or_default(r0 + 1, c0 + 1, background), dx * dy),
    ];

    let layout = depth.channels();
    let max_val = layout.channel_max() as f64;
    let mut channels = [0 as PixelCode; 4];
    for (c, out) in channels.iter_mut().enumerate().take(layout.count) {
        let sum: f64 = neighbors
            .iter()
            .map(|&(code, weight)| layout.extract(code, c) as f64 * weight)
            .sum();
        *out = sum.round().clamp(0.0, max_val) as PixelCode;
    }
    layout.pack(&channels[..layout.count])
}
