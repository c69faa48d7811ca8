//! Shared helpers for benchmark drivers.

use crate::{BitDepth, PixelCode, PixelMatrix};

pub const BENCH_SIZES: [usize; 4] = [256, 512, 1024, 2048];
pub const BENCH_DEPTHS: [BitDepth; 5] = BitDepth::ALL;
pub const BENCH_ANGLES: [f64; 5] = [0.0, 15.0, 45.0, 90.0, 180.0];

/// Diagonal gradient whose codes span the full range of `depth`.
pub fn create_test_matrix(rows: usize, cols: usize, depth: BitDepth) -> PixelMatrix {
    let mask = depth.code_mask() as u64;
    let mut matrix = PixelMatrix::new(rows, cols, 0);
    for r in 0..rows {
        let row = matrix.row_mut(r);
        for (c, code) in row.iter_mut().enumerate() {
            let val = (r + c) as f64 / (rows + cols).max(1) as f64;
            *code = ((val * mask as f64) as u64 & mask) as PixelCode;
        }
    }
    matrix
}

pub fn depth_to_string(depth: BitDepth) -> &'static str {
    match depth {
        BitDepth::One => "1BPP",
        BitDepth::Four => "4BPP",
        BitDepth::Eight => "8BPP",
        BitDepth::TwentyFour => "24BPP",
        BitDepth::ThirtyTwo => "32BPP",
    }
}
