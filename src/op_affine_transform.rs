//! Affine warp of a pixel matrix by backward mapping.
//!
//! # Algorithm Overview
//!
//! 1. **Resolve**: the configured transform (an explicit matrix or a rotation
//!    about a proportional pivot) is turned into its inverse once per image.
//!    Explicit matrices are inverted when they are installed, so a singular
//!    matrix is rejected before any pixel is touched.
//!
//! 2. **Backward mapping**: every destination pixel `(i, j)` is mapped through
//!    the inverse into source space. Mapping in this direction leaves no holes
//!    in the output.
//!
//! 3. **Resampling**: the fractional source coordinate is reconstructed with
//!    the configured [`Resampling`] strategy. Coordinates outside the sampling
//!    window produce the background code.
//!
//! [`OpAffineTransform::apply_packed`] wraps the three steps with the row codec
//! so raw pixel arrays go in and come out in the same packed layout.

use tracing::debug;

use crate::affine::AffineTransform;
use crate::bit_depth::{BitDepth, PixelCode};
use crate::error::Result;
use crate::matrix::PixelMatrix;
use crate::resample::Resampling;
use crate::row_codec::{DecodeReport, RowCodec, RowOrder};

#[derive(Copy, Clone, Debug, PartialEq)]
enum TransformSource {
    Matrix {
        forward: AffineTransform,
        inverse: AffineTransform,
    },
    Rotation {
        angle_degrees: f64,
        pivot_x: f64,
        pivot_y: f64,
    },
}

/// Result of warping a packed pixel array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedOutput {
    /// Pixel array in the same layout and row order as the input.
    pub data: Vec<u8>,
    /// Anomalies found while decoding the input.
    pub report: DecodeReport,
}

/// Affine warp operator.
///
/// Holds the whole configuration of a run: the transform, the resampling
/// strategy, the bit depth of the codes and the background code used where
/// the source has nothing to offer.
#[derive(Clone, Debug)]
pub struct OpAffineTransform {
    source: TransformSource,
    resampling: Resampling,
    bit_depth: BitDepth,
    background: PixelCode,
}

impl OpAffineTransform {
    /// Identity transform with bilinear resampling and a zero background.
    pub fn new(bit_depth: BitDepth) -> Self {
        let identity = AffineTransform::identity();
        Self {
            source: TransformSource::Matrix {
                forward: identity,
                inverse: identity,
            },
            resampling: Resampling::default(),
            bit_depth,
            background: 0,
        }
    }

    /// Installs an explicit forward transform.
    ///
    /// The inverse is computed here; a singular matrix leaves the previous
    /// configuration untouched and returns the error.
    pub fn set_transform(&mut self, transform: AffineTransform) -> Result<&mut Self> {
        let inverse = transform.invert()?;
        self.source = TransformSource::Matrix {
            forward: transform,
            inverse,
        };
        Ok(self)
    }

    /// Rotates about a pivot given as proportions of the image size.
    ///
    /// The pivot is resolved against the source dimensions at apply time, see
    /// [`AffineTransform::build_rotation`].
    pub fn set_rotation(&mut self, angle_degrees: f64, pivot_x: f64, pivot_y: f64) -> &mut Self {
        self.source = TransformSource::Rotation {
            angle_degrees,
            pivot_x,
            pivot_y,
        };
        self
    }

    pub fn set_resampling(&mut self, resampling: Resampling) -> &mut Self {
        self.resampling = resampling;
        self
    }

    /// Sets the code written where the source has no data. Masked to the bit depth.
    pub fn set_background(&mut self, code: PixelCode) -> &mut Self {
        self.background = code & self.bit_depth.code_mask();
        self
    }

    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    pub fn resampling(&self) -> Resampling {
        self.resampling
    }

    pub fn background(&self) -> PixelCode {
        self.background
    }

    /// Forward transform for an image of `rows × cols`.
    pub fn forward_transform(&self, rows: usize, cols: usize) -> AffineTransform {
        match self.source {
            TransformSource::Matrix { forward, .. } => forward,
            TransformSource::Rotation {
                angle_degrees,
                pivot_x,
                pivot_y,
            } => AffineTransform::build_rotation(angle_degrees, pivot_x, pivot_y, rows, cols),
        }
    }

    fn inverse_transform(&self, rows: usize, cols: usize) -> AffineTransform {
        match self.source {
            TransformSource::Matrix { inverse, .. } => inverse,
            // A rotation is undone by the opposite rotation about the same pivot.
            TransformSource::Rotation {
                angle_degrees,
                pivot_x,
                pivot_y,
            } => AffineTransform::build_rotation(-angle_degrees, pivot_x, pivot_y, rows, cols),
        }
    }

    /// Warps `src` into a new matrix of the same dimensions.
    pub fn apply(&self, src: &PixelMatrix) -> PixelMatrix {
        let mut dst =
            PixelMatrix::with_allocation(src.rows(), src.cols(), self.background, src.allocation());
        self.apply_to_preallocated(src, &mut dst);
        dst
    }

    /// Warps `src` into `dst`, overwriting every destination pixel.
    ///
    /// Source coordinates are resolved against the source dimensions, so `dst`
    /// may differ in size from `src`.
    pub fn apply_to_preallocated(&self, src: &PixelMatrix, dst: &mut PixelMatrix) {
        let inverse = self.inverse_transform(src.rows(), src.cols());
        debug!(
            rows = src.rows(),
            cols = src.cols(),
            resampling = ?self.resampling,
            "inverse transform:\n{inverse}"
        );

        let (resampling, depth, background) = (self.resampling, self.bit_depth, self.background);
        for i in 0..dst.rows() {
            let row = dst.row_mut(i);
            for (j, out) in row.iter_mut().enumerate() {
                let (x, y) = inverse.map_point(i as f64, j as f64);
                *out = resampling.sample(src, x, y, depth, background);
            }
        }
    }

    /// Decodes a packed pixel array, warps it and encodes the result.
    ///
    /// `data` must start at the first stored row; trailing bytes past
    /// `height` rows are ignored.
    pub fn apply_packed(
        &self,
        data: &[u8],
        width: usize,
        height: usize,
        order: RowOrder,
    ) -> Result<PackedOutput> {
        let codec = RowCodec::new(width, self.bit_depth).with_order(order);
        let decoded = codec.decode_image(data, height)?;
        let warped = self.apply(&decoded.matrix);
        let data = codec.encode_image(&warped)?;
        Ok(PackedOutput {
            data,
            report: decoded.report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn pattern(rows: usize, cols: usize) -> PixelMatrix {
        let mut m = PixelMatrix::new(rows, cols, 0);
        for r in 0..rows {
            for c in 0..cols {
                m.set(r, c, (r * cols + c) as PixelCode);
            }
        }
        m
    }

    #[test]
    fn test_identity_reproduces_source() {
        let src = pattern(5, 7);
        for resampling in [Resampling::Nearest, Resampling::Bilinear] {
            let mut op = OpAffineTransform::new(BitDepth::Eight);
            op.set_resampling(resampling);
            assert_eq!(op.apply(&src), src);
        }
    }

    #[test]
    fn test_two_by_two_rgba_identity() {
        let src = PixelMatrix::from_rows(&[[0x00u32, 0xFF], [0xFF, 0x00]]);
        let op = OpAffineTransform::new(BitDepth::ThirtyTwo);
        assert_eq!(op.apply(&src), src);
    }

    #[test]
    fn test_translation_shifts_and_fills_background() {
        let src = pattern(3, 3);
        let mut op = OpAffineTransform::new(BitDepth::Eight);
        op.set_transform(AffineTransform::translation(0.0, 1.0))
            .expect("invertible")
            .set_background(99);
        let out = op.apply(&src);
        assert_eq!(
            out,
            PixelMatrix::from_rows(&[[99u32, 0, 1], [99, 3, 4], [99, 6, 7]])
        );
    }

    #[test]
    fn test_singular_transform_is_rejected() {
        let mut op = OpAffineTransform::new(BitDepth::Eight);
        op.set_transform(AffineTransform::translation(1.0, 0.0))
            .expect("invertible");
        let err = op
            .set_transform(AffineTransform::scale(1.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, Error::SingularTransform { .. }));
        assert_eq!(
            op.forward_transform(4, 4),
            AffineTransform::translation(1.0, 0.0)
        );
    }

    #[test]
    fn test_rotation_about_center_by_half_turn() {
        let src = pattern(3, 3);
        let mut op = OpAffineTransform::new(BitDepth::Eight);
        // Pivot (3 * 2/3 - 1, 3 * 2/3 - 1) = (1, 1), the center pixel.
        op.set_rotation(180.0, 2.0 / 3.0, 2.0 / 3.0)
            .set_resampling(Resampling::Nearest);
        let out = op.apply(&src);
        for r in 0..3 {
            for c in 0..3 {
                assert_eq!(out.get(r, c), src.get(2 - r, 2 - c));
            }
        }
    }

    #[test]
    fn test_rotation_zero_is_identity() {
        let src = pattern(4, 6);
        let mut op = OpAffineTransform::new(BitDepth::Eight);
        op.set_rotation(0.0, 0.5, 0.5);
        assert_eq!(op.apply(&src), src);
    }

    #[test]
    fn test_scale_up_nearest() {
        let src = PixelMatrix::from_rows(&[[1u32, 2], [3, 4]]);
        let mut op = OpAffineTransform::new(BitDepth::Eight);
        op.set_transform(AffineTransform::scale(2.0, 2.0))
            .expect("invertible")
            .set_resampling(Resampling::Nearest);
        let out = op.apply(&src);
        // Destination (1, 1) maps back to (0.5, 0.5), which rounds up.
        assert_eq!(out, PixelMatrix::from_rows(&[[1u32, 2], [3, 4]]));
    }

    #[test]
    fn test_apply_packed_round_trips_identity() {
        let codec = RowCodec::new(5, BitDepth::Four);
        let src = pattern(3, 5);
        let mut masked = src.clone();
        for r in 0..3 {
            for c in 0..5 {
                masked.set(r, c, src.get(r, c) & 0xF);
            }
        }
        let packed = codec.encode_image(&masked).expect("encode");

        let op = OpAffineTransform::new(BitDepth::Four);
        let out = op
            .apply_packed(&packed, 5, 3, RowOrder::BottomUp)
            .expect("warp");
        assert_eq!(out.data, packed);
        assert!(out.report.is_clean());
    }
}
