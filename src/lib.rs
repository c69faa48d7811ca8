//! Affine warping of bit-packed, row-padded bitmaps.
//!
//! # Pipeline
//!
//! - **Decode** ([`RowCodec`]): stored rows at 1, 4, 8, 24 or 32 bits per pixel,
//!   each padded to a multiple of four bytes, are unpacked into a
//!   [`PixelMatrix`] of integer pixel codes.
//! - **Warp** ([`OpAffineTransform`]): every destination pixel is mapped back
//!   through the inverse of an [`AffineTransform`] and reconstructed with a
//!   [`Resampling`] strategy.
//! - **Encode** ([`RowCodec`]): the warped matrix is packed again with the same
//!   width, depth, padding and row order.
//!
//! [`BmpImage`] carries the surrounding BMP headers and color table through
//! untouched.
//!
//! # Example
//!
//! ```
//! use bmp_warp::{BitDepth, OpAffineTransform, PixelMatrix, Resampling};
//!
//! let src = PixelMatrix::from_rows(&[[0u32, 64, 128], [192, 255, 32]]);
//!
//! // Rotate 30 degrees about the pivot at half the height and width
//! let mut warp = OpAffineTransform::new(BitDepth::Eight);
//! warp.set_rotation(30.0, 0.5, 0.5)
//!     .set_resampling(Resampling::Bilinear);
//! let rotated = warp.apply(&src);
//! assert_eq!((rotated.rows(), rotated.cols()), (2, 3));
//! ```

mod affine;
#[doc(hidden)]
pub mod bench_utils;
mod bit_depth;
mod bmp;
mod error;
mod matrix;
mod op_affine_transform;
mod resample;
mod row_codec;

pub use crate::affine::AffineTransform;
pub use crate::bit_depth::{BitDepth, ChannelLayout, PixelCode, RowLayout};
pub use crate::bmp::{BmpImage, SIGNATURE};
pub use crate::error::{Error, Result};
pub use crate::matrix::{Allocation, PixelMatrix};
pub use crate::op_affine_transform::{OpAffineTransform, PackedOutput};
pub use crate::resample::{Resampling, sample_bilinear, sample_nearest};
pub use crate::row_codec::{Anomaly, DecodeReport, Decoded, Diagnostics, RowCodec, RowOrder};
