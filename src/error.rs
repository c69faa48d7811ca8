//! Error type shared by the codec, the transform and the container layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Container does not start with the `BM` signature
    #[error("wrong file format: signature {found:#06x}, expected 0x4d42")]
    InvalidSignature { found: u16 },

    /// Input ended before a header or the pixel array was complete
    #[error("truncated input: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("unsupported bit depth: {0} (expected 1, 4, 8, 24 or 32)")]
    UnsupportedBitDepth(u16),

    #[error("unsupported compression method: {0}")]
    UnsupportedCompression(u32),

    #[error("invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: i64, height: i64 },

    /// Transform has no inverse and cannot drive backward mapping
    #[error("transform is not invertible (determinant {determinant})")]
    SingularTransform { determinant: f64 },

    #[error("cannot parse transform entry {token:?} on line {line}")]
    TransformParse { line: usize, token: String },

    #[error("size mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
