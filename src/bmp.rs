//! Minimal BMP container handling around the pixel array.
//!
//! Only the fields the warp needs are interpreted: the `BM` signature, the
//! pixel data offset, width, height (negative means top-down), bit count and
//! compression. Everything in front of the pixel array (file header, info
//! header, color table) and anything after it is carried through verbatim.
//!
//! ```text
//! | file header (14) | info header | color table | pixel array | trailer |
//! |<------------- prefix, kept verbatim -------->|
//! ```

use std::path::Path;

use tracing::debug;

use crate::bit_depth::BitDepth;
use crate::error::{Error, Result};
use crate::matrix::PixelMatrix;
use crate::row_codec::{Decoded, RowCodec, RowOrder};

pub const SIGNATURE: u16 = 0x4d42;

const FILE_HEADER_LEN: usize = 14;
const CORE_HEADER_LEN: usize = 12;
const INFO_HEADER_LEN: usize = 40;

const BI_RGB: u32 = 0;
const BI_BITFIELDS: u32 = 3;

fn read_u16(bytes: &[u8], at: usize) -> Result<u16> {
    bytes
        .get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or(Error::Truncated {
            needed: at + 2,
            available: bytes.len(),
        })
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32> {
    bytes
        .get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(Error::Truncated {
            needed: at + 4,
            available: bytes.len(),
        })
}

/// A BMP file split into its verbatim prefix, pixel array and trailer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BmpImage {
    prefix: Vec<u8>,
    pixels: Vec<u8>,
    trailer: Vec<u8>,
    width: usize,
    height: usize,
    bit_depth: BitDepth,
    row_order: RowOrder,
}

impl BmpImage {
    /// Splits a complete BMP file.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let signature = read_u16(bytes, 0)?;
        if signature != SIGNATURE {
            return Err(Error::InvalidSignature { found: signature });
        }
        let offset = read_u32(bytes, 10)? as usize;
        let header_len = read_u32(bytes, FILE_HEADER_LEN)? as usize;

        let (width, height, bits, compression) = if header_len == CORE_HEADER_LEN {
            (
                read_u16(bytes, 18)? as i64,
                read_u16(bytes, 20)? as i64,
                read_u16(bytes, 24)?,
                BI_RGB,
            )
        } else {
            (
                read_u32(bytes, 18)? as i32 as i64,
                read_u32(bytes, 22)? as i32 as i64,
                read_u16(bytes, 28)?,
                read_u32(bytes, 30)?,
            )
        };

        let bit_depth = BitDepth::try_from(bits)?;
        if compression != BI_RGB && !(compression == BI_BITFIELDS && bits == 32) {
            return Err(Error::UnsupportedCompression(compression));
        }
        if width <= 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        let row_order = if height < 0 {
            RowOrder::TopDown
        } else {
            RowOrder::BottomUp
        };
        let width = width as usize;
        let height = height.unsigned_abs() as usize;

        let stride = bit_depth.row_layout(width).stride();
        let end = stride
            .checked_mul(height)
            .and_then(|len| len.checked_add(offset))
            .ok_or(Error::InvalidDimensions {
                width: width as i64,
                height: height as i64,
            })?;
        if offset < FILE_HEADER_LEN + header_len || bytes.len() < end {
            return Err(Error::Truncated {
                needed: end.max(FILE_HEADER_LEN + header_len),
                available: bytes.len(),
            });
        }

        debug!(
            width,
            height,
            bits,
            ?row_order,
            color_table_bytes = offset - FILE_HEADER_LEN - header_len,
            "parsed bitmap header"
        );

        Ok(Self {
            prefix: bytes[..offset].to_vec(),
            pixels: bytes[offset..end].to_vec(),
            trailer: bytes[end..].to_vec(),
            width,
            height,
            bit_depth,
            row_order,
        })
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::parse(&bytes)
    }

    /// Builds a bottom-up BMP around `matrix`. Depths up to 8 bits get a
    /// grayscale color table.
    pub fn from_matrix(matrix: &PixelMatrix, bit_depth: BitDepth) -> Result<Self> {
        let codec = RowCodec::new(matrix.cols(), bit_depth);
        let pixels = codec.encode_image(matrix)?;

        let palette_len = if bit_depth.bits() <= 8 {
            1usize << bit_depth.bits()
        } else {
            0
        };
        let offset = FILE_HEADER_LEN + INFO_HEADER_LEN + palette_len * 4;
        let file_len = offset + pixels.len();

        let mut prefix = Vec::with_capacity(offset);
        prefix.extend_from_slice(&SIGNATURE.to_le_bytes());
        prefix.extend_from_slice(&(file_len as u32).to_le_bytes());
        prefix.extend_from_slice(&[0; 4]);
        prefix.extend_from_slice(&(offset as u32).to_le_bytes());

        prefix.extend_from_slice(&(INFO_HEADER_LEN as u32).to_le_bytes());
        prefix.extend_from_slice(&(matrix.cols() as i32).to_le_bytes());
        prefix.extend_from_slice(&(matrix.rows() as i32).to_le_bytes());
        prefix.extend_from_slice(&1u16.to_le_bytes());
        prefix.extend_from_slice(&(bit_depth.bits() as u16).to_le_bytes());
        prefix.extend_from_slice(&BI_RGB.to_le_bytes());
        prefix.extend_from_slice(&(pixels.len() as u32).to_le_bytes());
        prefix.extend_from_slice(&2835u32.to_le_bytes());
        prefix.extend_from_slice(&2835u32.to_le_bytes());
        prefix.extend_from_slice(&(palette_len as u32).to_le_bytes());
        prefix.extend_from_slice(&0u32.to_le_bytes());

        for i in 0..palette_len {
            let level = (i * 255 / (palette_len - 1).max(1)) as u8;
            prefix.extend_from_slice(&[level, level, level, 0]);
        }

        Ok(Self {
            prefix,
            pixels,
            trailer: Vec::new(),
            width: matrix.cols(),
            height: matrix.rows(),
            bit_depth,
            row_order: RowOrder::BottomUp,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    pub fn row_order(&self) -> RowOrder {
        self.row_order
    }

    /// Header and color table bytes in front of the pixel array.
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn codec(&self) -> RowCodec {
        RowCodec::new(self.width, self.bit_depth).with_order(self.row_order)
    }

    pub fn decode(&self) -> Result<Decoded> {
        self.codec().decode_image(&self.pixels, self.height)
    }

    /// Replaces the pixel array with `matrix`, which must match the image size.
    pub fn set_pixels(&mut self, matrix: &PixelMatrix) -> Result<()> {
        if matrix.rows() != self.height {
            return Err(Error::DimensionMismatch {
                expected: self.height,
                actual: matrix.rows(),
            });
        }
        self.pixels = self.codec().encode_image(matrix)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(self.prefix.len() + self.pixels.len() + self.trailer.len());
        out.extend_from_slice(&self.prefix);
        out.extend_from_slice(&self.pixels);
        out.extend_from_slice(&self.trailer);
        out
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_bytes())?;
        Ok(())
    }
}
