//! Conversion between packed, row-padded pixel bytes and pixel codes.
//!
//! # Packing Convention
//!
//! - Depths of 8 bits and above store one pixel per `bits / 8` bytes,
//!   little-endian, with no bit shifting.
//! - Depths below 8 store `8 / bits` pixels per byte, most significant bits
//!   first: the leftmost pixel of a byte sits in its high bits.
//!
//! ```text
//! 1 bpp, pixels [1, 0, 1]:   1 0 1 0 0 0 0 0 | 00 00 00
//!                            ^ data byte       ^ padding
//! ```
//!
//! Encoding applies the same convention, so `encode(decode(row))` returns the
//! original bytes whenever the padding and unused tail bits were zero.
//!
//! # Row Order
//!
//! Stored rows normally run bottom to top ([`RowOrder::BottomUp`]); the first
//! stored row lands in matrix row `rows - 1`.

use tracing::{debug, warn};

use crate::bit_depth::{BitDepth, PixelCode, RowLayout};
use crate::error::{Error, Result};
use crate::matrix::PixelMatrix;

/// Vertical order of stored rows.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum RowOrder {
    /// First stored row is the bottom of the image.
    #[default]
    BottomUp,
    /// First stored row is the top of the image.
    TopDown,
}

/// Suspicious content noticed while decoding a row.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Anomaly {
    /// Padding bytes that should be zero were not.
    NonZeroPadding { row: usize, bytes: usize },
    /// Unused low bits of the last packed byte were set.
    NonZeroTailBits { row: usize },
}

/// Receives anomalies from the decoder.
pub trait Diagnostics {
    fn record(&mut self, anomaly: Anomaly);
}

/// Discards every anomaly.
impl Diagnostics for () {
    fn record(&mut self, _anomaly: Anomaly) {}
}

/// Anomaly tally for one decode call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodeReport {
    pub nonzero_padding_bytes: usize,
    pub rows_with_tail_bits: usize,
}

impl DecodeReport {
    pub fn is_clean(&self) -> bool {
        self.nonzero_padding_bytes == 0 && self.rows_with_tail_bits == 0
    }
}

impl Diagnostics for DecodeReport {
    fn record(&mut self, anomaly: Anomaly) {
        match anomaly {
            Anomaly::NonZeroPadding { bytes, .. } => self.nonzero_padding_bytes += bytes,
            Anomaly::NonZeroTailBits { .. } => self.rows_with_tail_bits += 1,
        }
    }
}

/// A decoded image together with the anomalies seen while decoding it.
#[derive(Debug)]
pub struct Decoded {
    pub matrix: PixelMatrix,
    pub report: DecodeReport,
}

/// Row codec for one image width and bit depth.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RowCodec {
    depth: BitDepth,
    layout: RowLayout,
    order: RowOrder,
}

impl RowCodec {
    pub fn new(width: usize, depth: BitDepth) -> Self {
        Self {
            depth,
            layout: depth.row_layout(width),
            order: RowOrder::default(),
        }
    }

    pub fn with_order(mut self, order: RowOrder) -> Self {
        self.order = order;
        self
    }

    pub fn depth(&self) -> BitDepth {
        self.depth
    }

    pub fn layout(&self) -> RowLayout {
        self.layout
    }

    pub fn order(&self) -> RowOrder {
        self.order
    }

    /// Decodes one stored row. Anything past the stride is ignored; fewer
    /// bytes than one stride is [`Error::Truncated`].
    pub fn decode_row(
        &self,
        bytes: &[u8],
        diagnostics: &mut impl Diagnostics,
    ) -> Result<Vec<PixelCode>> {
        let stride = self.layout.stride();
        if bytes.len() < stride {
            return Err(Error::Truncated {
                needed: stride,
                available: bytes.len(),
            });
        }
        let mut codes = vec![0; self.layout.width];
        self.decode_row_into(bytes, 0, &mut codes, diagnostics);
        Ok(codes)
    }

    /// Encodes exactly one row of codes into data bytes followed by zero padding.
    pub fn encode_row(&self, codes: &[PixelCode]) -> Result<Vec<u8>> {
        if codes.len() != self.layout.width {
            return Err(Error::DimensionMismatch {
                expected: self.layout.width,
                actual: codes.len(),
            });
        }
        let mut out = Vec::with_capacity(self.layout.stride());
        self.encode_row_into(codes, &mut out);
        Ok(out)
    }

    fn decode_row_into(
        &self,
        bytes: &[u8],
        row: usize,
        codes: &mut [PixelCode],
        diagnostics: &mut impl Diagnostics,
    ) {
        let RowLayout {
            width,
            packed_byte_width,
            padding_bytes,
        } = self.layout;
        assert!(
            bytes.len() >= packed_byte_width + padding_bytes,
            "row {row} holds {} bytes, layout needs {}",
            bytes.len(),
            packed_byte_width + padding_bytes
        );
        let data = &bytes[..packed_byte_width];

        if self.depth.is_sub_byte() {
            let bits = self.depth.bits();
            let mask = self.depth.code_mask();
            let per_byte = self.depth.pixels_per_unit();
            for (x, code) in codes.iter_mut().enumerate().take(width) {
                let byte = data[x / per_byte] as PixelCode;
                let shift = 8 - bits * (x % per_byte + 1) as u32;
                *code = (byte >> shift) & mask;
            }
            let used_bits = (width * bits as usize) % 8;
            if used_bits != 0 {
                let tail_mask = (1u8 << (8 - used_bits)) - 1;
                if data[packed_byte_width - 1] & tail_mask != 0 {
                    diagnostics.record(Anomaly::NonZeroTailBits { row });
                }
            }
        } else {
            let unit = self.depth.bytes_per_unit();
            for (code, chunk) in codes.iter_mut().zip(data.chunks_exact(unit)) {
                *code = chunk
                    .iter()
                    .rev()
                    .fold(0, |acc, &b| (acc << 8) | b as PixelCode);
            }
        }

        let padding = &bytes[packed_byte_width..packed_byte_width + padding_bytes];
        let dirty = padding.iter().filter(|&&b| b != 0).count();
        if dirty != 0 {
            diagnostics.record(Anomaly::NonZeroPadding { row, bytes: dirty });
        }
    }

    fn encode_row_into(&self, codes: &[PixelCode], out: &mut Vec<u8>) {
        let RowLayout {
            width,
            padding_bytes,
            ..
        } = self.layout;
        let codes = &codes[..width];
        let mask = self.depth.code_mask();

        if self.depth.is_sub_byte() {
            let bits = self.depth.bits();
            for group in codes.chunks(self.depth.pixels_per_unit()) {
                let mut byte = 0u8;
                for (i, &code) in group.iter().enumerate() {
                    let shift = 8 - bits * (i as u32 + 1);
                    byte |= ((code & mask) << shift) as u8;
                }
                out.push(byte);
            }
        } else {
            let unit = self.depth.bytes_per_unit();
            for &code in codes {
                out.extend_from_slice(&(code & mask).to_le_bytes()[..unit]);
            }
        }
        out.resize(out.len() + padding_bytes, 0);
    }

    /// Decodes `height` stored rows from the start of `data` into a matrix.
    pub fn decode_image(&self, data: &[u8], height: usize) -> Result<Decoded> {
        let stride = self.layout.stride();
        let needed = stride * height;
        if data.len() < needed {
            return Err(Error::Truncated {
                needed,
                available: data.len(),
            });
        }
        debug!(
            width = self.layout.width,
            height,
            bits = self.depth.bits(),
            stride,
            padding = self.layout.padding_bytes,
            "decoding pixel array"
        );

        let mut matrix = PixelMatrix::new(height, self.layout.width, 0);
        let mut report = DecodeReport::default();
        for (stored, bytes) in data[..needed].chunks_exact(stride.max(1)).enumerate() {
            let row = self.matrix_row(stored, height);
            self.decode_row_into(bytes, row, matrix.row_mut(row), &mut report);
        }

        if !report.is_clean() {
            warn!(
                padding_bytes = report.nonzero_padding_bytes,
                tail_rows = report.rows_with_tail_bits,
                "pixel array carries non-zero padding or tail bits"
            );
        }
        Ok(Decoded { matrix, report })
    }

    /// Encodes every matrix row in stored order.
    pub fn encode_image(&self, matrix: &PixelMatrix) -> Result<Vec<u8>> {
        if matrix.cols() != self.layout.width {
            return Err(Error::DimensionMismatch {
                expected: self.layout.width,
                actual: matrix.cols(),
            });
        }
        let height = matrix.rows();
        let mut out = Vec::with_capacity(self.layout.stride() * height);
        for stored in 0..height {
            let row = self.matrix_row(stored, height);
            self.encode_row_into(matrix.row(row), &mut out);
        }
        Ok(out)
    }

    fn matrix_row(&self, stored: usize, height: usize) -> usize {
        match self.order {
            RowOrder::BottomUp => height - 1 - stored,
            RowOrder::TopDown => stored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_bit_row_of_three() {
        let codec = RowCodec::new(3, BitDepth::One);
        let bytes = codec.encode_row(&[1, 0, 1]).expect("width");
        assert_eq!(bytes, vec![0b1010_0000, 0, 0, 0]);
        assert_eq!(codec.decode_row(&bytes, &mut ()).expect("full row"), vec![1, 0, 1]);
    }

    #[test]
    fn test_four_bit_msb_first() {
        let codec = RowCodec::new(3, BitDepth::Four);
        let bytes = codec.encode_row(&[0xA, 0x3, 0xF]).expect("width");
        assert_eq!(bytes, vec![0xA3, 0xF0, 0, 0]);
        assert_eq!(codec.decode_row(&bytes, &mut ()).expect("full row"), vec![0xA, 0x3, 0xF]);
    }

    #[test]
    fn test_twenty_four_bit_little_endian() {
        let codec = RowCodec::new(2, BitDepth::TwentyFour);
        let bytes = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0, 0];
        let codes = codec.decode_row(&bytes, &mut ()).expect("full row");
        assert_eq!(codes, vec![0x03_02_01, 0x06_05_04]);
        assert_eq!(codec.encode_row(&codes).expect("width"), bytes.to_vec());
    }

    #[test]
    fn test_encode_masks_codes_to_depth() {
        let codec = RowCodec::new(2, BitDepth::One);
        assert_eq!(codec.encode_row(&[3, 2]).expect("width"), vec![0b1000_0000, 0, 0, 0]);
        let codec = RowCodec::new(1, BitDepth::Eight);
        assert_eq!(codec.encode_row(&[0x1FF]).expect("width"), vec![0xFF, 0, 0, 0]);
    }

    #[test]
    fn test_row_size_errors() {
        let codec = RowCodec::new(3, BitDepth::Eight);
        assert!(matches!(
            codec.decode_row(&[1, 2, 3], &mut ()),
            Err(Error::Truncated {
                needed: 4,
                available: 3
            })
        ));
        assert!(matches!(
            codec.encode_row(&[1, 2]),
            Err(Error::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert!(matches!(
            codec.encode_row(&[1, 2, 3, 4]),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_diagnostics_report_padding_and_tail_bits() {
        let codec = RowCodec::new(3, BitDepth::One);
        let mut report = DecodeReport::default();
        let codes = codec.decode_row(&[0b1011_0001, 0, 7, 9], &mut report).expect("full row");
        assert_eq!(codes, vec![1, 0, 1]);
        assert_eq!(report.nonzero_padding_bytes, 2);
        assert_eq!(report.rows_with_tail_bits, 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_decode_image_flips_bottom_up_rows() {
        let codec = RowCodec::new(1, BitDepth::Eight);
        let data = [10, 0, 0, 0, 20, 0, 0, 0, 30, 0, 0, 0];
        let decoded = codec.decode_image(&data, 3).expect("decode");
        assert_eq!(decoded.matrix, PixelMatrix::from_rows(&[[30u32], [20], [10]]));
        assert!(decoded.report.is_clean());
        assert_eq!(codec.encode_image(&decoded.matrix).expect("encode"), data.to_vec());

        let codec = codec.with_order(RowOrder::TopDown);
        let decoded = codec.decode_image(&data, 3).expect("decode");
        assert_eq!(decoded.matrix, PixelMatrix::from_rows(&[[10u32], [20], [30]]));
    }

    #[test]
    fn test_decode_image_rejects_short_data() {
        let codec = RowCodec::new(5, BitDepth::ThirtyTwo);
        let err = codec.decode_image(&[0; 39], 2).unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                needed: 40,
                available: 39
            }
        ));
    }

    #[test]
    fn test_encode_image_checks_width() {
        let codec = RowCodec::new(4, BitDepth::Eight);
        let matrix = PixelMatrix::new(2, 3, 0);
        assert!(matches!(
            codec.encode_image(&matrix),
            Err(Error::DimensionMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }
}
