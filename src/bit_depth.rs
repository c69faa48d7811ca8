//! Pixel bit depths and the row/channel layouts derived from them.
//!
//! # Row Layout
//!
//! On disk every row is packed and then padded to a 4-byte boundary:
//!
//! ```text
//! | packed_byte_width data bytes | padding (0..=3 zero bytes) |
//! ```
//!
//! For depths below 8 several pixels share a byte, so `packed_byte_width` is
//! `ceil(width * bits / 8)`.

use crate::error::{Error, Result};

/// A raw, un-normalized pixel code at its stored bit depth.
///
/// For 24-bit truecolor the code packs three 8-bit channels in one integer.
pub type PixelCode = u32;

/// Supported bits per pixel.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BitDepth {
    One,
    Four,
    Eight,
    TwentyFour,
    ThirtyTwo,
}

impl BitDepth {
    pub const ALL: [BitDepth; 5] = [
        BitDepth::One,
        BitDepth::Four,
        BitDepth::Eight,
        BitDepth::TwentyFour,
        BitDepth::ThirtyTwo,
    ];

    /// Returns the number of bits per pixel.
    pub fn bits(self) -> u32 {
        match self {
            BitDepth::One => 1,
            BitDepth::Four => 4,
            BitDepth::Eight => 8,
            BitDepth::TwentyFour => 24,
            BitDepth::ThirtyTwo => 32,
        }
    }

    /// Returns true if several pixels share one storage byte.
    pub fn is_sub_byte(self) -> bool {
        self.bits() < 8
    }

    /// Pixels stored in one storage unit: `8 / bits` below 8 bpp, otherwise 1.
    pub fn pixels_per_unit(self) -> usize {
        if self.is_sub_byte() {
            (8 / self.bits()) as usize
        } else {
            1
        }
    }

    /// Bytes in one storage unit: 1 below 8 bpp, otherwise `bits / 8`.
    pub fn bytes_per_unit(self) -> usize {
        if self.is_sub_byte() {
            1
        } else {
            (self.bits() / 8) as usize
        }
    }

    /// Mask covering every valid bit of a pixel code.
    pub fn code_mask(self) -> PixelCode {
        match self.bits() {
            32 => PixelCode::MAX,
            bits => (1 << bits) - 1,
        }
    }

    /// Channel fields a pixel code is split into for interpolation.
    ///
    /// Depths up to 8 bits are a single channel, so an 8 bpp code is
    /// interpolated as one value rather than as four 2-bit fields.
    pub fn channels(self) -> ChannelLayout {
        match self {
            BitDepth::One | BitDepth::Four | BitDepth::Eight => ChannelLayout {
                count: 1,
                bits_per_channel: self.bits(),
            },
            BitDepth::TwentyFour => ChannelLayout {
                count: 3,
                bits_per_channel: 8,
            },
            BitDepth::ThirtyTwo => ChannelLayout {
                count: 4,
                bits_per_channel: 8,
            },
        }
    }

    /// Computes the on-disk layout of one row of `width` pixels.
    pub fn row_layout(self, width: usize) -> RowLayout {
        let bits = width * self.bits() as usize;
        let packed_byte_width = bits.div_ceil(8);
        let padding_bytes = (4 - packed_byte_width % 4) % 4;
        RowLayout {
            width,
            packed_byte_width,
            padding_bytes,
        }
    }
}

impl TryFrom<u16> for BitDepth {
    type Error = Error;

    fn try_from(bits: u16) -> Result<Self> {
        match bits {
            1 => Ok(BitDepth::One),
            4 => Ok(BitDepth::Four),
            8 => Ok(BitDepth::Eight),
            24 => Ok(BitDepth::TwentyFour),
            32 => Ok(BitDepth::ThirtyTwo),
            other => Err(Error::UnsupportedBitDepth(other)),
        }
    }
}

/// Byte geometry of one stored row.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RowLayout {
    pub width: usize,
    /// Bytes holding pixel data, rounded up to a whole byte.
    pub packed_byte_width: usize,
    /// Zero bytes appended so the row length is a multiple of 4.
    pub padding_bytes: usize,
}

impl RowLayout {
    /// Total bytes per stored row, always a multiple of 4.
    pub fn stride(&self) -> usize {
        self.packed_byte_width + self.padding_bytes
    }
}

/// Equal-width bit fields making up one pixel code.
///
/// Channel `i` occupies bits `[i * bits_per_channel, (i + 1) * bits_per_channel)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChannelLayout {
    pub count: usize,
    pub bits_per_channel: u32,
}

impl ChannelLayout {
    /// Largest value a single channel can hold.
    pub fn channel_max(&self) -> PixelCode {
        (1 << self.bits_per_channel) - 1
    }

    pub fn shift(&self, channel: usize) -> u32 {
        channel as u32 * self.bits_per_channel
    }

    /// Extracts channel `channel` from `code`.
    #[inline]
    pub fn extract(&self, code: PixelCode, channel: usize) -> PixelCode {
        (code >> self.shift(channel)) & self.channel_max()
    }

    /// Packs per-channel values back into one code. Values are masked to the channel width.
    #[inline]
    pub fn pack(&self, values: &[PixelCode]) -> PixelCode {
        values
            .iter()
            .take(self.count)
            .enumerate()
            .fold(0, |code, (channel, &value)| {
                code | ((value & self.channel_max()) << self.shift(channel))
            })
    }
}
