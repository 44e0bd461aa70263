//! Contains all the possible formats a DXT texture can be compressed into.
//!
//! This module is to be used for specifying which format you want to encode
//! your texture in.
//!
//! Each format has its own use case. DXT1 is the smallest and works well for
//! opaque color maps viewed in motion; the DXT5 family spends another 8 bytes
//! per block on a separately compressed alpha channel, which the specialized
//! variants reuse to carry whichever channel needs the most precision.
//!
//! See [`crate::TextureEncoder`] for where these are used.

use crate::error::TextureEncodeError;
use bitflags::bitflags;

/// This enum specifies the block compression format an image is encoded into.
///
/// All formats compress 4x4 pixel tiles; formats with a separate alpha block
/// produce 16 bytes per tile, the others 8.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TextureFormat {
    /// Opaque color only. 8 bytes per tile: two RGB565 endpoints and sixteen
    /// 2-bit interpolation indices.
    #[default]
    Dxt1 = 0x00,
    /// Same block layout as [`TextureFormat::Dxt1`]; the hardware treats
    /// blocks whose stored endpoints satisfy `max <= min` as 3-color blocks
    /// with a transparent fourth entry (punch-through alpha). The encoder
    /// always emits ordered endpoints, so this tag only changes how the GPU
    /// is told to sample the data.
    Dxt1a = 0x01,
    /// Color block plus a separately compressed alpha block, 16 bytes per
    /// tile.
    Dxt3 = 0x02,
    /// Color block plus an interpolated-ramp alpha block, 16 bytes per tile.
    Dxt5 = 0x03,
    /// DXT5 with the green and alpha channels swapped before compression, so
    /// a normal map's X axis rides in the high-precision alpha block.
    Dxt5n = 0x04,
    /// DXT5 with an RGB to YCoCg transform applied first: luma is carried in
    /// the alpha block, the chroma planes in the color block.
    Dxt5YCoCg = 0x05,
}

bitflags! {
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub(crate) struct FormatFlags: u8 {
        const None = 0;
        /// An 8-byte alpha block precedes each color block.
        const AlphaBlock = 0x1;
        /// Sampled as BC1 with the 3-color transparent mode enabled.
        const PunchThrough = 0x2;
        /// Swap green and alpha before compressing.
        const NormalSwizzle = 0x4;
        /// Convert RGB to YCoCg before compressing.
        const YCoCg = 0x8;
    }
}

impl TextureFormat {
    pub(crate) fn flags(self) -> FormatFlags {
        match self {
            Self::Dxt1 => FormatFlags::None,
            Self::Dxt1a => FormatFlags::PunchThrough,
            Self::Dxt3 | Self::Dxt5 => FormatFlags::AlphaBlock,
            Self::Dxt5n => FormatFlags::AlphaBlock | FormatFlags::NormalSwizzle,
            Self::Dxt5YCoCg => FormatFlags::AlphaBlock | FormatFlags::YCoCg,
        }
    }

    /// Compressed size of one 4x4 tile in this format.
    pub fn bytes_per_block(self) -> usize {
        if self.has_alpha_block() {
            16
        } else {
            8
        }
    }

    /// Whether each tile carries a separate 8-byte alpha block in front of
    /// the color block.
    pub fn has_alpha_block(self) -> bool {
        self.flags().intersects(FormatFlags::AlphaBlock)
    }

    /// Total compressed size of an image of the given dimensions:
    /// `ceil(width/4) * ceil(height/4) * bytes_per_block`.
    pub fn compressed_len(self, width: u32, height: u32) -> usize {
        width.div_ceil(4) as usize * height.div_ceil(4) as usize * self.bytes_per_block()
    }
}

impl From<TextureFormat> for u8 {
    fn from(value: TextureFormat) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for TextureFormat {
    type Error = TextureEncodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Dxt1),
            0x01 => Ok(Self::Dxt1a),
            0x02 => Ok(Self::Dxt3),
            0x03 => Ok(Self::Dxt5),
            0x04 => Ok(Self::Dxt5n),
            0x05 => Ok(Self::Dxt5YCoCg),
            _ => Err(TextureEncodeError::Format),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_sizes_match_alpha_presence() {
        assert_eq!(TextureFormat::Dxt1.bytes_per_block(), 8);
        assert_eq!(TextureFormat::Dxt1a.bytes_per_block(), 8);
        assert_eq!(TextureFormat::Dxt3.bytes_per_block(), 16);
        assert_eq!(TextureFormat::Dxt5.bytes_per_block(), 16);
        assert_eq!(TextureFormat::Dxt5n.bytes_per_block(), 16);
        assert_eq!(TextureFormat::Dxt5YCoCg.bytes_per_block(), 16);
    }

    #[test]
    fn compressed_len_rounds_tiles_up() {
        assert_eq!(TextureFormat::Dxt1.compressed_len(4, 4), 8);
        assert_eq!(TextureFormat::Dxt1.compressed_len(5, 5), 32);
        assert_eq!(TextureFormat::Dxt5.compressed_len(1, 1), 16);
        assert_eq!(TextureFormat::Dxt1.compressed_len(0, 16), 0);
    }

    #[test]
    fn u8_roundtrip() {
        for raw in 0u8..6 {
            let format = TextureFormat::try_from(raw).unwrap();
            assert_eq!(u8::from(format), raw);
        }
        assert!(TextureFormat::try_from(0x0e).is_err());
    }
}
