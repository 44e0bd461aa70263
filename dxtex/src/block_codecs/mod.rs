//! Per-format block codecs and the shared tile-compression loop.

use crate::codec::{BlockCodecBase, BlockEncoder, BlockEncoderBase};
use crate::formats::{FormatFlags, TextureFormat};
use crate::iter::BlockIterator;
use dxtex_macros::dxt_codec_base;

mod dxt;
mod tables;

use dxt::Pixel;

pub use dxt::compress_block;

/// Swaps the green and alpha channels so the normal map's X axis is carried
/// in the separately compressed alpha block.
fn swizzle_normal(block: &mut [Pixel; 16]) {
    for px in block.iter_mut() {
        *px = Pixel::new(px.g(), px.r(), px.a(), px.b());
    }
}

/// RGB to YCoCg: luma goes to the alpha block, the chroma planes (halved and
/// biased into unsigned range) to the color block.
fn to_ycocg(block: &mut [Pixel; 16]) {
    for px in block.iter_mut() {
        let r = px.r() as i32;
        let g = px.g() as i32;
        let b = px.b() as i32;

        let co = r - b;
        let t = b + co / 2;
        let cg = g - t;
        let y = t + cg / 2;

        *px = Pixel::new(
            y.clamp(0, 255) as u8,
            (co / 2 + 128).clamp(0, 255) as u8,
            (cg / 2 + 128).clamp(0, 255) as u8,
            0,
        );
    }
}

fn encode_tiles(
    codec: &dyn BlockEncoderBase,
    pixels: &[u32],
    width: u32,
    height: u32,
    flags: FormatFlags,
    quality: u8,
) -> Vec<u8> {
    let mut dest = Vec::with_capacity(codec.output_len(width, height));
    let has_alpha = flags.intersects(FormatFlags::AlphaBlock);

    for raw in BlockIterator::new(pixels, width, height) {
        let mut block = [Pixel::default(); 16];
        for (px, &value) in block.iter_mut().zip(&raw) {
            *px = Pixel(value);
        }

        if flags.intersects(FormatFlags::NormalSwizzle) {
            swizzle_normal(&mut block);
        }
        if flags.intersects(FormatFlags::YCoCg) {
            to_ycocg(&mut block);
        }

        dxt::compress_block_pixels(&mut dest, &block, has_alpha, quality);
    }

    debug_assert_eq!(dest.len(), codec.output_len(width, height));
    dest
}

macro_rules! impl_block_encoder {
    ($codec:ident, $format:expr) => {
        impl BlockEncoder for $codec {
            fn encode(&self, pixels: &[u32], width: u32, height: u32) -> Vec<u8> {
                encode_tiles(self, pixels, width, height, $format.flags(), self.quality)
            }
        }
    };
}

#[dxt_codec_base(4, 4, 8)]
pub(crate) struct Dxt1Codec {
    pub quality: u8,
}
impl_block_encoder!(Dxt1Codec, TextureFormat::Dxt1);

#[dxt_codec_base(4, 4, 8)]
pub(crate) struct Dxt1aCodec {
    pub quality: u8,
}
impl_block_encoder!(Dxt1aCodec, TextureFormat::Dxt1a);

#[dxt_codec_base(4, 4, 16)]
pub(crate) struct Dxt3Codec {
    pub quality: u8,
}
impl_block_encoder!(Dxt3Codec, TextureFormat::Dxt3);

#[dxt_codec_base(4, 4, 16)]
pub(crate) struct Dxt5Codec {
    pub quality: u8,
}
impl_block_encoder!(Dxt5Codec, TextureFormat::Dxt5);

#[dxt_codec_base(4, 4, 16)]
pub(crate) struct Dxt5nCodec {
    pub quality: u8,
}
impl_block_encoder!(Dxt5nCodec, TextureFormat::Dxt5n);

#[dxt_codec_base(4, 4, 16)]
pub(crate) struct Dxt5YCoCgCodec {
    pub quality: u8,
}
impl_block_encoder!(Dxt5YCoCgCodec, TextureFormat::Dxt5YCoCg);

pub(crate) fn create_new_encoder(format: TextureFormat, quality: u8) -> Box<dyn BlockEncoder> {
    match format {
        TextureFormat::Dxt1 => Box::new(Dxt1Codec { quality }),
        TextureFormat::Dxt1a => Box::new(Dxt1aCodec { quality }),
        TextureFormat::Dxt3 => Box::new(Dxt3Codec { quality }),
        TextureFormat::Dxt5 => Box::new(Dxt5Codec { quality }),
        TextureFormat::Dxt5n => Box::new(Dxt5nCodec { quality }),
        TextureFormat::Dxt5YCoCg => Box::new(Dxt5YCoCgCodec { quality }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_swizzle_routes_green_through_alpha() {
        // constant green of 77, alpha varying: after the swizzle the alpha
        // block sees a flat 77 and stores it verbatim at both endpoints
        let mut pixels = [0u32; 16];
        for (i, px) in pixels.iter_mut().enumerate() {
            *px = ((i as u32 * 16) << 24) | (200 << 16) | (77 << 8) | 10;
        }
        let codec = Dxt5nCodec { quality: 0 };
        let data = codec.encode(&pixels, 4, 4);
        assert_eq!(data.len(), 16);
        assert_eq!(data[0], 77);
        assert_eq!(data[1], 77);
    }

    #[test]
    fn ycocg_carries_luma_in_the_alpha_block() {
        // neutral gray: co == cg == 0, y == the gray value
        let pixels = [0xff5a_5a5au32; 16];
        let codec = Dxt5YCoCgCodec { quality: 0 };
        let data = codec.encode(&pixels, 4, 4);
        assert_eq!(data.len(), 16);
        assert_eq!(data[0], 0x5a);
        assert_eq!(data[1], 0x5a);
    }

    #[test]
    fn output_len_counts_partial_tiles() {
        let codec = Dxt1Codec { quality: 0 };
        assert_eq!(codec.output_len(4, 4), 8);
        assert_eq!(codec.output_len(5, 5), 32);
        assert_eq!(codec.output_len(1, 1), 8);
        let codec = Dxt5Codec { quality: 0 };
        assert_eq!(codec.output_len(6, 3), 32);
    }

    #[test]
    fn factory_dispatches_block_sizes() {
        for (format, bytes) in [
            (TextureFormat::Dxt1, 8),
            (TextureFormat::Dxt1a, 8),
            (TextureFormat::Dxt3, 16),
            (TextureFormat::Dxt5, 16),
            (TextureFormat::Dxt5n, 16),
            (TextureFormat::Dxt5YCoCg, 16),
        ] {
            let encoder = create_new_encoder(format, 0);
            assert_eq!(encoder.get_block_bytes(), bytes, "{format:?}");
            assert_eq!(encoder.get_block_size(), (4, 4));
        }
    }
}
