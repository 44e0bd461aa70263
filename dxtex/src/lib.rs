//! dxtex is a Rust library for compressing images into the DXT (S3TC) family
//! of block texture formats, producing the raw block stream GPUs sample
//! directly.
//!
//! Every format compresses 4x4 pixel tiles independently: DXT1 stores two
//! RGB565 endpoints and sixteen 2-bit interpolation indices in 8 bytes, the
//! DXT5 family prepends an 8-byte interpolated alpha block. On top of the
//! plain formats there are two specialized DXT5 variants: a normal-map
//! swizzle that carries green in the alpha block, and a YCoCg transform that
//! carries luma there.
//!
//! # Examples
//!
//! Encoding an image file into a DXT5 block stream:
//!
//! ```no_run
//! use dxtex::error::TextureEncodeError;
//! use dxtex::formats::TextureFormat;
//! use dxtex::TextureEncoder;
//!
//! # fn main() -> Result<(), TextureEncodeError> {
//! # let img_path: &str = "";
//! let encoder = TextureEncoder::new(TextureFormat::Dxt5).with_dithering();
//! let encoded = encoder.encode(img_path)?;
//! # let _ = encoded;
//! # Ok(())
//! # }
//! ```
//!
//! Compressing pixels already in memory:
//!
//! ```
//! use dxtex::formats::TextureFormat;
//! use dxtex::TextureEncoder;
//!
//! // 16x16 opaque orange, packed ARGB
//! let pixels = vec![0xffff_8000u32; 16 * 16];
//!
//! let encoder = TextureEncoder::new(TextureFormat::Dxt1);
//! let encoded = encoder.encode_argb(&pixels, 16, 16);
//! assert_eq!(encoded.len(), 128); // 16 tiles, 8 bytes each
//! ```
//!
//! # Hints
//!
//! Easiest place to start off is [`TextureEncoder`]. If you only need single
//! tiles (e.g. you are writing your own tiling or a streaming pipeline), use
//! [`compress_block`] directly.

#![warn(missing_docs)]

use crate::block_codecs::create_new_encoder;
use crate::codec::BlockEncoder;
use crate::error::TextureEncodeError;
use crate::formats::TextureFormat;
use image::{ImageReader, RgbaImage};
use log::debug;

mod block_codecs;
mod codec;
pub mod error;
pub mod formats;
mod iter;

pub use block_codecs::compress_block;

/// Quality bit that enables Floyd-Steinberg dithering, both in the color
/// index assignment and as a preconditioning pass before endpoint selection.
pub const DITHER: u8 = 0x80;

/// Provides all the functionality needed to compress images into DXT block
/// streams.
///
/// The encoder doesn't inherently provide a method to save the data into a
/// file, you will be given a [`Vec`] of bytes from [`Self::encode()`], which
/// you can use and save all the bytes to a file yourself.
///
/// The output is the bare block stream, tiles in row-major order, with no
/// container header. Its length is always
/// [`TextureFormat::compressed_len`] of the image dimensions.
///
/// For examples, see the documentation on the root of the [`crate`]
pub struct TextureEncoder {
    format: TextureFormat,
    quality: u8,
}

impl Default for TextureEncoder {
    fn default() -> Self {
        Self::new(TextureFormat::default())
    }
}

impl TextureEncoder {
    /// Creates a new encoder for the given block format, at the default
    /// quality level of 2 (maximum refinement, no dithering).
    pub fn new(format: TextureFormat) -> Self {
        Self { format, quality: 2 }
    }

    /// Sets the quality level. The low 7 bits select endpoint refinement:
    /// 0 skips it entirely, anything higher runs the full three-pass search.
    /// The [`DITHER`] bit may be or-ed in directly.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Enables Floyd-Steinberg dithering on top of the current quality level.
    ///
    /// Dithering trades per-pixel accuracy for smoother large-scale
    /// gradients, which usually looks better on photographic content and
    /// worse on normal maps.
    pub fn with_dithering(mut self) -> Self {
        self.quality |= DITHER;
        self
    }

    /// The block format this encoder compresses into.
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Encodes the image file given in `img_path` into a DXT block stream.
    ///
    /// This method returns an in-memory representation of the compressed data
    /// as a [`Vec`] of bytes.
    ///
    /// # Errors
    ///
    /// If the file can't be read or decoded as an image, a
    /// [`TextureEncodeError`] is returned instead.
    pub fn encode(&self, img_path: &str) -> Result<Vec<u8>, TextureEncodeError> {
        let img = ImageReader::open(img_path)?.decode()?;
        Ok(self.encode_image(&img.into_rgba8()))
    }

    /// Encodes an already decoded image into a DXT block stream.
    pub fn encode_image(&self, image: &RgbaImage) -> Vec<u8> {
        let pixels: Vec<u32> = image
            .pixels()
            .map(|px| u32::from_be_bytes([px[3], px[0], px[1], px[2]]))
            .collect();
        self.encode_argb(&pixels, image.width(), image.height())
    }

    /// Encodes a packed ARGB buffer (row-major, alpha in the top byte of each
    /// value) into a DXT block stream.
    ///
    /// `pixels` must hold at least `width * height` values.
    pub fn encode_argb(&self, pixels: &[u32], width: u32, height: u32) -> Vec<u8> {
        debug_assert!(pixels.len() >= width as usize * height as usize);
        debug!(
            "compressing {}x{} image as {:?} ({} bytes)",
            width,
            height,
            self.format,
            self.format.compressed_len(width, height)
        );

        let encoder = create_new_encoder(self.format, self.quality);
        encoder.encode(pixels, width, height)
    }
}
