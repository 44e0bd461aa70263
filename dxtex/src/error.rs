use image::ImageError;
use std::error::Error;
use std::fmt;

/// Errors that can occur while preparing an image for block compression.
///
/// The block codec itself cannot fail; these only arise at the image and file
/// boundary.
#[derive(Debug)]
pub enum TextureEncodeError {
    /// Reading or decoding the source image failed.
    Encode(ImageError),
    /// An unknown format byte was passed to
    /// [`TextureFormat::try_from`](crate::formats::TextureFormat).
    Format,
}

impl Error for TextureEncodeError {}

impl fmt::Display for TextureEncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode(err) => write!(f, "{err}"),
            Self::Format => write!(f, "Unknown texture format value supplied."),
        }
    }
}

impl From<ImageError> for TextureEncodeError {
    fn from(value: ImageError) -> Self {
        Self::Encode(value)
    }
}

impl From<std::io::Error> for TextureEncodeError {
    fn from(value: std::io::Error) -> Self {
        Self::Encode(ImageError::IoError(value))
    }
}
