//! Decode/encode capability used by the file processor

use std::io::Write;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, DynamicImage, GrayImage, ImageEncoder, ImageError};

use crate::config::ImageFormat;

/// A decoded raster together with the format its bytes were recognized as
pub struct Decoded {
    pub image: DynamicImage,
    pub format: image::ImageFormat,
}

/// Codec capability: bytes to raster and raster back to bytes
///
/// Implementations must be shareable across worker threads.
pub trait Codec: Send + Sync {
    /// Decode an in-memory file into a raster and its format tag
    fn decode(&self, bytes: &[u8]) -> Result<Decoded, ImageError>;

    /// Encode a grayscale raster in `format` into `writer`
    fn encode(
        &self,
        image: &GrayImage,
        format: ImageFormat,
        writer: &mut dyn Write,
    ) -> Result<(), ImageError>;
}

/// Codec backed by the `image` crate
///
/// Decoding sniffs the content, so any format compiled into `image` is
/// readable. Encoding covers PNG and JPEG at the encoder's default quality.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCodec;

impl ImageCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for ImageCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Decoded, ImageError> {
        let format = image::guess_format(bytes)?;
        let image = image::load_from_memory_with_format(bytes, format)?;
        Ok(Decoded { image, format })
    }

    fn encode(
        &self,
        image: &GrayImage,
        format: ImageFormat,
        writer: &mut dyn Write,
    ) -> Result<(), ImageError> {
        let (width, height) = image.dimensions();
        match format {
            ImageFormat::Png => {
                PngEncoder::new(writer).write_image(image.as_raw(), width, height, ColorType::L8)
            }
            ImageFormat::Jpeg => {
                JpegEncoder::new(writer).write_image(image.as_raw(), width, height, ColorType::L8)
            }
        }
    }
}
