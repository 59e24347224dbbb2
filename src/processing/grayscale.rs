//! Grayscale conversion of decoded rasters

use image::{GenericImageView, GrayImage, Luma, Pixel};
use rayon::prelude::*;
use tracing::debug;

/// Images with at least this many pixels are converted row-parallel
pub const PARALLEL_PIXEL_THRESHOLD: u64 = 1 << 20;

/// Rectangle covered by a raster, as reported by `GenericImageView::bounds`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    /// Bounds of any image view
    pub fn of<I: GenericImageView>(image: &I) -> Self {
        let (x, y, width, height) = image.bounds();
        Self { x, y, width, height }
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// 8-bit grayscale buffer placed at the origin of the view it came from
///
/// Pixel access is relative to the origin, as with `SubImage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayRaster {
    x: u32,
    y: u32,
    buffer: GrayImage,
}

impl GrayRaster {
    /// Origin offset of the source view
    pub fn origin(&self) -> (u32, u32) {
        (self.x, self.y)
    }

    pub fn buffer(&self) -> &GrayImage {
        &self.buffer
    }

    pub fn into_buffer(self) -> GrayImage {
        self.buffer
    }
}

impl GenericImageView for GrayRaster {
    type Pixel = Luma<u8>;

    fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    fn bounds(&self) -> (u32, u32, u32, u32) {
        let (width, height) = self.buffer.dimensions();
        (self.x, self.y, width, height)
    }

    fn get_pixel(&self, x: u32, y: u32) -> Luma<u8> {
        *self.buffer.get_pixel(x, y)
    }
}

/// Luminance of a single pixel
///
/// Alpha is ignored: a fully transparent pixel keeps the luminance of its
/// color channels.
#[inline]
pub fn to_gray<P>(pixel: P) -> Luma<u8>
where
    P: Pixel<Subpixel = u8>,
{
    pixel.to_luma()
}

/// Convert an image to 8-bit grayscale
///
/// Every pixel of the source is mapped through [`to_gray`] into a raster with
/// the same bounds, origin offset included. The source is not modified and
/// the result depends only on the source pixels.
pub fn grayscale<I>(image: &I) -> GrayRaster
where
    I: GenericImageView + Sync,
    I::Pixel: Pixel<Subpixel = u8>,
{
    let bounds = Bounds::of(image);
    let buffer = if bounds.pixel_count() >= PARALLEL_PIXEL_THRESHOLD {
        debug!("Converting {}x{} image row-parallel", bounds.width, bounds.height);
        grayscale_parallel(image)
    } else {
        grayscale_sequential(image)
    };

    GrayRaster {
        x: bounds.x,
        y: bounds.y,
        buffer,
    }
}

/// Single-threaded conversion into an origin-0 buffer
pub fn grayscale_sequential<I>(image: &I) -> GrayImage
where
    I: GenericImageView,
    I::Pixel: Pixel<Subpixel = u8>,
{
    let (width, height) = image.dimensions();
    let mut gray = GrayImage::new(width, height);

    for (x, y, pixel) in image.pixels() {
        gray.put_pixel(x, y, to_gray(pixel));
    }

    gray
}

/// Row-parallel conversion into an origin-0 buffer using the rayon thread pool
pub fn grayscale_parallel<I>(image: &I) -> GrayImage
where
    I: GenericImageView + Sync,
    I::Pixel: Pixel<Subpixel = u8>,
{
    let (width, height) = image.dimensions();
    let mut gray = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return gray;
    }

    gray.par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, sample) in row.iter_mut().enumerate() {
                *sample = to_gray(image.get_pixel(x as u32, y as u32))[0];
            }
        });

    gray
}
