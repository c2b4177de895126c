//! Photo decoding into paintable RGB rasters.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

use super::ReportError;

/// Raster bound for embedded photos, twice the 515x196 photo box.
pub const MAX_RASTER_WIDTH: u32 = 1030;
pub const MAX_RASTER_HEIGHT: u32 = 392;

/// A fully decoded 8-bit RGB image ready to be placed on a page.
///
/// `width`/`height` are the source pixel size and drive placement; `pixels`
/// may be a downscaled copy.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: RgbImage,
}

impl DecodedImage {
    pub fn from_rgb(pixels: RgbImage) -> Self {
        Self {
            width: pixels.width(),
            height: pixels.height(),
            pixels,
        }
    }
}

/// Turns uploaded bytes into a placeable image.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, ReportError>;
}

/// Decoder backed by the `image` crate (PNG and JPEG).
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterDecoder;

impl ImageDecoder for RasterDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, ReportError> {
        let decoded =
            image::load_from_memory(bytes).map_err(|e| ReportError::ImageDecode(e.to_string()))?;
        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            return Err(ReportError::ImageDecode(format!(
                "image has no pixels ({}x{})",
                width, height
            )));
        }

        let decoded = if width > MAX_RASTER_WIDTH || height > MAX_RASTER_HEIGHT {
            decoded.resize(MAX_RASTER_WIDTH, MAX_RASTER_HEIGHT, FilterType::Triangle)
        } else {
            decoded
        };
        Ok(DecodedImage {
            width,
            height,
            pixels: flatten_to_rgb(decoded),
        })
    }
}

/// Normalize any pixel layout (grey, palette expanded by the decoder, 16-bit,
/// alpha) to 8-bit RGB. Transparent pixels are composited over white.
pub fn flatten_to_rgb(decoded: DynamicImage) -> RgbImage {
    if !decoded.color().has_alpha() {
        return decoded.into_rgb8();
    }

    let rgba = decoded.into_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        rgb.put_pixel(x, y, Rgb([over_white(r, a), over_white(g, a), over_white(b, a)]));
    }
    rgb
}

fn over_white(channel: u8, alpha: u8) -> u8 {
    let alpha = alpha as u32;
    ((channel as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8
}
