//! Raster normalisation ahead of QR detection.
//!
//! Rendered pages differ wildly between backends: pdfium gives RGBA, poppler
//! and Ghostscript give RGB PNGs, ImageMagick may emit greyscale. Every page
//! goes through the same deterministic chain so the decoder sees comparable
//! input regardless of which strategy produced it:
//!
//! 1. greyscale
//! 2. contrast stretch to the full 0–255 range
//! 3. unsharp-mask sharpen
//! 4. force an alpha channel
//! 5. emit raw interleaved RGBA bytes

use crate::pipeline::render::RasterSource;
use image::{DynamicImage, GrayImage, ImageReader};
use std::io::Cursor;
use tracing::{debug, warn};

/// Fraction of darkest / brightest pixels ignored when picking the stretch
/// bounds, so a few specks of noise don't pin the range.
const STRETCH_CLIP: f64 = 0.01;

const SHARPEN_SIGMA: f32 = 1.0;
const SHARPEN_THRESHOLD: i32 = 0;

/// A normalised page: 4 bytes per pixel, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Normalise a raster for QR detection.
///
/// Returns `None` when the raster cannot be read or decoded; the caller
/// treats that as an unreadable page and moves on.
pub fn normalize(source: RasterSource) -> Option<NormalizedImage> {
    let image = match load(source) {
        Ok(img) => img,
        Err(e) => {
            warn!("Unreadable raster: {}", e);
            return None;
        }
    };
    if image.width() == 0 || image.height() == 0 {
        warn!("Skipping empty raster");
        return None;
    }
    Some(normalize_image(&image))
}

/// The deterministic part of [`normalize`] on an already-decoded image.
pub fn normalize_image(image: &DynamicImage) -> NormalizedImage {
    let grey = contrast_stretch(image.to_luma8());
    let sharpened = image::imageops::unsharpen(&grey, SHARPEN_SIGMA, SHARPEN_THRESHOLD);
    let rgba = DynamicImage::ImageLuma8(sharpened).to_rgba8();
    let (width, height) = rgba.dimensions();
    debug!("Normalised raster → {}x{} RGBA", width, height);

    NormalizedImage {
        pixels: rgba.into_raw(),
        width,
        height,
    }
}

fn load(source: RasterSource) -> Result<DynamicImage, String> {
    match source {
        RasterSource::Image(img) => Ok(img),
        RasterSource::File(path) => ImageReader::open(&path)
            .map_err(|e| format!("{}: {}", path.display(), e))?
            .with_guessed_format()
            .map_err(|e| format!("{}: {}", path.display(), e))?
            .decode()
            .map_err(|e| format!("{}: {}", path.display(), e)),
        RasterSource::Encoded(bytes) => ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| e.to_string())?
            .decode()
            .map_err(|e| e.to_string()),
    }
}

/// Linear stretch of luminance so the clipped minimum maps to 0 and the
/// clipped maximum to 255. Uniform images are returned unchanged.
fn contrast_stretch(mut grey: GrayImage) -> GrayImage {
    let (lo, hi) = stretch_bounds(&grey);
    if hi <= lo {
        return grey;
    }

    let range = (hi - lo) as u32;
    let mut lut = [0u8; 256];
    for (v, slot) in lut.iter_mut().enumerate() {
        let v = (v as u32).clamp(lo as u32, hi as u32);
        *slot = ((v - lo as u32) * 255 / range) as u8;
    }
    for p in grey.pixels_mut() {
        p.0[0] = lut[p.0[0] as usize];
    }
    grey
}

fn stretch_bounds(grey: &GrayImage) -> (u8, u8) {
    let mut histogram = [0u64; 256];
    for p in grey.pixels() {
        histogram[p.0[0] as usize] += 1;
    }
    let total: u64 = histogram.iter().sum();
    let clip = (total as f64 * STRETCH_CLIP) as u64;

    let mut seen = 0;
    let mut lo = 0u8;
    for (v, &count) in histogram.iter().enumerate() {
        seen += count;
        if seen > clip {
            lo = v as u8;
            break;
        }
    }

    seen = 0;
    let mut hi = 255u8;
    for (v, &count) in histogram.iter().enumerate().rev() {
        seen += count;
        if seen > clip {
            hi = v as u8;
            break;
        }
    }

    (lo, hi)
}
