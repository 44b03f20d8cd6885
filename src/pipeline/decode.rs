//! QR detection on a normalised page.

use tracing::debug;

/// Scans an RGBA pixel buffer for a QR symbol.
///
/// Implementations return `None` for "no symbol", never an error. When a page
/// carries several symbols only the first decodable one is reported.
pub trait QrDecoder: Send + Sync {
    fn decode(&self, pixels: &[u8], width: u32, height: u32) -> Option<String>;
}

/// Pure-Rust decoder backed by `rqrr`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RqrrDecoder;

impl QrDecoder for RqrrDecoder {
    fn decode(&self, pixels: &[u8], width: u32, height: u32) -> Option<String> {
        let (w, h) = (width as usize, height as usize);
        if w == 0 || h == 0 || pixels.len() < w * h * 4 {
            return None;
        }

        // The buffer is already greyscale; the red channel is the luminance.
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(w, h, |x, y| pixels[(y * w + x) * 4]);
        let grids = prepared.detect_grids();
        debug!("rqrr found {} candidate grid(s)", grids.len());

        grids
            .iter()
            .find_map(|g| g.decode().ok())
            .map(|(_, content)| content)
            .filter(|content| !content.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_page_has_no_symbol() {
        let pixels = vec![255u8; 64 * 64 * 4];
        assert_eq!(RqrrDecoder.decode(&pixels, 64, 64), None);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let pixels = vec![0u8; 10];
        assert_eq!(RqrrDecoder.decode(&pixels, 64, 64), None);
        assert_eq!(RqrrDecoder.decode(&[], 0, 0), None);
    }

    #[test]
    fn decoder_is_object_safe() {
        let boxed: Box<dyn QrDecoder> = Box::new(RqrrDecoder);
        assert_eq!(boxed.decode(&[255; 16], 2, 2), None);
    }
}
