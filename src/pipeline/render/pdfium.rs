//! S1: in-process rasterisation via pdfium.
//!
//! Tried first: pdfium opens encrypted documents natively and renders one
//! page at a time, so when the QR sits on page 1 (the usual e-Aadhaar
//! layout) no other page is ever rasterised.
//!
//! pdfium is loaded dynamically. When no library can be bound the strategy
//! reports `BackendUnavailable` instead of panicking the way
//! `Pdfium::default()` would.

use super::{PageVisitor, RasterPage, RasterSource, RenderStats, Renderer};
use crate::config::{ExtractionConfig, StrategyKind};
use crate::error::{PageError, RenderError};
use crate::pipeline::artifacts::ArtifactDir;
use crate::pipeline::input::ExtractionRequest;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const BACKEND: &str = "pdfium";

/// pdfium points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// S1 renderer.
#[derive(Debug, Clone)]
pub struct PdfiumRenderer {
    dpi: u32,
    library_path: Option<PathBuf>,
}

impl PdfiumRenderer {
    pub fn new(dpi: u32) -> Self {
        Self {
            dpi,
            library_path: None,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            dpi: config.pdfium_dpi,
            library_path: config.pdfium_library_path.clone(),
        }
    }

    /// Bind to the configured library, `PDFIUM_LIB_PATH`, the working
    /// directory, then the system library, in that order.
    fn bind(&self) -> Result<Pdfium, RenderError> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(ref path) = self.library_path {
            candidates.push(path.clone());
        }
        if let Some(path) = std::env::var_os("PDFIUM_LIB_PATH").filter(|v| !v.is_empty()) {
            candidates.push(PathBuf::from(path));
        }
        candidates.push(PathBuf::from("./"));

        let mut last_error = String::from("no candidate paths");
        for candidate in &candidates {
            match Pdfium::bind_to_library(library_file(candidate)) {
                Ok(bindings) => {
                    debug!("Bound pdfium from {}", candidate.display());
                    return Ok(Pdfium::new(bindings));
                }
                Err(e) => last_error = format!("{}: {:?}", candidate.display(), e),
            }
        }

        Pdfium::bind_to_system_library()
            .map(Pdfium::new)
            .map_err(|e| {
                RenderError::unavailable(
                    BACKEND,
                    format!("{last_error}; system library: {e:?}"),
                )
            })
    }
}

/// Accept either the library file itself or the directory containing it.
fn library_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(path)
    } else {
        path.to_path_buf()
    }
}

impl Renderer for PdfiumRenderer {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Pdfium
    }

    fn render(
        &self,
        request: &ExtractionRequest,
        _artifacts: &ArtifactDir,
        on_page: &mut PageVisitor<'_>,
    ) -> Result<RenderStats, RenderError> {
        let pdfium = self.bind()?;

        let document = pdfium
            .load_pdf_from_file(request.pdf_path(), request.password_opt())
            .map_err(|e| RenderError::failed(BACKEND, format!("{:?}", e)))?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(self.dpi as f32 / POINTS_PER_INCH)
            .render_form_data(true)
            .render_annotations(true);

        let mut stats = RenderStats::default();
        for idx in 0..total_pages {
            let item = match pages.get(idx as u16) {
                Ok(page) => match page.render_with_config(&render_config) {
                    Ok(bitmap) => {
                        let image = bitmap.as_image();
                        debug!(
                            "Rendered page {} → {}x{} px",
                            idx + 1,
                            image.width(),
                            image.height()
                        );
                        Ok(RasterPage::new(idx, RasterSource::Image(image)))
                    }
                    Err(e) => Err(PageError::RenderFailed {
                        page: idx + 1,
                        detail: format!("{:?}", e),
                    }),
                },
                Err(e) => Err(PageError::Unreadable {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                }),
            };

            stats.pages_visited += 1;
            if on_page(item).is_break() {
                stats.stopped_early = true;
                break;
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_file_resolves_directories() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = library_file(dir.path());
        assert_eq!(resolved.parent(), Some(dir.path()));
        assert!(resolved
            .file_name()
            .unwrap()
            .to_string_lossy()
            .contains("pdfium"));

        let file = Path::new("/opt/pdfium/lib/libpdfium.so");
        assert_eq!(library_file(file), file);
    }

    #[test]
    fn from_config_copies_settings() {
        let config = ExtractionConfig::builder()
            .pdfium_dpi(150)
            .pdfium_library_path("/opt/pdfium/lib")
            .build()
            .unwrap();
        let r = PdfiumRenderer::from_config(&config);
        assert_eq!(r.dpi, 150);
        assert_eq!(r.library_path.as_deref(), Some(Path::new("/opt/pdfium/lib")));
        assert_eq!(r.kind(), StrategyKind::Pdfium);
    }
}
