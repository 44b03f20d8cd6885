//! PDF → raster strategies.
//!
//! Each strategy is a [`Renderer`]: given an [`ExtractionRequest`] it hands
//! pages, in page order, to a visitor supplied by the orchestrator. The
//! visitor returns [`ControlFlow::Break`] as soon as a page yields a QR
//! payload, and the strategy stops there; in-process backends never render
//! the remaining pages.
//!
//! | Strategy | Backend | Notes |
//! |----------|---------|-------|
//! | [`PdfiumRenderer`]  | pdfium (library)         | native password, lazy per-page rendering |
//! | [`PopplerRenderer`] | `pdftoppm`               | density + target size |
//! | [`SystemRenderer`]  | `gs`, then `magick`      | nested fallback inside one strategy |
//! | [`DecryptRenderer`] | `pdftk` / `qpdf` + S2    | decrypt to a copy, re-render without password |
//!
//! A backend that is missing and a backend that ran and failed are reported
//! as different [`RenderError`] variants; the orchestrator treats both as
//! "no result".

mod decrypt;
mod pdfium;
mod poppler;
mod system;
mod tools;

pub use decrypt::DecryptRenderer;
pub use pdfium::PdfiumRenderer;
pub use poppler::PopplerRenderer;
pub use system::SystemRenderer;

use crate::config::{ExtractionConfig, StrategyKind};
use crate::error::{PageError, RenderError};
use crate::pipeline::artifacts::ArtifactDir;
use crate::pipeline::input::ExtractionRequest;
use image::DynamicImage;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;

/// Where a page's pixels live.
#[derive(Debug, Clone)]
pub enum RasterSource {
    /// Already decoded in memory (in-process backends).
    Image(DynamicImage),
    /// An image file written by an external tool.
    File(PathBuf),
    /// Encoded image bytes (PNG, JPEG).
    Encoded(Vec<u8>),
}

/// One rendered page.
#[derive(Debug, Clone)]
pub struct RasterPage {
    /// 0-based page index.
    pub index: usize,
    pub source: RasterSource,
}

impl RasterPage {
    pub fn new(index: usize, source: RasterSource) -> Self {
        Self { index, source }
    }

    /// 1-based page number, for logs.
    pub fn page_num(&self) -> usize {
        self.index + 1
    }
}

/// Receives pages in order; `Break` stops the strategy.
pub type PageVisitor<'a> = dyn FnMut(Result<RasterPage, PageError>) -> ControlFlow<()> + 'a;

/// What a strategy did before it returned normally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Pages handed to the visitor (including unreadable ones).
    pub pages_visited: usize,
    /// True when the visitor asked to stop.
    pub stopped_early: bool,
}

/// A PDF → raster strategy.
pub trait Renderer: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Render `request` and feed pages to `on_page` in page order.
    ///
    /// Implementations must stop as soon as `on_page` returns `Break`, and
    /// must report backend problems as `Err` rather than panicking.
    fn render(
        &self,
        request: &ExtractionRequest,
        artifacts: &ArtifactDir,
        on_page: &mut PageVisitor<'_>,
    ) -> Result<RenderStats, RenderError>;
}

/// Instantiate the configured strategies in order.
pub fn renderers_from_config(config: &ExtractionConfig) -> Vec<Arc<dyn Renderer>> {
    config
        .strategies
        .iter()
        .map(|kind| -> Arc<dyn Renderer> {
            match kind {
                StrategyKind::Pdfium => Arc::new(PdfiumRenderer::from_config(config)),
                StrategyKind::Poppler => Arc::new(PopplerRenderer::from_config(config)),
                StrategyKind::System => Arc::new(SystemRenderer::from_config(config)),
                StrategyKind::Decrypt => Arc::new(DecryptRenderer::from_config(config)),
            }
        })
        .collect()
}

/// Feed already-written page files to the visitor.
pub(crate) fn visit_files(files: Vec<PathBuf>, on_page: &mut PageVisitor<'_>) -> RenderStats {
    let mut stats = RenderStats::default();
    for (index, path) in files.into_iter().enumerate() {
        stats.pages_visited += 1;
        let page = RasterPage::new(index, RasterSource::File(path));
        if on_page(Ok(page)).is_break() {
            stats.stopped_early = true;
            break;
        }
    }
    stats
}
