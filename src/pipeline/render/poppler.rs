//! S2: poppler's `pdftoppm`.
//!
//! Renders every page to PNG at a fixed density and target size, then hands
//! the files to the visitor in page order.

use super::{tools, visit_files, PageVisitor, RenderStats, Renderer};
use crate::config::{ExtractionConfig, StrategyKind};
use crate::error::RenderError;
use crate::pipeline::artifacts::ArtifactDir;
use crate::pipeline::input::ExtractionRequest;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::info;

const BACKEND: &str = "pdftoppm";
const ENV_VAR: &str = "AADHAAR_QR_PDFTOPPM_PATH";

pub(crate) const DEFAULT_PREFIX: &str = "poppler-page";

/// S2 renderer.
#[derive(Debug, Clone)]
pub struct PopplerRenderer {
    density: u32,
    size: (u32, u32),
    binary: Option<PathBuf>,
    prefix: &'static str,
}

impl PopplerRenderer {
    pub fn new(density: u32, size: (u32, u32)) -> Self {
        Self {
            density,
            size,
            binary: None,
            prefix: DEFAULT_PREFIX,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            density: config.poppler_density,
            size: config.poppler_size,
            binary: config.tools.pdftoppm.clone(),
            prefix: DEFAULT_PREFIX,
        }
    }

    /// Use a different output file prefix, so that nested use (S4) never
    /// picks up pages left by another strategy.
    pub(crate) fn with_prefix(mut self, prefix: &'static str) -> Self {
        self.prefix = prefix;
        self
    }

    fn command_args(&self, request: &ExtractionRequest, out_root: &Path) -> Vec<OsString> {
        let (width, height) = self.size;
        let mut args = tools::args([
            "-png".to_string(),
            "-r".to_string(),
            self.density.to_string(),
            "-scale-to-x".to_string(),
            width.to_string(),
            "-scale-to-y".to_string(),
            height.to_string(),
        ]);
        if let Some(password) = request.password_opt() {
            args.extend(tools::args(["-upw", password]));
        }
        args.push(request.pdf_path().into());
        args.push(out_root.into());
        args
    }
}

impl Renderer for PopplerRenderer {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Poppler
    }

    fn render(
        &self,
        request: &ExtractionRequest,
        artifacts: &ArtifactDir,
        on_page: &mut PageVisitor<'_>,
    ) -> Result<RenderStats, RenderError> {
        let program = tools::locate(BACKEND, self.binary.as_deref(), ENV_VAR, &["pdftoppm"])?;
        let out_root = artifacts.file(self.prefix);

        tools::run(
            BACKEND,
            &program,
            &self.command_args(request, &out_root),
            request.password(),
        )?;

        let files = artifacts.page_files(self.prefix, "png");
        info!("pdftoppm wrote {} page(s)", files.len());
        Ok(visit_files(files, on_page))
    }
}
