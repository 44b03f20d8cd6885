//! Configuration types for QR extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Rendering knobs, tool locations, the
//! strategy order and the artifact directory all live here so a single value
//! describes one extraction request end to end.

use crate::error::AadhaarQrError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Configuration for one QR extraction.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use aadhaar_qr::{ExtractionConfig, StrategyKind};
///
/// let config = ExtractionConfig::builder()
///     .strategies(vec![StrategyKind::Pdfium, StrategyKind::System])
///     .pdfium_dpi(200)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Strategies to try, in priority order. Default: all four, S1 → S4.
    pub strategies: Vec<StrategyKind>,

    /// DPI used by the pdfium strategy. Range: 72–600. Default: 300.
    ///
    /// The QR block on an e-Aadhaar page is roughly 3 cm wide; at 300 DPI
    /// each module is several pixels, which the detector needs.
    pub pdfium_dpi: u32,

    /// Explicit pdfium library file or directory. Falls back to
    /// `PDFIUM_LIB_PATH`, the working directory, then the system library.
    pub pdfium_library_path: Option<PathBuf>,

    /// `pdftoppm -r` density for the poppler strategy. Range: 72–600. Default: 200.
    pub poppler_density: u32,

    /// `pdftoppm -scale-to-x/-scale-to-y` output size. Each side at least 100 px.
    /// Default: 1654×2339 (A4 @ 200 DPI).
    pub poppler_size: (u32, u32),

    /// DPI passed to Ghostscript / ImageMagick. Range: 72–600. Default: 300.
    pub rasterizer_dpi: u32,

    /// Explicit locations of external tools. Unset entries are looked up
    /// in the environment and on `PATH`.
    pub tools: ToolPaths,

    /// Directory for transient rasters. Default: a fresh temp directory per
    /// request, removed afterwards.
    ///
    /// When set, each request creates its own `aadhaar-qr-*` subdirectory
    /// inside it (creating `work_dir` if missing) and removes that
    /// subdirectory afterwards. Other files in `work_dir` are never read or
    /// touched.
    pub work_dir: Option<PathBuf>,

    /// Optional per-strategy progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            strategies: StrategyKind::DEFAULT_ORDER.to_vec(),
            pdfium_dpi: 300,
            pdfium_library_path: None,
            poppler_density: 200,
            poppler_size: (1654, 2339),
            rasterizer_dpi: 300,
            tools: ToolPaths::default(),
            work_dir: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("strategies", &self.strategies)
            .field("pdfium_dpi", &self.pdfium_dpi)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("poppler_density", &self.poppler_density)
            .field("poppler_size", &self.poppler_size)
            .field("rasterizer_dpi", &self.rasterizer_dpi)
            .field("tools", &self.tools)
            .field("work_dir", &self.work_dir)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn strategies(mut self, strategies: Vec<StrategyKind>) -> Self {
        self.config.strategies = strategies;
        self
    }

    pub fn pdfium_dpi(mut self, dpi: u32) -> Self {
        self.config.pdfium_dpi = dpi;
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn poppler_density(mut self, density: u32) -> Self {
        self.config.poppler_density = density;
        self
    }

    pub fn poppler_size(mut self, width: u32, height: u32) -> Self {
        self.config.poppler_size = (width, height);
        self
    }

    pub fn rasterizer_dpi(mut self, dpi: u32) -> Self {
        self.config.rasterizer_dpi = dpi;
        self
    }

    pub fn tools(mut self, tools: ToolPaths) -> Self {
        self.config.tools = tools;
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, AadhaarQrError> {
        let c = &self.config;
        for (name, dpi) in [
            ("pdfium", c.pdfium_dpi),
            ("poppler", c.poppler_density),
            ("rasterizer", c.rasterizer_dpi),
        ] {
            if !(72..=600).contains(&dpi) {
                return Err(AadhaarQrError::InvalidConfig(format!(
                    "{name} DPI must be 72–600, got {dpi}"
                )));
            }
        }
        let (width, height) = c.poppler_size;
        if width < 100 || height < 100 {
            return Err(AadhaarQrError::InvalidConfig(format!(
                "poppler size must be at least 100×100 px, got {width}×{height}"
            )));
        }
        if c.strategies.is_empty() {
            return Err(AadhaarQrError::InvalidConfig(
                "At least one strategy is required".into(),
            ));
        }
        for (i, s) in c.strategies.iter().enumerate() {
            if c.strategies[..i].contains(s) {
                return Err(AadhaarQrError::InvalidConfig(format!(
                    "Strategy '{s}' listed more than once"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Strategies ───────────────────────────────────────────────────────────

/// The four PDF → raster strategies, in their default priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// S1: in-process pdfium rendering with native password support.
    Pdfium,
    /// S2: poppler's `pdftoppm` with density/size configuration.
    Poppler,
    /// S3: Ghostscript, then ImageMagick as a nested fallback.
    System,
    /// S4: decrypt with pdftk (or qpdf), then run S2 without a password.
    Decrypt,
}

impl StrategyKind {
    pub const DEFAULT_ORDER: [StrategyKind; 4] = [
        StrategyKind::Pdfium,
        StrategyKind::Poppler,
        StrategyKind::System,
        StrategyKind::Decrypt,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::Pdfium => "pdfium",
            StrategyKind::Poppler => "poppler",
            StrategyKind::System => "system",
            StrategyKind::Decrypt => "decrypt",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = AadhaarQrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdfium" | "s1" => Ok(StrategyKind::Pdfium),
            "poppler" | "pdftoppm" | "s2" => Ok(StrategyKind::Poppler),
            "system" | "gs" | "ghostscript" | "s3" => Ok(StrategyKind::System),
            "decrypt" | "pdftk" | "s4" => Ok(StrategyKind::Decrypt),
            other => Err(AadhaarQrError::InvalidConfig(format!(
                "Unknown strategy '{other}' (expected pdfium, poppler, system or decrypt)"
            ))),
        }
    }
}

// ── External tools ───────────────────────────────────────────────────────

/// Explicit paths to external binaries. `None` means "look it up".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolPaths {
    pub pdftoppm: Option<PathBuf>,
    pub ghostscript: Option<PathBuf>,
    pub magick: Option<PathBuf>,
    pub pdftk: Option<PathBuf>,
    pub qpdf: Option<PathBuf>,
}
