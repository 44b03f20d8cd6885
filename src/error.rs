//! Error types for the aadhaar-qr library.
//!
//! Three layers of failure, only one of which ever reaches the caller:
//!
//! * [`AadhaarQrError`] — **Fatal**: the extraction cannot produce a record
//!   (missing file, every strategy exhausted, unparseable payload). Returned
//!   as `Err(AadhaarQrError)` from the top-level `extract*` functions.
//!
//! * [`RenderError`] — **Per strategy**: a rendering backend is not installed
//!   or ran and failed. The orchestrator logs it and moves on to the next
//!   strategy.
//!
//! * [`PageError`] — **Per page**: one raster could not be produced or
//!   decoded. The page is skipped; the strategy keeps going.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the aadhaar-qr library.
#[derive(Debug, Error)]
pub enum AadhaarQrError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// Every strategy finished without finding a decodable QR code.
    #[error(
        "All {attempted} extraction strategies failed for '{path}'. Please check if:\n\
  1. PDF file is valid\n\
  2. Password is correct\n\
  3. PDF contains a QR code\n\
  4. Required system tools are installed (pdfium, pdftoppm, gs, magick, pdftk)"
    )]
    AllStrategiesFailed { path: PathBuf, attempted: usize },

    /// A QR code was decoded but its text is not an attribute payload.
    #[error("Failed to parse QR code data: {0}")]
    Parse(#[from] ParseError),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the JSON export.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Decoded QR text that cannot be read as a `key="value"` payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("payload is empty")]
    Empty,

    /// No `key="value"` pair anywhere in the text (e.g. the numeric
    /// secure-QR format).
    #[error("no attribute pairs found in {len}-character payload")]
    NoAttributes { len: usize },

    #[error("payload contains control character U+{code:04X} at byte {offset}")]
    ControlCharacter { code: u32, offset: usize },
}

/// Why a rendering strategy produced no pages.
///
/// Both variants are contained by the orchestrator; they are kept apart so
/// callers and tests can tell "not installed" from "ran and failed".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The backend could not be loaded or spawned at all.
    #[error("{backend} is not available: {detail}")]
    BackendUnavailable {
        backend: &'static str,
        detail: String,
    },

    /// The backend ran but failed (wrong password, corrupt file, non-zero exit).
    #[error("{backend} failed: {detail}")]
    BackendFailed {
        backend: &'static str,
        detail: String,
    },
}

impl RenderError {
    pub(crate) fn unavailable(backend: &'static str, detail: impl Into<String>) -> Self {
        RenderError::BackendUnavailable {
            backend,
            detail: detail.into(),
        }
    }

    pub(crate) fn failed(backend: &'static str, detail: impl Into<String>) -> Self {
        RenderError::BackendFailed {
            backend,
            detail: detail.into(),
        }
    }

    pub fn backend(&self) -> &'static str {
        match self {
            RenderError::BackendUnavailable { backend, .. }
            | RenderError::BackendFailed { backend, .. } => backend,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, RenderError::BackendUnavailable { .. })
    }
}

/// A non-fatal error for a single page. The page is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    /// The backend could not rasterise this page.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The raster exists but could not be decoded as an image.
    #[error("Page {page}: unreadable raster: {detail}")]
    Unreadable { page: usize, detail: String },
}
