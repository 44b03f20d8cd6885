//! # aadhaar-qr
//!
//! Extract the identity fields encoded in the QR code of a password-protected
//! e-Aadhaar PDF.
//!
//! ## Why several strategies?
//!
//! No single PDF rasteriser opens every e-Aadhaar file: some builds of a tool
//! cannot handle the encryption, some machines lack the tool entirely. This
//! crate tries up to four rendering strategies in order and stops at the
//! first page of the first strategy that yields a decodable QR code.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF + password
//!  │
//!  ├─ 1. Input       check the file exists
//!  ├─ 2. Render      S1 pdfium → S2 pdftoppm → S3 gs/magick → S4 pdftk/qpdf + pdftoppm
//!  ├─ 3. Normalise   greyscale, contrast stretch, sharpen
//!  ├─ 4. Decode      rqrr, first symbol wins
//!  ├─ 5. Parse       key="value" attributes, base64 values decoded
//!  └─ 6. Cleanup     request-scoped temp files removed on every path
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aadhaar_qr::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::default();
//!     let record = extract("eaadhaar.pdf", "KASH2005", &config).await?;
//!     println!("{}", record.name.as_deref().unwrap_or("-"));
//!     println!("{}", record.format_address());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `aadhaar-qr` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! aadhaar-qr = { version = "0.1", default-features = false }
//! ```
//!
//! ## External backends
//!
//! | Strategy | Needs | Override |
//! |----------|-------|----------|
//! | pdfium   | pdfium shared library | `PDFIUM_LIB_PATH` |
//! | poppler  | `pdftoppm` | `AADHAAR_QR_PDFTOPPM_PATH` |
//! | system   | `gs` or `magick` | `AADHAAR_QR_GS_PATH`, `AADHAAR_QR_MAGICK_PATH` |
//! | decrypt  | `pdftk` or `qpdf`, plus `pdftoppm` | `AADHAAR_QR_PDFTK_PATH`, `AADHAAR_QR_QPDF_PATH` |
//!
//! A missing backend only skips its strategy.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod progress;
pub mod record;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, StrategyKind, ToolPaths};
pub use error::{AadhaarQrError, PageError, ParseError, RenderError};
pub use extract::{extract, extract_sync, extract_to_file, install_help, Extractor};
pub use pipeline::decode::{QrDecoder, RqrrDecoder};
pub use pipeline::parse::parse_payload;
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::IdentityRecord;
