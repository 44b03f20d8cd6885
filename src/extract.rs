//! Extraction entry points and the strategy chain.
//!
//! [`Extractor`] owns the configured renderers and the QR decoder. For each
//! request it walks the strategies in order, feeds every rendered page
//! through [`preprocess::normalize`] and the decoder, and stops at the first
//! payload. Only that payload is parsed; a parse failure is fatal and does
//! not resume the chain.
//!
//! Rendering and decoding are CPU-bound and partly run external processes, so
//! the async entry points move the whole chain onto `spawn_blocking`.

use crate::config::{ExtractionConfig, StrategyKind};
use crate::error::{AadhaarQrError, PageError};
use crate::pipeline::artifacts::ArtifactDir;
use crate::pipeline::decode::{QrDecoder, RqrrDecoder};
use crate::pipeline::input::ExtractionRequest;
use crate::pipeline::parse::parse_payload;
use crate::pipeline::preprocess;
use crate::pipeline::render::{renderers_from_config, RasterPage, Renderer};
use crate::record::IdentityRecord;
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs the strategy chain for one or more requests.
///
/// Cheap to clone; clones share renderers and decoder.
///
/// # Example
/// ```rust,no_run
/// use aadhaar_qr::{ExtractionConfig, Extractor};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let extractor = Extractor::new(ExtractionConfig::default());
/// let record = extractor.extract(Path::new("eaadhaar.pdf"), "KASH2005").await?;
/// println!("{:?}", record.name);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Extractor {
    renderers: Vec<Arc<dyn Renderer>>,
    decoder: Arc<dyn QrDecoder>,
    config: ExtractionConfig,
}

impl Extractor {
    /// Build the renderers named in `config.strategies`, in order.
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            renderers: renderers_from_config(&config),
            decoder: Arc::new(RqrrDecoder),
            config,
        }
    }

    /// Replace the strategy chain.
    pub fn with_renderers(mut self, renderers: Vec<Arc<dyn Renderer>>) -> Self {
        self.renderers = renderers;
        self
    }

    /// Replace the QR decoder.
    pub fn with_decoder(mut self, decoder: Arc<dyn QrDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Strategies in the order they will be tried.
    pub fn strategies(&self) -> Vec<StrategyKind> {
        self.renderers.iter().map(|r| r.kind()).collect()
    }

    /// Extract on the calling thread.
    ///
    /// The artifact directory is always emptied before this returns, whatever
    /// the outcome.
    pub fn extract_blocking(
        &self,
        pdf_path: &Path,
        password: &str,
    ) -> Result<IdentityRecord, AadhaarQrError> {
        let start = Instant::now();
        info!("Starting extraction: {}", pdf_path.display());

        let request = ExtractionRequest::new(pdf_path, password)?;
        let mut artifacts = ArtifactDir::create(self.config.work_dir.as_deref())?;

        let result = self.run_chain(&request, &artifacts);
        let removed = artifacts.cleanup();
        debug!("Removed {} artifact file(s)", removed);

        match &result {
            Ok(_) => info!("Extraction complete in {}ms", start.elapsed().as_millis()),
            Err(e) => warn!("Extraction failed after {}ms: {}", start.elapsed().as_millis(), e),
        }
        result
    }

    /// Extract on a blocking worker thread.
    pub async fn extract(
        &self,
        pdf_path: &Path,
        password: &str,
    ) -> Result<IdentityRecord, AadhaarQrError> {
        let this = self.clone();
        let pdf_path = pdf_path.to_path_buf();
        let password = password.to_string();

        tokio::task::spawn_blocking(move || this.extract_blocking(&pdf_path, &password))
            .await
            .map_err(|e| AadhaarQrError::Internal(format!("Extraction task panicked: {}", e)))?
    }

    fn run_chain(
        &self,
        request: &ExtractionRequest,
        artifacts: &ArtifactDir,
    ) -> Result<IdentityRecord, AadhaarQrError> {
        let callback = self.config.progress_callback.as_ref();
        let total = self.renderers.len();
        if let Some(cb) = callback {
            cb.on_extraction_start(total);
        }

        for (i, renderer) in self.renderers.iter().enumerate() {
            let kind = renderer.kind();
            info!("Strategy {}/{}: {}", i + 1, total, kind);
            if let Some(cb) = callback {
                cb.on_strategy_start(kind, i + 1, total);
            }

            let mut payload: Option<String> = None;
            let mut visitor = |page: Result<RasterPage, PageError>| -> ControlFlow<()> {
                let page = match page {
                    Ok(page) => page,
                    Err(e) => {
                        warn!("{}: {}", kind, e);
                        return ControlFlow::Continue(());
                    }
                };
                let page_num = page.page_num();
                if let Some(cb) = callback {
                    cb.on_page(kind, page_num);
                }

                let Some(image) = preprocess::normalize(page.source) else {
                    return ControlFlow::Continue(());
                };
                match self.decoder.decode(&image.pixels, image.width, image.height) {
                    Some(text) => {
                        info!("QR code found on page {} using {}", page_num, kind);
                        payload = Some(text);
                        ControlFlow::Break(())
                    }
                    None => {
                        debug!("No QR code on page {} ({})", page_num, kind);
                        ControlFlow::Continue(())
                    }
                }
            };

            let outcome = renderer.render(request, artifacts, &mut visitor);

            if let Some(text) = payload {
                let parsed = parse_payload(&text);
                if let Some(cb) = callback {
                    cb.on_extraction_complete(parsed.is_ok().then_some(kind));
                }
                return Ok(parsed?);
            }

            let reason = match outcome {
                Ok(stats) => {
                    info!(
                        "{} scanned {} page(s) without a QR code",
                        kind, stats.pages_visited
                    );
                    format!("no QR code found in {} page(s)", stats.pages_visited)
                }
                Err(e) if e.is_unavailable() => {
                    info!("Skipping {}: {}", kind, e);
                    e.to_string()
                }
                Err(e) => {
                    warn!("{} failed: {}", kind, e);
                    e.to_string()
                }
            };
            if let Some(cb) = callback {
                cb.on_strategy_failed(kind, &reason);
            }
        }

        if let Some(cb) = callback {
            cb.on_extraction_complete(None);
        }
        Err(AadhaarQrError::AllStrategiesFailed {
            path: request.pdf_path().to_path_buf(),
            attempted: total,
        })
    }
}

/// Extract the identity record from an e-Aadhaar PDF.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `pdf_path` — Local path to the PDF
/// * `password` — Document password; may be empty
/// * `config`   — Extraction configuration
///
/// # Errors
/// - [`AadhaarQrError::FileNotFound`] before any strategy runs
/// - [`AadhaarQrError::AllStrategiesFailed`] when no page of any strategy
///   yields a QR code
/// - [`AadhaarQrError::Parse`] when the first QR found is not a
///   `key="value"` payload
pub async fn extract(
    pdf_path: impl AsRef<Path>,
    password: &str,
    config: &ExtractionConfig,
) -> Result<IdentityRecord, AadhaarQrError> {
    Extractor::new(config.clone())
        .extract(pdf_path.as_ref(), password)
        .await
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally; do not call from inside a
/// runtime. Use [`Extractor::extract_blocking`] there instead.
pub fn extract_sync(
    pdf_path: impl AsRef<Path>,
    password: &str,
    config: &ExtractionConfig,
) -> Result<IdentityRecord, AadhaarQrError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| AadhaarQrError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(pdf_path, password, config))
}

/// Extract and write the record as pretty JSON, without `rawData`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn extract_to_file(
    pdf_path: impl AsRef<Path>,
    password: &str,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<IdentityRecord, AadhaarQrError> {
    let record = extract(pdf_path, password, config).await?;
    write_json(output_path.as_ref(), &record).await?;
    Ok(record)
}

pub(crate) async fn write_json(path: &Path, record: &IdentityRecord) -> Result<(), AadhaarQrError> {
    let write_err = |e: std::io::Error| AadhaarQrError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let json = serde_json::to_string_pretty(&record.without_raw_data())
        .map_err(|e| AadhaarQrError::Internal(format!("JSON serialisation failed: {}", e)))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

/// Platform-specific instructions for installing the optional backends.
pub fn install_help() -> &'static str {
    if cfg!(target_os = "windows") {
        "Install at least one rendering backend:\n\
  pdfium:       place pdfium.dll next to the executable or set PDFIUM_LIB_PATH\n\
  poppler:      choco install poppler\n\
  ghostscript:  choco install ghostscript\n\
  imagemagick:  choco install imagemagick\n\
  pdftk / qpdf: choco install pdftk-server qpdf"
    } else if cfg!(target_os = "macos") {
        "Install at least one rendering backend:\n\
  pdfium:       download libpdfium.dylib and set PDFIUM_LIB_PATH\n\
  poppler:      brew install poppler\n\
  ghostscript:  brew install ghostscript\n\
  imagemagick:  brew install imagemagick\n\
  pdftk / qpdf: brew install pdftk-java qpdf"
    } else {
        "Install at least one rendering backend:\n\
  pdfium:       download libpdfium.so and set PDFIUM_LIB_PATH\n\
  poppler:      sudo apt-get install poppler-utils\n\
  ghostscript:  sudo apt-get install ghostscript\n\
  imagemagick:  sudo apt-get install imagemagick\n\
  pdftk / qpdf: sudo apt-get install pdftk qpdf"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_extractor_uses_configured_order() {
        let config = ExtractionConfig::builder()
            .strategies(vec![StrategyKind::Decrypt, StrategyKind::Poppler])
            .build()
            .unwrap();
        let extractor = Extractor::new(config);
        assert_eq!(
            extractor.strategies(),
            [StrategyKind::Decrypt, StrategyKind::Poppler]
        );
    }

    #[test]
    fn missing_file_fails_before_any_strategy() {
        let extractor = Extractor::new(ExtractionConfig::default()).with_renderers(vec![]);
        let err = extractor
            .extract_blocking(Path::new("/nonexistent/eaadhaar.pdf"), "pw")
            .unwrap_err();
        assert!(matches!(err, AadhaarQrError::FileNotFound { .. }));
    }

    #[test]
    fn async_entry_point_reports_missing_file() {
        let err = tokio_test::block_on(extract(
            "/nonexistent/eaadhaar.pdf",
            "",
            &ExtractionConfig::default(),
        ))
        .unwrap_err();
        assert!(matches!(err, AadhaarQrError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn write_json_omits_raw_data_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/record.json");
        let record = IdentityRecord {
            name: Some("Ramesh Kumar".into()),
            raw_data: "name=\"UmFtZXNoIEt1bWFy\"".into(),
            ..IdentityRecord::default()
        };
        write_json(&out, &record).await.unwrap();

        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.contains("\"name\": \"Ramesh Kumar\""));
        assert!(!text.contains("rawData"));
        assert!(!out.with_extension("json.tmp").exists());
    }

    #[test]
    fn install_help_mentions_every_backend() {
        let help = install_help();
        for tool in ["pdfium", "poppler", "ghostscript", "imagemagick", "pdftk"] {
            assert!(help.contains(tool), "missing {tool}");
        }
    }
}
