//! S4: write a decrypted copy, then render it with poppler.
//!
//! Some e-Aadhaar PDFs use encryption that a renderer cannot open even with
//! the right password, while `pdftk` (or `qpdf`) can still strip it. The
//! copy lives in the request's artifact directory and is deleted with it.

use super::poppler::PopplerRenderer;
use super::{tools, PageVisitor, RenderStats, Renderer};
use crate::config::{ExtractionConfig, StrategyKind};
use crate::error::RenderError;
use crate::pipeline::artifacts::ArtifactDir;
use crate::pipeline::input::ExtractionRequest;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const PDFTK: &str = "pdftk";
const QPDF: &str = "qpdf";

const PDFTK_ENV: &str = "AADHAAR_QR_PDFTK_PATH";
const QPDF_ENV: &str = "AADHAAR_QR_QPDF_PATH";

const DECRYPTED_FILE: &str = "decrypted.pdf";
const DECRYPTED_PREFIX: &str = "decrypted-page";

/// qpdf exits with 3 when it succeeded with warnings.
const QPDF_EXIT_WARNINGS: i32 = 3;

/// S4 renderer.
#[derive(Debug, Clone)]
pub struct DecryptRenderer {
    pdftk: Option<PathBuf>,
    qpdf: Option<PathBuf>,
    inner: PopplerRenderer,
}

impl DecryptRenderer {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            pdftk: config.tools.pdftk.clone(),
            qpdf: config.tools.qpdf.clone(),
            inner: PopplerRenderer::from_config(config).with_prefix(DECRYPTED_PREFIX),
        }
    }

    fn pdftk_args(request: &ExtractionRequest, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![request.pdf_path().into()];
        if let Some(password) = request.password_opt() {
            args.extend(tools::args(["input_pw", password]));
        }
        args.push("output".into());
        args.push(output.into());
        args
    }

    fn qpdf_args(request: &ExtractionRequest, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        if let Some(password) = request.password_opt() {
            args.push(format!("--password={password}").into());
        }
        args.push("--decrypt".into());
        args.push(request.pdf_path().into());
        args.push(output.into());
        args
    }

    fn decrypt_with_pdftk(
        &self,
        request: &ExtractionRequest,
        output: &Path,
    ) -> Result<(), RenderError> {
        let program = tools::locate(PDFTK, self.pdftk.as_deref(), PDFTK_ENV, &["pdftk"])?;
        tools::run(
            PDFTK,
            &program,
            &Self::pdftk_args(request, output),
            request.password(),
        )?;
        Ok(())
    }

    fn decrypt_with_qpdf(
        &self,
        request: &ExtractionRequest,
        output: &Path,
    ) -> Result<(), RenderError> {
        let program = tools::locate(QPDF, self.qpdf.as_deref(), QPDF_ENV, &["qpdf"])?;
        let result = tools::execute(
            QPDF,
            &program,
            &Self::qpdf_args(request, output),
            request.password(),
        )?;
        match result.status.code() {
            Some(0) | Some(QPDF_EXIT_WARNINGS) => Ok(()),
            _ => Err(RenderError::failed(
                QPDF,
                tools::failure_detail(&result, request.password()),
            )),
        }
    }

    fn decrypt(&self, request: &ExtractionRequest, output: &Path) -> Result<(), RenderError> {
        match self.decrypt_with_pdftk(request, output) {
            Ok(()) => Ok(()),
            Err(pdftk_err) => {
                warn!("{}; trying qpdf", pdftk_err);
                match self.decrypt_with_qpdf(request, output) {
                    Ok(()) => Ok(()),
                    Err(qpdf_err) if qpdf_err.is_unavailable() && !pdftk_err.is_unavailable() => {
                        Err(pdftk_err)
                    }
                    Err(qpdf_err) => Err(qpdf_err),
                }
            }
        }
    }
}

impl Renderer for DecryptRenderer {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Decrypt
    }

    fn render(
        &self,
        request: &ExtractionRequest,
        artifacts: &ArtifactDir,
        on_page: &mut PageVisitor<'_>,
    ) -> Result<RenderStats, RenderError> {
        let decrypted = artifacts.file(DECRYPTED_FILE);
        self.decrypt(request, &decrypted)?;

        if !decrypted.is_file() {
            return Err(RenderError::failed(
                PDFTK,
                "decryption reported success but wrote no file",
            ));
        }
        info!("Decrypted copy written to {}", decrypted.display());

        let unlocked = ExtractionRequest::unchecked(decrypted, "");
        self.inner.render(&unlocked, artifacts, on_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolPaths;
    use std::ops::ControlFlow;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn pdftk_args_pass_password_as_input_pw() {
        let req = ExtractionRequest::unchecked("/in/doc.pdf", "KASH2005");
        assert_eq!(
            strings(&DecryptRenderer::pdftk_args(&req, Path::new("/w/decrypted.pdf"))),
            ["/in/doc.pdf", "input_pw", "KASH2005", "output", "/w/decrypted.pdf"]
        );
    }

    #[test]
    fn qpdf_args_decrypt_in_place_of_pdftk() {
        let req = ExtractionRequest::unchecked("/in/doc.pdf", "KASH2005");
        assert_eq!(
            strings(&DecryptRenderer::qpdf_args(&req, Path::new("/w/decrypted.pdf"))),
            ["--password=KASH2005", "--decrypt", "/in/doc.pdf", "/w/decrypted.pdf"]
        );
    }

    #[test]
    fn no_decryptor_means_unavailable_and_no_pages() {
        let config = ExtractionConfig::builder()
            .tools(ToolPaths {
                pdftk: Some("/nonexistent/bin/pdftk".into()),
                qpdf: Some("/nonexistent/bin/qpdf".into()),
                ..ToolPaths::default()
            })
            .build()
            .unwrap();
        let renderer = DecryptRenderer::from_config(&config);
        let artifacts = ArtifactDir::create(None).unwrap();
        let req = ExtractionRequest::unchecked("/in/doc.pdf", "pw");
        let mut visited = 0;
        let err = renderer
            .render(&req, &artifacts, &mut |_| {
                visited += 1;
                ControlFlow::Continue(())
            })
            .unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(visited, 0);
        assert!(!artifacts.file(DECRYPTED_FILE).exists());
    }

    #[cfg(unix)]
    #[test]
    fn qpdf_warning_exit_counts_as_success() {
        use std::os::unix::fs::PermissionsExt;

        let bin = tempfile::tempdir().unwrap();
        let qpdf = bin.path().join("qpdf");
        // Last argument is the output file.
        std::fs::write(
            &qpdf,
            "#!/bin/sh\nfor last; do :; done\necho '%PDF-1.4' > \"$last\"\nexit 3\n",
        )
        .unwrap();
        std::fs::set_permissions(&qpdf, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = ExtractionConfig::builder()
            .tools(ToolPaths {
                pdftk: Some("/nonexistent/bin/pdftk".into()),
                qpdf: Some(qpdf),
                ..ToolPaths::default()
            })
            .build()
            .unwrap();
        let renderer = DecryptRenderer::from_config(&config);
        let artifacts = ArtifactDir::create(None).unwrap();
        let req = ExtractionRequest::unchecked("/in/doc.pdf", "pw");
        let out = artifacts.file(DECRYPTED_FILE);
        renderer.decrypt(&req, &out).unwrap();
        assert!(out.is_file());
    }
}
