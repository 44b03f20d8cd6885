//! S3: system rasterisers, Ghostscript first and ImageMagick as a fallback.
//!
//! ImageMagick is only tried when Ghostscript is missing or exits with an
//! error. If Ghostscript runs fine but no page carries a QR code, the
//! strategy is over.

use super::{tools, visit_files, PageVisitor, RenderStats, Renderer};
use crate::config::{ExtractionConfig, StrategyKind};
use crate::error::RenderError;
use crate::pipeline::artifacts::ArtifactDir;
use crate::pipeline::input::ExtractionRequest;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const GS: &str = "ghostscript";
const MAGICK: &str = "imagemagick";

const GS_ENV: &str = "AADHAAR_QR_GS_PATH";
const MAGICK_ENV: &str = "AADHAAR_QR_MAGICK_PATH";

const GS_PREFIX: &str = "gs-page";
const MAGICK_PREFIX: &str = "magick-page";

#[cfg(windows)]
const GS_NAMES: &[&str] = &["gswin64c", "gswin32c", "gs"];
#[cfg(not(windows))]
const GS_NAMES: &[&str] = &["gs"];

// `convert.exe` on Windows is the filesystem tool, not ImageMagick.
#[cfg(windows)]
const MAGICK_NAMES: &[&str] = &["magick"];
#[cfg(not(windows))]
const MAGICK_NAMES: &[&str] = &["magick", "convert"];

/// S3 renderer.
#[derive(Debug, Clone)]
pub struct SystemRenderer {
    dpi: u32,
    ghostscript: Option<PathBuf>,
    magick: Option<PathBuf>,
}

impl SystemRenderer {
    pub fn new(dpi: u32) -> Self {
        Self {
            dpi,
            ghostscript: None,
            magick: None,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            dpi: config.rasterizer_dpi,
            ghostscript: config.tools.ghostscript.clone(),
            magick: config.tools.magick.clone(),
        }
    }

    fn gs_args(&self, request: &ExtractionRequest, out_dir: &Path) -> Vec<OsString> {
        let pattern = out_dir.join(format!("{GS_PREFIX}_%d.png"));
        let mut args = tools::args([
            "-dNOPAUSE".to_string(),
            "-dBATCH".to_string(),
            "-dSAFER".to_string(),
            "-dQUIET".to_string(),
            "-sDEVICE=png16m".to_string(),
            format!("-r{}", self.dpi),
        ]);
        let mut output = OsString::from("-sOutputFile=");
        output.push(pattern);
        args.push(output);
        if let Some(password) = request.password_opt() {
            args.push(format!("-sPDFPassword={password}").into());
        }
        args.push(request.pdf_path().into());
        args
    }

    fn magick_args(&self, request: &ExtractionRequest, out_dir: &Path) -> Vec<OsString> {
        let mut args = tools::args(["-density".to_string(), self.dpi.to_string()]);
        if let Some(password) = request.password_opt() {
            args.extend(tools::args(["-authenticate", password]));
        }
        args.push(request.pdf_path().into());
        args.push(out_dir.join(format!("{MAGICK_PREFIX}.png")).into());
        args
    }

    fn ghostscript(
        &self,
        request: &ExtractionRequest,
        artifacts: &ArtifactDir,
    ) -> Result<Vec<PathBuf>, RenderError> {
        let program = tools::locate(GS, self.ghostscript.as_deref(), GS_ENV, GS_NAMES)?;
        tools::run(
            GS,
            &program,
            &self.gs_args(request, artifacts.path()),
            request.password(),
        )?;
        Ok(artifacts.page_files(GS_PREFIX, "png"))
    }

    fn imagemagick(
        &self,
        request: &ExtractionRequest,
        artifacts: &ArtifactDir,
    ) -> Result<Vec<PathBuf>, RenderError> {
        let program = tools::locate(MAGICK, self.magick.as_deref(), MAGICK_ENV, MAGICK_NAMES)?;
        tools::run(
            MAGICK,
            &program,
            &self.magick_args(request, artifacts.path()),
            request.password(),
        )?;
        Ok(artifacts.page_files(MAGICK_PREFIX, "png"))
    }
}

impl Renderer for SystemRenderer {
    fn kind(&self) -> StrategyKind {
        StrategyKind::System
    }

    fn render(
        &self,
        request: &ExtractionRequest,
        artifacts: &ArtifactDir,
        on_page: &mut PageVisitor<'_>,
    ) -> Result<RenderStats, RenderError> {
        let files = match self.ghostscript(request, artifacts) {
            Ok(files) => {
                info!("Ghostscript wrote {} page(s)", files.len());
                files
            }
            Err(gs_err) => {
                warn!("{}; trying ImageMagick", gs_err);
                match self.imagemagick(request, artifacts) {
                    Ok(files) => {
                        info!("ImageMagick wrote {} page(s)", files.len());
                        files
                    }
                    // Both missing reads as "unavailable"; otherwise report
                    // the one that actually ran.
                    Err(magick_err) if magick_err.is_unavailable() && !gs_err.is_unavailable() => {
                        return Err(gs_err)
                    }
                    Err(magick_err) => return Err(magick_err),
                }
            }
        };

        Ok(visit_files(files, on_page))
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
    fn gs_args_use_png16m_and_password() {
        let r = SystemRenderer::new(300);
        let req = ExtractionRequest::unchecked("/in/doc.pdf", "KASH2005");
        let args = strings(&r.gs_args(&req, Path::new("/w")));
        assert_eq!(
            args,
            [
                "-dNOPAUSE",
                "-dBATCH",
                "-dSAFER",
                "-dQUIET",
                "-sDEVICE=png16m",
                "-r300",
                "-sOutputFile=/w/gs-page_%d.png",
                "-sPDFPassword=KASH2005",
                "/in/doc.pdf",
            ]
        );
    }

    #[test]
    fn magick_args_authenticate_only_with_password() {
        let r = SystemRenderer::new(300);
        let req = ExtractionRequest::unchecked("a.pdf", "pw");
        let with = strings(&r.magick_args(&req, Path::new("/w")));
        assert_eq!(
            with,
            ["-density", "300", "-authenticate", "pw", "a.pdf", "/w/magick-page.png"]
        );
        let req = ExtractionRequest::unchecked("a.pdf", "");
        let without = strings(&r.magick_args(&req, Path::new("/w")));
        assert_eq!(without, ["-density", "300", "a.pdf", "/w/magick-page.png"]);
    }

    #[test]
    fn both_tools_missing_is_unavailable() {
        let config = ExtractionConfig::builder()
            .tools(ToolPaths {
                ghostscript: Some("/nonexistent/bin/gs".into()),
                magick: Some("/nonexistent/bin/magick".into()),
                ..ToolPaths::default()
            })
            .build()
            .unwrap();
        let renderer = SystemRenderer::from_config(&config);
        let artifacts = ArtifactDir::create(None).unwrap();
        let req = ExtractionRequest::unchecked("/in/doc.pdf", "");
        let err = renderer
            .render(&req, &artifacts, &mut |_| ControlFlow::Continue(()))
            .unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(err.backend(), MAGICK);
    }

    #[cfg(unix)]
    #[test]
    fn falls_back_to_imagemagick_when_gs_fails() {
        use std::os::unix::fs::PermissionsExt;

        let bin = tempfile::tempdir().unwrap();
        let write_script = |name: &str, body: &str| {
            let path = bin.path().join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        };
        let gs = write_script("gs", "exit 1");
        // Last argument is the output path; write two pages next to it.
        let magick = write_script(
            "magick",
            "for last; do :; done\ndir=$(dirname \"$last\")\ntouch \"$dir/magick-page-0.png\" \"$dir/magick-page-1.png\"",
        );

        let config = ExtractionConfig::builder()
            .tools(ToolPaths {
                ghostscript: Some(gs),
                magick: Some(magick),
                ..ToolPaths::default()
            })
            .build()
            .unwrap();
        let renderer = SystemRenderer::from_config(&config);
        let artifacts = ArtifactDir::create(None).unwrap();
        let req = ExtractionRequest::unchecked("/in/doc.pdf", "");

        let mut seen = Vec::new();
        let stats = renderer
            .render(&req, &artifacts, &mut |page| {
                seen.push(page.unwrap().page_num());
                ControlFlow::Continue(())
            })
            .unwrap();
        assert_eq!(seen, [1, 2]);
        assert!(!stats.stopped_early);
    }
}
