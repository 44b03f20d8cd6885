//! Input validation: the `(pdf path, password)` pair for one extraction.

use crate::error::AadhaarQrError;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One extraction request. Immutable once built.
#[derive(Clone)]
pub struct ExtractionRequest {
    pdf_path: PathBuf,
    password: String,
}

impl ExtractionRequest {
    /// Validate that `pdf_path` is an existing file.
    pub fn new(
        pdf_path: impl Into<PathBuf>,
        password: impl Into<String>,
    ) -> Result<Self, AadhaarQrError> {
        let pdf_path = pdf_path.into();
        if !pdf_path.is_file() {
            return Err(AadhaarQrError::FileNotFound { path: pdf_path });
        }
        debug!("Resolved local PDF: {}", pdf_path.display());
        Ok(Self::unchecked(pdf_path, password))
    }

    /// Build a request for a file the pipeline produced itself.
    pub(crate) fn unchecked(pdf_path: impl Into<PathBuf>, password: impl Into<String>) -> Self {
        Self {
            pdf_path: pdf_path.into(),
            password: password.into(),
        }
    }

    pub fn pdf_path(&self) -> &Path {
        &self.pdf_path
    }

    /// The password as given; may be empty.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// `None` for an empty password, for backends that distinguish the two.
    pub fn password_opt(&self) -> Option<&str> {
        if self.password.is_empty() {
            None
        } else {
            Some(&self.password)
        }
    }
}

impl fmt::Debug for ExtractionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionRequest")
            .field("pdf_path", &self.pdf_path)
            .field("password", &"<redacted>")
            .finish()
    }
}
