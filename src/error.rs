//! Error types for the medguide-ocr library.
//!
//! Two layers reflect the single error boundary of the pipeline:
//!
//! * [`StageError`]: what went wrong and in which stage (engine load, input,
//!   document open, page render/recognise). Stages return it internally.
//!
//! * [`OcrError`]: the one error type the public entry points return. It
//!   wraps exactly one `StageError` and always displays as
//!   `"OCR failed: <stage message>"`, so the uploading UI can show a uniform
//!   message and still match on the underlying cause via [`OcrError::stage`].
//!
//! The pipeline performs no retries. A caller that wants them re-invokes the
//! entry point.

use crate::engine::EngineKind;
use std::path::PathBuf;
use thiserror::Error;

/// Fixed tag prefixed to every error surfaced from the pipeline.
///
/// Kept in sync with the `#[error]` attribute on [`OcrError`].
pub const ERROR_PREFIX: &str = "OCR failed";

/// Stage-level failures.
#[derive(Debug, Error)]
pub enum StageError {
    // ── Load errors ───────────────────────────────────────────────────────
    /// An external engine could not be initialised.
    #[error("could not load {engine}: {reason}")]
    EngineLoad { engine: EngineKind, reason: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// The declared content type is not `application/pdf`.
    #[error("file is not a PDF (content type: {})", .content_type.as_deref().unwrap_or("<none>"))]
    NotAPdf { content_type: Option<String> },

    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Reading the file contents into memory failed.
    #[error("failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input string is neither a file path nor an HTTP/HTTPS URL.
    #[error("invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Document errors ───────────────────────────────────────────────────
    /// The bytes could not be opened as a PDF document.
    #[error("could not open PDF document: {detail}")]
    DocumentOpen { detail: String },

    /// The document opened but reports no pages.
    #[error("PDF document has no pages")]
    EmptyDocument,

    /// PDF requires a password but none (or a wrong one) was provided.
    #[error("PDF is encrypted and the password is missing or wrong")]
    PasswordRequired,

    // ── Page errors ───────────────────────────────────────────────────────
    /// pdfium failed to rasterise a page.
    #[error("rendering failed on page {page}: {detail}")]
    Render { page: usize, detail: String },

    /// The rendered surface could not be encoded as a PNG.
    #[error("image encoding failed on page {page}: {detail}")]
    Encode { page: usize, detail: String },

    /// The OCR engine failed on a page.
    #[error("recognition failed on page {page}: {detail}")]
    Recognition { page: usize, detail: String },

    // ── Other ─────────────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not create or write the output text file.
    #[error("failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StageError {
    /// 1-indexed page number for page-scoped failures.
    pub fn page(&self) -> Option<usize> {
        match self {
            StageError::Render { page, .. }
            | StageError::Encode { page, .. }
            | StageError::Recognition { page, .. } => Some(*page),
            _ => None,
        }
    }
}

/// The single error returned by every public extraction entry point.
#[derive(Debug, Error)]
#[error("OCR failed: {stage}")]
pub struct OcrError {
    #[source]
    stage: StageError,
}

impl OcrError {
    /// The stage failure this error wraps.
    pub fn stage(&self) -> &StageError {
        &self.stage
    }

    /// Consume the error and return the wrapped stage failure.
    pub fn into_stage(self) -> StageError {
        self.stage
    }

    /// True when the failure happened while rendering or recognising a page.
    pub fn is_page_error(&self) -> bool {
        self.stage.page().is_some()
    }

    /// 1-indexed page the failure occurred on, if page-scoped.
    pub fn page(&self) -> Option<usize> {
        self.stage.page()
    }
}

impl From<StageError> for OcrError {
    fn from(stage: StageError) -> Self {
        Self { stage }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_prefixes_message() {
        let e = OcrError::from(StageError::DocumentOpen {
            detail: "bad xref".into(),
        });
        let msg = e.to_string();
        assert!(msg.starts_with(&format!("{ERROR_PREFIX}: ")), "got: {msg}");
        assert!(msg.contains("bad xref"));
    }

    #[test]
    fn page_errors_are_classified() {
        let e = OcrError::from(StageError::Recognition {
            page: 2,
            detail: "tesseract exited with 1".into(),
        });
        assert!(e.is_page_error());
        assert_eq!(e.page(), Some(2));

        let e = OcrError::from(StageError::EmptyDocument);
        assert!(!e.is_page_error());
        assert_eq!(e.page(), None);
    }

    #[test]
    fn not_a_pdf_display_without_type() {
        let e = StageError::NotAPdf { content_type: None };
        assert!(e.to_string().contains("<none>"));
    }

    #[test]
    fn engine_load_names_engine() {
        let e = StageError::EngineLoad {
            engine: EngineKind::OcrEngine,
            reason: "binary not found".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("tesseract"), "got: {msg}");
        assert!(msg.contains("binary not found"));
    }
}
