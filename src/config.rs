//! Configuration types for PDF-to-text OCR extraction.
//!
//! All extraction behaviour is controlled through [`OcrConfig`], built via
//! its [`OcrConfigBuilder`]. Engine locations (pdfium library, tesseract
//! binary) live here too, so a single value describes a complete run.

use crate::error::StageError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Upscaling factor applied when rasterising each page.
///
/// 2× keeps small glyphs legible to the recogniser. Lower values lose fine
/// print; higher values multiply recognition time per page with no
/// measurable accuracy gain.
pub const RENDER_SCALE: f32 = 2.0;

/// Built-in recognition language (Tesseract language code).
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Accepted range for [`OcrConfig::scale`].
pub const SCALE_RANGE: (f32, f32) = (0.5, 4.0);

/// Configuration for a PDF-to-text extraction.
///
/// Built via [`OcrConfig::builder()`] or using [`OcrConfig::default()`].
///
/// # Example
/// ```rust
/// use medguide_ocr::{OcrConfig, PageFailurePolicy};
///
/// let config = OcrConfig::builder()
///     .language("eng")
///     .page_failure(PageFailurePolicy::Abort)
///     .build()
///     .unwrap();
/// assert_eq!(config.scale, medguide_ocr::RENDER_SCALE);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Page rasterisation scale. Default: [`RENDER_SCALE`].
    pub scale: f32,

    /// Tesseract language code, e.g. "eng" or "eng+fra". Default: "eng".
    pub language: String,

    /// What to do when a single page fails to render or recognise.
    pub page_failure: PageFailurePolicy,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Explicit tesseract binary. Falls back to `TESSERACT_PATH`, then `PATH`.
    pub tesseract_path: Option<PathBuf>,

    /// Directory holding `*.traineddata`; passed as `--tessdata-dir`.
    pub tessdata_dir: Option<PathBuf>,

    /// Tesseract page segmentation mode (`--psm`). `None` uses tesseract's default.
    pub psm: Option<u8>,

    /// Explicit pdfium shared library. Falls back to `PDFIUM_LIB_PATH`, then
    /// the system library.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            scale: RENDER_SCALE,
            language: DEFAULT_LANGUAGE.to_string(),
            page_failure: PageFailurePolicy::default(),
            password: None,
            tesseract_path: None,
            tessdata_dir: None,
            psm: None,
            pdfium_lib_path: None,
            download_timeout_secs: 120,
        }
    }
}

impl OcrConfig {
    /// Create a new builder for `OcrConfig`.
    pub fn builder() -> OcrConfigBuilder {
        OcrConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`OcrConfig`].
#[derive(Debug)]
pub struct OcrConfigBuilder {
    config: OcrConfig,
}

impl OcrConfigBuilder {
    pub fn scale(mut self, scale: f32) -> Self {
        self.config.scale = scale.clamp(SCALE_RANGE.0, SCALE_RANGE.1);
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = lang.into();
        self
    }

    pub fn page_failure(mut self, policy: PageFailurePolicy) -> Self {
        self.config.page_failure = policy;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_path = Some(path.into());
        self
    }

    pub fn tessdata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.tessdata_dir = Some(dir.into());
        self
    }

    pub fn psm(mut self, psm: u8) -> Self {
        self.config.psm = Some(psm);
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OcrConfig, StageError> {
        let c = &self.config;
        if !c.scale.is_finite() || c.scale < SCALE_RANGE.0 || c.scale > SCALE_RANGE.1 {
            return Err(StageError::InvalidConfig(format!(
                "scale must be {}–{}, got {}",
                SCALE_RANGE.0, SCALE_RANGE.1, c.scale
            )));
        }
        if !is_valid_language(&c.language) {
            return Err(StageError::InvalidConfig(format!(
                "invalid tesseract language '{}'",
                c.language
            )));
        }
        if let Some(psm) = c.psm {
            if psm > 13 {
                return Err(StageError::InvalidConfig(format!(
                    "psm must be 0–13, got {psm}"
                )));
            }
        }
        Ok(self.config)
    }
}

/// Tesseract language strings are `+`-joined codes of letters, digits and `_`.
fn is_valid_language(lang: &str) -> bool {
    !lang.is_empty()
        && lang.split('+').all(|code| {
            !code.is_empty() && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Behaviour when rendering or recognition fails on one page.
///
/// A partially recognised guide is treated as unusable, so the default
/// aborts the whole run. `Skip` trades completeness for availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageFailurePolicy {
    /// Abort the run on the first failed page; nothing is returned. (default)
    #[default]
    Abort,
    /// Record the failure, keep the page's marker with empty text, continue.
    Skip,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_named_constants() {
        let c = OcrConfig::default();
        assert_eq!(c.scale, RENDER_SCALE);
        assert_eq!(c.language, DEFAULT_LANGUAGE);
        assert_eq!(c.page_failure, PageFailurePolicy::Abort);
    }

    #[test]
    fn scale_setter_clamps() {
        let c = OcrConfig::builder().scale(10.0).build().unwrap();
        assert_eq!(c.scale, SCALE_RANGE.1);
        let c = OcrConfig::builder().scale(0.1).build().unwrap();
        assert_eq!(c.scale, SCALE_RANGE.0);
    }

    #[test]
    fn rejects_bad_language() {
        assert!(OcrConfig::builder().language("").build().is_err());
        assert!(OcrConfig::builder().language("eng; rm -rf").build().is_err());
        assert!(OcrConfig::builder().language("eng++fra").build().is_err());
        assert!(OcrConfig::builder().language("eng+fra").build().is_ok());
        assert!(OcrConfig::builder().language("chi_sim").build().is_ok());
    }

    #[test]
    fn rejects_out_of_range_psm() {
        assert!(OcrConfig::builder().psm(14).build().is_err());
        assert!(OcrConfig::builder().psm(6).build().is_ok());
    }

    #[test]
    fn config_roundtrips_through_json() {
        let c = OcrConfig::builder()
            .page_failure(PageFailurePolicy::Skip)
            .psm(3)
            .build()
            .unwrap();
        let json = serde_json::to_string(&c).unwrap();
        let back: OcrConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.page_failure, PageFailurePolicy::Skip);
        assert_eq!(back.psm, Some(3));
    }
}
