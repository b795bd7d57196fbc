//! External engines orchestrated by the pipeline.
//!
//! The pipeline drives two stateful engines it does not implement itself: a
//! document rasteriser and an OCR recogniser. Each sits behind a trait so the
//! native backends ([`pdfium`], [`tesseract`]) can be swapped for test
//! doubles, and both are obtained through an [`Engines`] provider so loading
//! stays lazy and cached (see [`loader`]).
//!
//! ```text
//! Engines ──▶ Rasterizer ──open──▶ OpenDocument ──render_page──▶ RasterSurface
//!        └──▶ Recognizer ──recognize(PageImage)──▶ Recognition
//! ```

pub mod loader;
pub mod pdfium;
pub mod tesseract;

use crate::config::OcrConfig;
use crate::error::StageError;
use crate::pipeline::encode::PageImage;
use crate::pipeline::raster::RasterSurface;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub use loader::{EngineCache, EngineSlot, NativeEngines};

/// The two engine kinds the pipeline loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    PdfRenderer,
    OcrEngine,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::PdfRenderer => write!(f, "PDF renderer (pdfium)"),
            EngineKind::OcrEngine => write!(f, "OCR engine (tesseract)"),
        }
    }
}

/// Opens PDF bytes into a renderable document.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Open `bytes` as a PDF. Fails with a document-stage error.
    async fn open(
        &self,
        bytes: Vec<u8>,
        password: Option<String>,
    ) -> Result<Box<dyn OpenDocument>, StageError>;
}

/// A document opened by a [`Rasterizer`].
#[async_trait]
pub trait OpenDocument: Send {
    /// Number of pages, fixed once the document is open.
    fn page_count(&self) -> usize;

    /// Render the 0-indexed page into `surface` at `scale` and hand it back.
    ///
    /// The surface is resized and overwritten; callers pass the same one for
    /// every page.
    async fn render_page(
        &mut self,
        index: usize,
        scale: f32,
        surface: RasterSurface,
    ) -> Result<RasterSurface, StageError>;
}

/// Text recognised on one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recognition {
    pub text: String,
    /// Mean word confidence in `[0, 100]`, when the engine reports one.
    pub confidence: Option<f32>,
}

/// Per-run recognition settings, passed with every page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizeOptions {
    /// `+`-joined tesseract language codes.
    pub language: String,
    /// Page segmentation mode; `None` keeps the engine default.
    pub psm: Option<u8>,
}

impl RecognizeOptions {
    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            language: config.language.clone(),
            psm: config.psm,
        }
    }
}

/// Sub-page progress sink: receives fractions in `[0, 1]` for the current page.
pub type RecognitionProgress<'a> = &'a (dyn Fn(f32) + Send + Sync);

/// Runs OCR on a single page image.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Recognise the text in `image`. `page` is 1-indexed and only used for
    /// error reporting.
    async fn recognize(
        &self,
        page: usize,
        image: PageImage,
        options: &RecognizeOptions,
        progress: RecognitionProgress<'_>,
    ) -> Result<Recognition, StageError>;
}

/// Supplies loaded engines to the pipeline.
///
/// Implementations load each engine at most once and return the cached
/// handle afterwards.
#[async_trait]
pub trait Engines: Send + Sync {
    async fn rasterizer(&self) -> Result<Arc<dyn Rasterizer>, StageError>;
    async fn recognizer(&self) -> Result<Arc<dyn Recognizer>, StageError>;
}
