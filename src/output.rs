//! Output types returned by [`crate::extract`].

use serde::Serialize;

/// The complete result of an extraction run.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutput {
    /// Assembled, trimmed document text.
    pub text: String,
    /// Page count reported by the document.
    pub page_count: usize,
    /// Per-page results in page order.
    pub pages: Vec<PageText>,
    pub stats: ExtractionStats,
}

/// The recognised text of one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageText {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Raw recognised text, untrimmed. Empty for a skipped page.
    pub text: String,
    /// Mean word confidence, when the engine reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Wall time spent rendering and recognising this page.
    pub duration_ms: u64,
    /// Failure message when the page was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageText {
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Timing and outcome counters for a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionStats {
    pub total_duration_ms: u64,
    /// Time spent in the rasteriser, summed across pages.
    pub render_duration_ms: u64,
    /// Time spent in encoding and recognition, summed across pages.
    pub ocr_duration_ms: u64,
    /// Pages skipped under [`crate::PageFailurePolicy::Skip`].
    pub failed_pages: usize,
}
