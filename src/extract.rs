//! Eager (full-document) extraction entry points.
//!
//! The run is strictly sequential: engines are loaded (or fetched from the
//! process-wide cache), the file is read and opened, then every page is
//! rendered, encoded and recognised in order before the next one starts.
//! Only one page image exists at any time.
//!
//! Every stage reports its failures as a [`StageError`]; [`extract_with`] is
//! the one place they are wrapped into the public [`OcrError`].

use crate::config::{OcrConfig, PageFailurePolicy};
use crate::engine::{
    EngineKind, Engines, NativeEngines, OpenDocument, Recognition, RecognizeOptions, Recognizer,
};
use crate::error::{OcrError, StageError};
use crate::file::{is_pdf, GuideFile};
use crate::output::{ExtractionOutput, ExtractionStats, PageText};
use crate::pipeline::assemble::assemble;
use crate::pipeline::encode;
use crate::pipeline::raster::RasterSurface;
use crate::progress::{ProgressEvent, ProgressReporter};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extract the text of a PDF guide with the native engines and default
/// configuration.
///
/// Pages are separated by `===== Page N =====` markers when there is more
/// than one; the result is trimmed.
///
/// # Example
/// ```rust,no_run
/// use medguide_ocr::{extract_text_from_pdf, GuideFile, ProgressReporter};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let file = GuideFile::from_path("guide.pdf").await?;
/// let progress = ProgressReporter::from_fn(|msg: &str| eprintln!("{msg}"));
/// let text = extract_text_from_pdf(&file, &progress).await?;
/// println!("{text}");
/// # Ok(())
/// # }
/// ```
pub async fn extract_text_from_pdf(
    file: &GuideFile,
    progress: &ProgressReporter,
) -> Result<String, OcrError> {
    let config = OcrConfig::default();
    extract(file, &config, progress).await.map(|out| out.text)
}

/// Extract with the native engines, returning per-page results and stats.
pub async fn extract(
    file: &GuideFile,
    config: &OcrConfig,
    progress: &ProgressReporter,
) -> Result<ExtractionOutput, OcrError> {
    let engines = NativeEngines::new(config);
    extract_with(&engines, file, config, progress).await
}

/// Extract with caller-supplied engines.
///
/// # Errors
/// Any stage failure, wrapped once. Under [`PageFailurePolicy::Skip`] page
/// failures are recorded in [`PageText::error`] instead.
pub async fn extract_with(
    engines: &dyn Engines,
    file: &GuideFile,
    config: &OcrConfig,
    progress: &ProgressReporter,
) -> Result<ExtractionOutput, OcrError> {
    run(engines, file, config, progress).await.map_err(|e| {
        warn!("Extraction failed: {}", e);
        OcrError::from(e)
    })
}

/// Extract and write the text directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn extract_to_file(
    file: &GuideFile,
    output_path: impl AsRef<Path>,
    config: &OcrConfig,
    progress: &ProgressReporter,
) -> Result<ExtractionStats, OcrError> {
    let output = extract(file, config, progress).await?;
    write_text_atomic(output_path.as_ref(), &output.text).await?;
    Ok(output.stats)
}

/// Write `text` to `path` via a sibling temp file and a rename, creating
/// parent directories as needed.
pub async fn write_text_atomic(path: &Path, text: &str) -> Result<(), StageError> {
    let write_failed = |source| StageError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("txt.tmp");
    tokio::fs::write(&tmp_path, text).await.map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_failed)?;
    debug!("Wrote {} bytes to {}", text.len(), path.display());
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run(
    engines: &dyn Engines,
    file: &GuideFile,
    config: &OcrConfig,
    progress: &ProgressReporter,
) -> Result<ExtractionOutput, StageError> {
    let total_start = Instant::now();
    info!(
        "Starting extraction: {}",
        file.name().unwrap_or("<in-memory file>")
    );

    if !is_pdf(file) {
        return Err(StageError::NotAPdf {
            content_type: file.content_type().map(str::to_string),
        });
    }

    // ── Step 1: Load engines ─────────────────────────────────────────────
    progress.report(ProgressEvent::LoadingLibraries);
    progress.report(ProgressEvent::LoadingEngine {
        engine: EngineKind::PdfRenderer,
    });
    let rasterizer = engines.rasterizer().await?;
    progress.report(ProgressEvent::LoadingEngine {
        engine: EngineKind::OcrEngine,
    });
    let recognizer = engines.recognizer().await?;

    // ── Step 2: Read and open the document ───────────────────────────────
    progress.report(ProgressEvent::ReadingFile);
    let bytes = file.read_all().await?;

    progress.report(ProgressEvent::OpeningDocument);
    let mut document = rasterizer.open(bytes, config.password.clone()).await?;
    let total_pages = document.page_count();
    // pdfium rejects empty documents itself; other engines may report zero.
    if total_pages == 0 {
        return Err(StageError::EmptyDocument);
    }
    progress.report(ProgressEvent::DocumentOpened { pages: total_pages });

    // ── Step 3: Render and recognise each page in order ──────────────────
    let options = RecognizeOptions::from_config(config);
    let mut surface = RasterSurface::new();
    let mut pages = Vec::with_capacity(total_pages);
    let mut stats = ExtractionStats::default();

    for index in 0..total_pages {
        let page_num = index + 1;
        progress.report(ProgressEvent::PageStarted {
            page: page_num,
            total: total_pages,
        });
        let page_start = Instant::now();

        let result = process_page(
            document.as_mut(),
            recognizer.as_ref(),
            index,
            surface,
            config,
            &options,
            progress,
        )
        .await;

        match result {
            Ok(done) => {
                surface = done.surface;
                stats.render_duration_ms += done.render_ms;
                stats.ocr_duration_ms += done.ocr_ms;
                pages.push(PageText {
                    page_num,
                    text: done.recognition.text,
                    confidence: done.recognition.confidence,
                    duration_ms: page_start.elapsed().as_millis() as u64,
                    error: None,
                });
            }
            Err(e) if e.page().is_some() && config.page_failure == PageFailurePolicy::Skip => {
                warn!("Skipping page {}: {}", page_num, e);
                surface = RasterSurface::new();
                stats.failed_pages += 1;
                pages.push(PageText {
                    page_num,
                    text: String::new(),
                    confidence: None,
                    duration_ms: page_start.elapsed().as_millis() as u64,
                    error: Some(e.to_string()),
                });
            }
            Err(e) => return Err(e),
        }
    }
    drop(document);

    // ── Step 4: Assemble ─────────────────────────────────────────────────
    let texts: Vec<&str> = pages.iter().map(|p| p.text.as_str()).collect();
    let text = assemble(&texts);

    progress.report(ProgressEvent::Complete);
    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Extraction complete: {}/{} pages, {} chars, {}ms total",
        total_pages - stats.failed_pages,
        total_pages,
        text.len(),
        stats.total_duration_ms
    );

    Ok(ExtractionOutput {
        text,
        page_count: total_pages,
        pages,
        stats,
    })
}

struct PageDone {
    surface: RasterSurface,
    recognition: Recognition,
    render_ms: u64,
    ocr_ms: u64,
}

async fn process_page(
    document: &mut dyn OpenDocument,
    recognizer: &dyn Recognizer,
    index: usize,
    surface: RasterSurface,
    config: &OcrConfig,
    options: &RecognizeOptions,
    progress: &ProgressReporter,
) -> Result<PageDone, StageError> {
    let page_num = index + 1;

    let render_start = Instant::now();
    let surface = document.render_page(index, config.scale, surface).await?;
    let render_ms = render_start.elapsed().as_millis() as u64;

    let ocr_start = Instant::now();
    let image = encode::encode_page(&surface).map_err(|e| StageError::Encode {
        page: page_num,
        detail: e.to_string(),
    })?;

    progress.report(ProgressEvent::OcrStarted { page: page_num });
    let on_progress =
        |fraction: f32| progress.report(ProgressEvent::ocr_progress(page_num, fraction));
    let recognition = recognizer
        .recognize(page_num, image, options, &on_progress)
        .await?;
    let ocr_ms = ocr_start.elapsed().as_millis() as u64;
    debug!(
        "Page {}: {} chars in {}ms render + {}ms OCR",
        page_num,
        recognition.text.len(),
        render_ms,
        ocr_ms
    );

    Ok(PageDone {
        surface,
        recognition,
        render_ms,
        ocr_ms,
    })
}
