//! # medguide-ocr
//!
//! Extract the text of scanned PDF medicine guides with OCR.
//!
//! Patient leaflets and dosage guides are often distributed as scans: the
//! PDF holds page images, not text, so text extraction tools return nothing.
//! This crate rasterises each page with pdfium, recognises it with
//! Tesseract, and joins the page texts in order into one plain-text document
//! while reporting progress a UI can display.
//!
//! ## Pipeline Overview
//!
//! ```text
//! GuideFile (application/pdf)
//!  │
//!  ├─ 1. Load    pdfium + tesseract, once per process
//!  ├─ 2. Open    read the bytes, open the document, count pages
//!  ├─ 3. Render  page i → the single reusable RasterSurface (scale 2×)
//!  ├─ 4. OCR     PNG → tesseract → page text
//!  └─ 5. Join    "===== Page N =====" markers, trimmed
//! ```
//!
//! Pages are processed strictly one after another. Any failure ends the run
//! with a single [`OcrError`] whose message starts with `"OCR failed"`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use medguide_ocr::{extract_text_from_pdf, is_pdf, GuideFile, ProgressReporter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let file = GuideFile::from_path("amoxicillin-guide.pdf").await?;
//!     assert!(is_pdf(&file));
//!
//!     let progress = ProgressReporter::from_fn(|msg: &str| eprintln!("{msg}"));
//!     let text = extract_text_from_pdf(&file, &progress).await?;
//!     println!("{text}");
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `guide2text` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! medguide-ocr = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime Requirements
//!
//! | Engine | Located via |
//! |--------|-------------|
//! | pdfium | `OcrConfig::pdfium_lib_path`, `PDFIUM_LIB_PATH`, `./libpdfium.*`, system library |
//! | tesseract | `OcrConfig::tesseract_path`, `TESSERACT_PATH`, `tesseract` on `PATH` |
//!
//! The configured language's `.traineddata` must be installed.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod file;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{OcrConfig, OcrConfigBuilder, PageFailurePolicy, DEFAULT_LANGUAGE, RENDER_SCALE};
pub use engine::{EngineKind, Engines, NativeEngines};
pub use error::{OcrError, StageError};
pub use extract::{extract, extract_text_from_pdf, extract_to_file, extract_with, write_text_atomic};
pub use file::{file_size, format_file_size, is_pdf, GuideFile};
pub use output::{ExtractionOutput, ExtractionStats, PageText};
pub use pipeline::assemble::{assemble, page_marker};
pub use progress::{ProgressEvent, ProgressReporter};
pub use stream::{extract_stream, extract_stream_with, ExtractionEvent, ExtractionStream};
