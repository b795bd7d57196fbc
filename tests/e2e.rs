//! End-to-end integration tests for medguide-ocr.
//!
//! These tests drive the real pdfium library and tesseract binary against a
//! sample guide. They are gated behind the `E2E_ENABLED` environment
//! variable so they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/opt/pdfium/lib \
//!   E2E_SAMPLE_PDF=test_cases/guide.pdf cargo test --test e2e -- --nocapture
//!
//! `E2E_EXPECT_TEXT` optionally names a phrase the extracted text must contain.

use medguide_ocr::{
    extract, extract_text_from_pdf, extract_to_file, GuideFile, OcrConfig, ProgressReporter,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn sample_pdf() -> PathBuf {
    std::env::var_os("E2E_SAMPLE_PDF")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/guide.pdf"))
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            println!("       Set E2E_SAMPLE_PDF to a scanned PDF guide");
            return;
        }
        p
    }};
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_extract_sample_guide() {
    let path = e2e_skip_unless_ready!(sample_pdf());
    let file = GuideFile::from_path(&path).await.unwrap();

    let messages = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = Arc::clone(&messages);
    let progress = ProgressReporter::from_fn(move |m: &str| {
        println!("  {m}");
        sink.lock().unwrap().push(m.to_string());
    });

    let text = extract_text_from_pdf(&file, &progress).await.unwrap();
    println!("--- extracted {} chars ---\n{}", text.len(), text);

    assert!(!text.is_empty(), "no text recognised");
    assert_eq!(text, text.trim());
    if let Ok(expected) = std::env::var("E2E_EXPECT_TEXT") {
        assert!(text.contains(&expected), "missing expected phrase {expected:?}");
    }

    let messages = messages.lock().unwrap();
    assert_eq!(messages.first().map(String::as_str), Some("Loading OCR libraries..."));
    assert_eq!(messages.last().map(String::as_str), Some("✅ OCR complete!"));
}

#[tokio::test]
async fn test_page_markers_match_page_count() {
    let path = e2e_skip_unless_ready!(sample_pdf());
    let file = GuideFile::from_path(&path).await.unwrap();

    let out = extract(&file, &OcrConfig::default(), &ProgressReporter::noop())
        .await
        .unwrap();

    assert_eq!(out.pages.len(), out.page_count);
    let markers = out.text.matches("\n\n===== Page ").count();
    assert_eq!(markers, out.page_count - 1);
    println!(
        "{} pages, render {}ms, ocr {}ms",
        out.page_count, out.stats.render_duration_ms, out.stats.ocr_duration_ms
    );
}

#[tokio::test]
async fn test_extract_to_file() {
    let path = e2e_skip_unless_ready!(sample_pdf());
    let file = GuideFile::from_path(&path).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("guide.txt");

    let stats = extract_to_file(&file, &out_path, &OcrConfig::default(), &ProgressReporter::noop())
        .await
        .unwrap();

    let written = std::fs::read_to_string(&out_path).unwrap();
    assert!(!written.is_empty());
    assert_eq!(stats.failed_pages, 0);
}

#[tokio::test]
async fn test_corrupt_pdf_fails_with_prefix() {
    let _ = e2e_skip_unless_ready!(sample_pdf());
    let bytes = b"%PDF-1.7\nthis is not a pdf".to_vec();
    let file = GuideFile::from_bytes(bytes, Some("application/pdf"));

    let err = extract_text_from_pdf(&file, &ProgressReporter::noop())
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("OCR failed"), "got: {err}");
}
