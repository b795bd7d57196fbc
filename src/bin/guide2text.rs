//! CLI binary for medguide-ocr.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `OcrConfig` and prints the extracted text.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use medguide_ocr::pipeline::input::resolve_input;
use medguide_ocr::{
    extract, file_size, write_text_atomic, OcrConfig, PageFailurePolicy, ProgressEvent,
    ProgressReporter, RENDER_SCALE,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress display using indicatif ─────────────────────────────────────

/// Spinner while engines load and the document opens, then a page bar.
fn progress_reporter(bar: ProgressBar) -> ProgressReporter {
    let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS);
    bar.set_style(spinner_style);
    bar.set_prefix("Preparing");
    bar.enable_steady_tick(Duration::from_millis(80));

    ProgressReporter::from_event_fn(move |event: &ProgressEvent| match event {
        ProgressEvent::DocumentOpened { pages } => {
            let page_style = ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} pages  \
                 ⏱ {elapsed_precise}  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS);
            bar.set_length(*pages as u64);
            bar.set_style(page_style);
            bar.set_prefix("Recognising");
            bar.set_message(event.to_string());
        }
        ProgressEvent::PageStarted { page, .. } => {
            bar.set_position(*page as u64 - 1);
            bar.set_message(event.to_string());
        }
        ProgressEvent::Complete => {
            if let Some(len) = bar.length() {
                bar.set_position(len);
            }
            bar.finish_and_clear();
        }
        other => bar.set_message(other.to_string()),
    })
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract to stdout
  guide2text guide.pdf

  # Extract to file
  guide2text guide.pdf -o guide.txt

  # Download and extract
  guide2text https://example.com/leaflets/amoxicillin.pdf

  # Bilingual leaflet, keep going past unreadable pages
  guide2text --lang eng+fra --skip-failed-pages leaflet.pdf

  # JSON output with per-page results
  guide2text --json guide.pdf > guide.json

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  TESSERACT_PATH          Path to the tesseract binary
  RUST_LOG                Override the log filter (e.g. medguide_ocr=debug)

SETUP:
  1. Install tesseract with English data:  apt install tesseract-ocr
  2. Make libpdfium available:             export PDFIUM_LIB_PATH=/opt/pdfium/lib
  3. Extract:                              guide2text guide.pdf
"#;

/// Extract text from scanned PDF medicine guides with pdfium + Tesseract.
#[derive(Parser, Debug)]
#[command(
    name = "guide2text",
    version,
    about = "Extract text from scanned PDF medicine guides with OCR",
    long_about = "Rasterise every page of a PDF (local file or URL) with pdfium, recognise it \
with Tesseract and print the text in page order, with a marker between pages.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write text to this file instead of stdout.
    #[arg(short, long, env = "GUIDE2TEXT_OUTPUT")]
    output: Option<PathBuf>,

    /// Tesseract language code(s), e.g. eng or eng+fra.
    #[arg(long, env = "GUIDE2TEXT_LANG", default_value = "eng")]
    lang: String,

    /// Page rasterisation scale (0.5–4.0).
    #[arg(long, env = "GUIDE2TEXT_SCALE", default_value_t = RENDER_SCALE)]
    scale: f32,

    /// Tesseract page segmentation mode (0–13).
    #[arg(long, env = "GUIDE2TEXT_PSM",
          value_parser = clap::value_parser!(u8).range(0..=13))]
    psm: Option<u8>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "GUIDE2TEXT_PASSWORD")]
    password: Option<String>,

    /// Path to the tesseract binary.
    #[arg(long, env = "GUIDE2TEXT_TESSERACT")]
    tesseract: Option<PathBuf>,

    /// Directory containing *.traineddata files.
    #[arg(long, env = "GUIDE2TEXT_TESSDATA_DIR")]
    tessdata_dir: Option<PathBuf>,

    /// Path to libpdfium (file or containing directory).
    #[arg(long, env = "GUIDE2TEXT_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Continue past pages that fail; they contribute empty text.
    #[arg(long, env = "GUIDE2TEXT_SKIP_FAILED_PAGES")]
    skip_failed_pages: bool,

    /// Output structured JSON (ExtractionOutput) instead of plain text.
    #[arg(long, env = "GUIDE2TEXT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "GUIDE2TEXT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "GUIDE2TEXT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "GUIDE2TEXT_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "GUIDE2TEXT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config and resolve input ───────────────────────────────────
    let config = build_config(&cli)?;
    let file = resolve_input(&cli.input, config.download_timeout_secs)
        .await
        .with_context(|| format!("Failed to open input '{}'", cli.input))?;

    if !cli.quiet && !cli.json {
        eprintln!(
            "{} {}  {}",
            bold("◆"),
            file.name().unwrap_or(&cli.input),
            dim(&file_size(&file))
        );
    }

    let (bar, progress) = if show_progress {
        let bar = ProgressBar::new(0);
        (bar.clone(), progress_reporter(bar))
    } else {
        (ProgressBar::hidden(), ProgressReporter::noop())
    };

    // ── Run extraction ───────────────────────────────────────────────────
    let result = extract(&file, &config, &progress).await;
    bar.finish_and_clear();
    let output = result.context("Extraction failed")?;

    if let Some(ref output_path) = cli.output {
        write_text_atomic(output_path, &output.text)
            .await
            .context("Failed to write output")?;
    } else if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.text.as_bytes())
            .context("Failed to write to stdout")?;
        if !output.text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    // ── Summary ──────────────────────────────────────────────────────────
    if !cli.quiet && !cli.json {
        let stats = &output.stats;
        let done = output.page_count - stats.failed_pages;
        let tick = if stats.failed_pages == 0 {
            green("✔")
        } else {
            yellow("⚠")
        };
        let target = cli
            .output
            .as_ref()
            .map(|p| format!("  →  {}", bold(&p.display().to_string())))
            .unwrap_or_default();
        eprintln!(
            "{tick}  {done}/{} pages  {}{target}",
            output.page_count,
            dim(&format!("{}ms", stats.total_duration_ms)),
        );
        for page in output.pages.iter().filter(|p| p.is_failed()) {
            eprintln!(
                "   {} page {}: {}",
                yellow("skipped"),
                page.page_num,
                page.error.as_deref().unwrap_or_default()
            );
        }
    }

    Ok(())
}

/// Map CLI args to `OcrConfig`.
fn build_config(cli: &Cli) -> Result<OcrConfig> {
    let policy = if cli.skip_failed_pages {
        PageFailurePolicy::Skip
    } else {
        PageFailurePolicy::Abort
    };

    let mut builder = OcrConfig::builder()
        .scale(cli.scale)
        .language(cli.lang.clone())
        .page_failure(policy)
        .download_timeout_secs(cli.download_timeout);

    if let Some(psm) = cli.psm {
        builder = builder.psm(psm);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref path) = cli.tesseract {
        builder = builder.tesseract_path(path.clone());
    }
    if let Some(ref dir) = cli.tessdata_dir {
        builder = builder.tessdata_dir(dir.clone());
    }
    if let Some(ref path) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(path.clone());
    }

    builder.build().context("Invalid configuration")
}
