//! Progress reporting for the extraction pipeline.
//!
//! Every stage emits a [`ProgressEvent`]. Its `Display` form is the
//! human-readable status string shown by the uploading UI ("Processing page
//! 2 of 3...", "OCR progress page 2: 40%", …).
//!
//! A [`ProgressReporter`] delivers events synchronously to a caller-supplied
//! sink. Delivery is fire-and-forget: the pipeline never waits on the sink
//! and never inspects what it does, so the sink must return quickly and must
//! not panic. For consumers that live on another task,
//! [`ProgressReporter::channel`] forwards events over an unbounded channel so
//! the producer can never block.
//!
//! # Example
//!
//! ```rust
//! use medguide_ocr::ProgressReporter;
//!
//! let reporter = ProgressReporter::from_fn(|msg: &str| eprintln!("{msg}"));
//! # let _ = reporter;
//! ```

use crate::engine::EngineKind;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

/// One status update emitted by the pipeline.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Engine loading begins.
    LoadingLibraries,
    /// One engine is being loaded (or fetched from the cache).
    LoadingEngine { engine: EngineKind },
    /// The input file is being read into memory.
    ReadingFile,
    /// The bytes are being opened as a PDF.
    OpeningDocument,
    /// The document is open and its page count is known.
    DocumentOpened { pages: usize },
    /// A page is about to be rendered.
    PageStarted { page: usize, total: usize },
    /// The rendered page is being handed to the recogniser.
    OcrStarted { page: usize },
    /// Sub-page recognition progress for the current page, 0–100.
    OcrProgress { page: usize, percent: u8 },
    /// All pages have been processed.
    Complete,
}

impl ProgressEvent {
    /// Build an `OcrProgress` event from a normalised fraction.
    ///
    /// Out-of-range and NaN fractions are clamped into `[0, 1]`.
    pub fn ocr_progress(page: usize, fraction: f32) -> Self {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        ProgressEvent::OcrProgress {
            page,
            percent: (fraction * 100.0).round() as u8,
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::LoadingLibraries => write!(f, "Loading OCR libraries..."),
            ProgressEvent::LoadingEngine { engine } => write!(f, "Loading {engine}..."),
            ProgressEvent::ReadingFile => write!(f, "Reading PDF file..."),
            ProgressEvent::OpeningDocument => write!(f, "Loading PDF document..."),
            ProgressEvent::DocumentOpened { pages } => {
                write!(f, "PDF loaded: {pages} page(s). Starting OCR...")
            }
            ProgressEvent::PageStarted { page, total } => {
                write!(f, "Processing page {page} of {total}...")
            }
            ProgressEvent::OcrStarted { page } => write!(f, "Running OCR on page {page}..."),
            ProgressEvent::OcrProgress { page, percent } => {
                write!(f, "OCR progress page {page}: {percent}%")
            }
            ProgressEvent::Complete => write!(f, "✅ OCR complete!"),
        }
    }
}

type Sink = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Delivers progress events to an optional caller-supplied sink.
///
/// Cheap to clone; the default reporter discards everything.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    sink: Option<Sink>,
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("sink", &self.sink.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl ProgressReporter {
    /// A reporter that discards every event.
    pub fn noop() -> Self {
        Self::default()
    }

    /// Receive each event's human-readable message.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            sink: Some(Arc::new(move |event: &ProgressEvent| f(&event.to_string()))),
        }
    }

    /// Receive the typed events.
    pub fn from_event_fn<F>(f: F) -> Self
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        Self {
            sink: Some(Arc::new(f)),
        }
    }

    /// A reporter whose events are forwarded to the returned stream.
    ///
    /// Sending never blocks. Events sent after the stream is dropped are
    /// discarded.
    pub fn channel() -> (Self, UnboundedReceiverStream<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = Self::from_event_fn(move |event: &ProgressEvent| {
            let _ = tx.send(event.clone());
        });
        (reporter, UnboundedReceiverStream::new(rx))
    }

    /// Emit one event.
    pub fn report(&self, event: ProgressEvent) {
        debug!("{}", event);
        if let Some(ref sink) = self.sink {
            sink(&event);
        }
    }
}
