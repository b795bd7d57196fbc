//! Streaming extraction API: progress events and the result on one stream.
//!
//! A run over a long guide takes a while, and the uploading UI wants the
//! status line to move. [`extract_stream`] spawns the extraction on the Tokio
//! runtime and yields every [`ProgressEvent`] as it happens, followed by
//! exactly one [`ExtractionEvent::Finished`] carrying the outcome.
//!
//! Dropping the stream does not cancel the spawned run; its remaining
//! progress events are discarded.

use crate::config::OcrConfig;
use crate::engine::{Engines, NativeEngines};
use crate::error::{OcrError, StageError};
use crate::extract::extract_with;
use crate::file::GuideFile;
use crate::output::ExtractionOutput;
use crate::progress::{ProgressEvent, ProgressReporter};
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// One item of an extraction stream.
#[derive(Debug)]
pub enum ExtractionEvent {
    Progress(ProgressEvent),
    /// Always the last item.
    Finished(Result<ExtractionOutput, OcrError>),
}

/// A boxed stream of extraction events.
pub type ExtractionStream = Pin<Box<dyn Stream<Item = ExtractionEvent> + Send>>;

/// Extract with the native engines, streaming progress as it happens.
///
/// Must be called from within a Tokio runtime.
///
/// # Example
/// ```rust,no_run
/// use futures::StreamExt;
/// use medguide_ocr::{extract_stream, ExtractionEvent, GuideFile, OcrConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let file = GuideFile::from_path("guide.pdf").await?;
/// let mut events = extract_stream(file, OcrConfig::default());
/// while let Some(event) = events.next().await {
///     match event {
///         ExtractionEvent::Progress(p) => eprintln!("{p}"),
///         ExtractionEvent::Finished(result) => println!("{}", result?.text),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub fn extract_stream(file: GuideFile, config: OcrConfig) -> ExtractionStream {
    let engines = Arc::new(NativeEngines::new(&config));
    extract_stream_with(engines, file, config)
}

/// Streaming extraction with caller-supplied engines.
pub fn extract_stream_with(
    engines: Arc<dyn Engines>,
    file: GuideFile,
    config: OcrConfig,
) -> ExtractionStream {
    info!("Starting streaming extraction");
    let (reporter, events) = ProgressReporter::channel();

    let handle = tokio::spawn(async move {
        // The progress channel closes when `reporter` drops with this task.
        extract_with(engines.as_ref(), &file, &config, &reporter).await
    });

    let finished = stream::once(async move {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(OcrError::from(StageError::Internal(format!(
                "extraction task failed: {e}"
            )))),
        };
        ExtractionEvent::Finished(result)
    });

    Box::pin(events.map(ExtractionEvent::Progress).chain(finished))
}
