//! PDF rasterisation via pdfium.
//!
//! ## Why a dedicated worker?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is blocking and keeps
//! per-document state that must stay on the thread that opened it. Each
//! opened document therefore gets one `spawn_blocking` worker that owns the
//! `PdfDocument` for its whole lifetime and serves render requests over a
//! channel. The async side only ever sees page counts and filled
//! [`RasterSurface`]s, and never stalls a Tokio worker thread on rendering.
//!
//! The `Pdfium` bindings are not `Send`, so they never leave that worker
//! either: loading the engine only resolves where the library lives and
//! proves it binds, and each worker binds its own instance from that
//! [`LibrarySource`].
//!
//! The worker exits as soon as the [`OpenDocument`] handle is dropped.

use super::{EngineKind, OpenDocument, Rasterizer};
use crate::config::OcrConfig;
use crate::error::StageError;
use crate::pipeline::raster::RasterSurface;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

#[cfg(target_os = "macos")]
const PLATFORM_LIB_NAME: &str = "libpdfium.dylib";
#[cfg(target_os = "windows")]
const PLATFORM_LIB_NAME: &str = "pdfium.dll";
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const PLATFORM_LIB_NAME: &str = "libpdfium.so";

/// Where the pdfium library is bound from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LibrarySource {
    File(PathBuf),
    System,
}

impl LibrarySource {
    /// Resolution order: `config.pdfium_lib_path`, `PDFIUM_LIB_PATH`, a
    /// library next to the working directory, the system library. A path may
    /// name the library file itself or the directory containing it.
    pub fn locate(config: &OcrConfig) -> Self {
        let explicit = config
            .pdfium_lib_path
            .clone()
            .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

        match explicit {
            Some(path) => LibrarySource::File(library_file(&path)),
            None => {
                let local = library_file(Path::new("."));
                if local.exists() {
                    LibrarySource::File(local)
                } else {
                    LibrarySource::System
                }
            }
        }
    }
}

impl fmt::Display for LibrarySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibrarySource::File(path) => write!(f, "{}", path.display()),
            LibrarySource::System => write!(f, "system library"),
        }
    }
}

/// A verified pdfium library location.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    source: LibrarySource,
}

impl PdfiumRasterizer {
    /// Check that `source` binds, on a blocking thread.
    pub async fn load(source: LibrarySource) -> Result<Self, StageError> {
        let probe = source.clone();
        tokio::task::spawn_blocking(move || bind(&probe).map(drop))
            .await
            .map_err(|e| StageError::Internal(format!("pdfium bind task panicked: {e}")))??;

        Ok(Self { source })
    }

    pub fn source(&self) -> &LibrarySource {
        &self.source
    }
}

fn bind(source: &LibrarySource) -> Result<Pdfium, StageError> {
    let bindings = match source {
        LibrarySource::File(lib) => {
            debug!("binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(lib)
                .map_err(|e| load_error(format!("'{}': {:?}", lib.display(), e)))?
        }
        LibrarySource::System => Pdfium::bind_to_system_library().map_err(|e| {
            load_error(format!(
                "system library not found ({:?}); set PDFIUM_LIB_PATH to libpdfium",
                e
            ))
        })?,
    };
    Ok(Pdfium::new(bindings))
}

/// A directory resolves to the platform library inside it.
fn library_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(PLATFORM_LIB_NAME)
    } else {
        path.to_path_buf()
    }
}

fn load_error(reason: String) -> StageError {
    StageError::EngineLoad {
        engine: EngineKind::PdfRenderer,
        reason,
    }
}

/// Missing or wrong passwords get their own error; everything else is a
/// generic open failure.
fn classify_open_error(error: &PdfiumError) -> StageError {
    match error {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            StageError::PasswordRequired
        }
        other => StageError::DocumentOpen {
            detail: format!("{:?}", other),
        },
    }
}

#[async_trait]
impl Rasterizer for PdfiumRasterizer {
    async fn open(
        &self,
        bytes: Vec<u8>,
        password: Option<String>,
    ) -> Result<Box<dyn OpenDocument>, StageError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (req_tx, req_rx) = mpsc::channel(1);
        let source = self.source.clone();

        tokio::task::spawn_blocking(move || match bind(&source) {
            Ok(pdfium) => serve_document(&pdfium, bytes, password, ready_tx, req_rx),
            Err(e) => {
                let _ = ready_tx.send(Err(e));
            }
        });

        let page_count = ready_rx.await.map_err(|_| {
            StageError::Internal("pdfium worker exited before opening the document".into())
        })??;
        info!("PDF loaded: {} pages", page_count);

        Ok(Box::new(PdfiumDocument {
            page_count,
            requests: req_tx,
        }))
    }
}

struct RenderRequest {
    index: usize,
    scale: f32,
    surface: RasterSurface,
    reply: oneshot::Sender<Result<RasterSurface, StageError>>,
}

/// Async handle to a document owned by its pdfium worker.
struct PdfiumDocument {
    page_count: usize,
    requests: mpsc::Sender<RenderRequest>,
}

#[async_trait]
impl OpenDocument for PdfiumDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    async fn render_page(
        &mut self,
        index: usize,
        scale: f32,
        surface: RasterSurface,
    ) -> Result<RasterSurface, StageError> {
        let gone = || StageError::Render {
            page: index + 1,
            detail: "pdfium worker is no longer running".into(),
        };

        let (reply, response) = oneshot::channel();
        self.requests
            .send(RenderRequest {
                index,
                scale,
                surface,
                reply,
            })
            .await
            .map_err(|_| gone())?;
        response.await.map_err(|_| gone())?
    }
}

/// Worker body: open the document with this thread's `pdfium`, report its
/// page count, then render on request until the handle is dropped.
fn serve_document(
    pdfium: &Pdfium,
    bytes: Vec<u8>,
    password: Option<String>,
    ready: oneshot::Sender<Result<usize, StageError>>,
    mut requests: mpsc::Receiver<RenderRequest>,
) {
    let document = match pdfium.load_pdf_from_byte_vec(bytes, password.as_deref()) {
        Ok(doc) => doc,
        Err(e) => {
            let _ = ready.send(Err(classify_open_error(&e)));
            return;
        }
    };

    let page_count = document.pages().len() as usize;
    if page_count == 0 {
        let _ = ready.send(Err(StageError::EmptyDocument));
        return;
    }
    if ready.send(Ok(page_count)).is_err() {
        return;
    }

    while let Some(req) = requests.blocking_recv() {
        let result = render_into(&document, req.index, req.scale, req.surface);
        let _ = req.reply.send(result);
    }
    debug!("pdfium worker finished");
}

fn render_into(
    document: &PdfDocument<'_>,
    index: usize,
    scale: f32,
    mut surface: RasterSurface,
) -> Result<RasterSurface, StageError> {
    let page_num = index + 1;
    let render_err = |detail: String| StageError::Render {
        page: page_num,
        detail,
    };

    let page_index = u16::try_from(index).map_err(|_| render_err("page index overflow".into()))?;
    let page = document
        .pages()
        .get(page_index)
        .map_err(|e| render_err(format!("{:?}", e)))?;

    let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| render_err(format!("{:?}", e)))?;

    // The bitmap and its RGBA copy are dropped when this call returns; only
    // the surface is carried to the next page.
    let image = bitmap.as_image().into_rgba8();
    surface.fill_rgba(image.width(), image.height(), image.as_raw());
    debug!(
        "Rendered page {} → {}x{} px",
        page_num,
        surface.width(),
        surface.height()
    );

    Ok(surface)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_resolves_to_platform_library() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(library_file(dir.path()), dir.path().join(PLATFORM_LIB_NAME));

        let file = dir.path().join("custom-pdfium.so");
        assert_eq!(library_file(&file), file);
    }

    #[test]
    fn password_failures_are_classified() {
        let wrong_password =
            PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError);
        assert!(matches!(
            classify_open_error(&wrong_password),
            StageError::PasswordRequired
        ));

        let corrupt = PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::FormatError);
        match classify_open_error(&corrupt) {
            StageError::DocumentOpen { detail } => {
                assert!(detail.contains("FormatError"), "got: {detail}")
            }
            other => panic!("expected an open error, got {other:?}"),
        }

        // Security handler failures are not password failures.
        let security = PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::SecurityError);
        assert!(matches!(
            classify_open_error(&security),
            StageError::DocumentOpen { .. }
        ));
    }

    #[test]
    fn explicit_path_is_resolved_without_probing() {
        let dir = tempfile::tempdir().unwrap();
        let config = OcrConfig::builder()
            .pdfium_lib_path(dir.path())
            .build()
            .unwrap();
        assert_eq!(
            LibrarySource::locate(&config),
            LibrarySource::File(dir.path().join(PLATFORM_LIB_NAME))
        );
    }

    #[test]
    fn rasterizer_can_be_shared_across_threads() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<PdfiumRasterizer>();
        assert_send_sync::<PdfiumDocument>();
    }

    #[tokio::test]
    async fn missing_library_is_load_error() {
        let source = LibrarySource::File(PathBuf::from("/nonexistent/libpdfium.so"));
        match PdfiumRasterizer::load(source).await {
            Err(StageError::EngineLoad { engine, .. }) => {
                assert_eq!(engine, EngineKind::PdfRenderer)
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("binding a missing library should fail"),
        }
    }

    /// Needs a real pdfium; skipped when none can be bound.
    #[tokio::test]
    async fn renders_generated_document_into_surface() {
        let source = LibrarySource::locate(&OcrConfig::default());
        let Ok(rasterizer) = PdfiumRasterizer::load(source.clone()).await else {
            println!("SKIP: pdfium not available ({source})");
            return;
        };

        let bytes = {
            let pdfium = bind(&source).unwrap();
            let mut doc = pdfium.create_new_pdf().unwrap();
            doc.pages_mut().create_page_at_end(PdfPagePaperSize::a4()).unwrap();
            doc.pages_mut().create_page_at_end(PdfPagePaperSize::a4()).unwrap();
            doc.save_to_bytes().unwrap()
        };

        let mut document = rasterizer.open(bytes, None).await.unwrap();
        assert_eq!(document.page_count(), 2);

        let surface = document.render_page(1, 1.0, RasterSurface::new()).await.unwrap();
        assert!(surface.width() > 0);
        assert!(surface.height() > surface.width(), "A4 is portrait");
        assert_eq!(
            surface.pixels().len(),
            surface.width() as usize * surface.height() as usize * 4
        );

        let err = document.render_page(5, 1.0, surface).await.unwrap_err();
        assert!(matches!(err, StageError::Render { page: 6, .. }));
    }

    #[tokio::test]
    async fn garbage_bytes_fail_to_open() {
        let source = LibrarySource::locate(&OcrConfig::default());
        let Ok(rasterizer) = PdfiumRasterizer::load(source).await else {
            println!("SKIP: pdfium not available");
            return;
        };
        let err = rasterizer
            .open(b"%PDF-1.7\nnot really".to_vec(), None)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, StageError::DocumentOpen { .. }));
    }
}
