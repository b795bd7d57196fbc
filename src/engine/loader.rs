//! Lazy, load-once engine initialisation.
//!
//! Binding pdfium and probing the tesseract install are comparatively slow
//! and only need to happen once per process. [`EngineSlot`] is a load-once
//! async cell: the first caller runs the initialiser, concurrent first
//! callers await that same in-flight initialisation, and every later caller
//! gets the cached `Arc` back without re-running it. A failed initialiser
//! leaves the slot empty; the pipeline treats the error as fatal and does not
//! retry, but a later run will try again.
//!
//! [`EngineCache`] keeps one slot per engine location, so runs configured
//! with different library paths or tessdata directories each get their own
//! engine while runs sharing a location share one load. [`NativeEngines`]
//! backs the process-wide caches with the pdfium and tesseract adapters and
//! checks each run's language against the cached engine before any page is
//! rendered.

use super::pdfium::{LibrarySource, PdfiumRasterizer};
use super::tesseract::{TesseractLocation, TesseractRecognizer};
use super::{Engines, Rasterizer, Recognizer};
use crate::config::OcrConfig;
use crate::error::StageError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// A load-once cell holding one engine handle.
pub struct EngineSlot<T: ?Sized> {
    cell: OnceCell<Arc<T>>,
}

impl<T: ?Sized> EngineSlot<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    /// Return the cached engine, running `init` first if nothing is cached.
    pub async fn ensure<F, Fut>(&self, init: F) -> Result<Arc<T>, StageError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<T>, StageError>>,
    {
        if let Some(engine) = self.cell.get() {
            debug!("engine cache hit");
            return Ok(Arc::clone(engine));
        }
        self.cell.get_or_try_init(init).await.map(Arc::clone)
    }

    /// True once an engine has been loaded into this slot.
    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}

impl<T: ?Sized> Default for EngineSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Load-once slots keyed by where the engine is loaded from.
pub struct EngineCache<K, T: ?Sized> {
    slots: Mutex<HashMap<K, Arc<EngineSlot<T>>>>,
}

impl<K: Eq + Hash, T: ?Sized> EngineCache<K, T> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// The slot for `key`, created empty on first use.
    pub fn slot(&self, key: K) -> Arc<EngineSlot<T>> {
        let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(slots.entry(key).or_default())
    }
}

impl<K: Eq + Hash, T: ?Sized> Default for EngineCache<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

static PDF_RENDERERS: Lazy<EngineCache<LibrarySource, PdfiumRasterizer>> =
    Lazy::new(EngineCache::new);
static OCR_ENGINES: Lazy<EngineCache<TesseractLocation, TesseractRecognizer>> =
    Lazy::new(EngineCache::new);

/// The production engines: pdfium for rendering, tesseract for OCR.
#[derive(Debug, Clone, Default)]
pub struct NativeEngines {
    config: OcrConfig,
}

impl NativeEngines {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl Engines for NativeEngines {
    async fn rasterizer(&self) -> Result<Arc<dyn Rasterizer>, StageError> {
        let source = LibrarySource::locate(&self.config);
        let engine = PDF_RENDERERS
            .slot(source.clone())
            .ensure(|| async {
                let engine = PdfiumRasterizer::load(source).await?;
                info!("pdfium bound from {}", engine.source());
                Ok::<_, StageError>(Arc::new(engine))
            })
            .await?;
        Ok(engine)
    }

    async fn recognizer(&self) -> Result<Arc<dyn Recognizer>, StageError> {
        let engine = load_recognizer(&OCR_ENGINES, &self.config).await?;
        Ok(engine)
    }
}

async fn load_recognizer(
    cache: &EngineCache<TesseractLocation, TesseractRecognizer>,
    config: &OcrConfig,
) -> Result<Arc<TesseractRecognizer>, StageError> {
    let location = TesseractLocation::locate(config);
    let engine = cache
        .slot(location.clone())
        .ensure(|| async {
            let engine = TesseractRecognizer::load(location).await?;
            info!("tesseract {} ready", engine.version());
            Ok::<_, StageError>(Arc::new(engine))
        })
        .await?;
    engine.require_languages(&config.language)?;
    Ok(engine)
}
