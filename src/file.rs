//! The uploaded guide file and its pre-flight helpers.
//!
//! A [`GuideFile`] is an opaque blob plus the content type the uploader
//! declared for it. Contents either live in memory already or on disk, in
//! which case the pipeline reads them fully into memory once, during its
//! "Reading PDF file..." stage.

use crate::error::StageError;
use std::path::{Path, PathBuf};

/// The PDF media type accepted by [`is_pdf`].
pub const PDF_MIME: &str = "application/pdf";

/// Where the file's bytes live.
#[derive(Debug, Clone)]
enum Contents {
    Memory(Vec<u8>),
    Disk(PathBuf),
}

/// An uploaded file with a declared content type.
#[derive(Debug, Clone)]
pub struct GuideFile {
    contents: Contents,
    content_type: Option<String>,
    name: Option<String>,
    size: u64,
}

impl GuideFile {
    /// Wrap in-memory bytes with a declared content type.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>, content_type: Option<&str>) -> Self {
        let bytes = bytes.into();
        Self {
            size: bytes.len() as u64,
            contents: Contents::Memory(bytes),
            content_type: content_type.map(str::to_string),
            name: None,
        }
    }

    /// Reference a file on disk. The content type is inferred from the
    /// extension, then from the `%PDF` magic bytes.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, StageError> {
        let path = path.as_ref().to_path_buf();
        let meta = tokio::fs::metadata(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StageError::FileNotFound { path: path.clone() }
            } else {
                StageError::ReadFailed {
                    path: path.clone(),
                    source: e,
                }
            }
        })?;
        if !meta.is_file() {
            return Err(StageError::FileNotFound { path });
        }

        let content_type = match sniff_extension(&path) {
            Some(ct) => Some(ct.to_string()),
            None => sniff_magic(&path).await.map(str::to_string),
        };

        Ok(Self {
            name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
            size: meta.len(),
            contents: Contents::Disk(path),
            content_type,
        })
    }

    /// Override the declared content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Attach a display name (the original upload's filename).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Size in bytes.
    pub fn len(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Read the full contents into memory.
    pub async fn read_all(&self) -> Result<Vec<u8>, StageError> {
        match &self.contents {
            Contents::Memory(bytes) => Ok(bytes.clone()),
            Contents::Disk(path) => {
                tokio::fs::read(path)
                    .await
                    .map_err(|source| StageError::ReadFailed {
                        path: path.clone(),
                        source,
                    })
            }
        }
    }
}

/// True iff the file's declared content type is exactly `application/pdf`.
pub fn is_pdf(file: &GuideFile) -> bool {
    file.content_type() == Some(PDF_MIME)
}

/// Human-readable size of `file`, e.g. `"12.34 KB"`.
pub fn file_size(file: &GuideFile) -> String {
    format_file_size(file.len())
}

/// Format a byte count using base-1024 units.
///
/// At most two decimals are shown and trailing zeros are dropped:
/// `0 → "0 Bytes"`, `1536 → "1.5 KB"`, `1048576 → "1 MB"`. Values of a
/// terabyte or more stay in GB.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut exp = 0usize;
    let mut threshold = 1024u64;
    while exp + 1 < UNITS.len() && bytes >= threshold {
        exp += 1;
        threshold = threshold.saturating_mul(1024);
    }

    let value = bytes as f64 / 1024f64.powi(exp as i32);
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[exp])
}

fn sniff_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(PDF_MIME),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}

async fn sniff_magic(path: &Path) -> Option<&'static str> {
    use tokio::io::AsyncReadExt;

    let mut f = tokio::fs::File::open(path).await.ok()?;
    let mut magic = [0u8; 4];
    f.read_exact(&mut magic).await.ok()?;
    (&magic == b"%PDF").then_some(PDF_MIME)
}
