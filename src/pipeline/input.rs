//! Input resolution: turn a user-supplied path or URL into a [`GuideFile`].
//!
//! Local files keep their bytes on disk until the pipeline reads them; the
//! content type comes from the extension or the `%PDF` magic bytes. URLs are
//! downloaded into memory and take their content type from the response's
//! `Content-Type` header, so the pipeline's `is_pdf` check sees what the
//! server declared.

use crate::error::StageError;
use crate::file::{GuideFile, PDF_MIME};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a [`GuideFile`].
///
/// If the input is a URL, download it with the given timeout. Otherwise
/// treat it as a local path, which must exist.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<GuideFile, StageError> {
    if input.trim().is_empty() {
        return Err(StageError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else if input.contains("://") {
        Err(StageError::InvalidInput {
            input: input.to_string(),
        })
    } else {
        let file = GuideFile::from_path(PathBuf::from(input)).await?;
        debug!(
            "Resolved local file: {} ({:?})",
            input,
            file.content_type()
        );
        Ok(file)
    }
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<GuideFile, StageError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| StageError::DownloadFailed {
        url: url.to_string(),
        reason,
    };
    let classify = |e: reqwest::Error| {
        if e.is_timeout() {
            StageError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(classify)?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(media_type);
    let filename = extract_filename(url);

    let bytes = response.bytes().await.map_err(classify)?;
    info!("Downloaded {} bytes", bytes.len());

    let file = GuideFile::from_bytes(bytes.to_vec(), content_type.as_deref());
    let file = match filename {
        Some(name) => file.with_name(name),
        None => file,
    };
    Ok(file)
}

/// Strip parameters from a `Content-Type` value and normalise the case:
/// `"Application/PDF; charset=binary"` → `"application/pdf"`.
fn media_type(header: &str) -> String {
    let essence = header.split(';').next().unwrap_or(header).trim();
    if essence.eq_ignore_ascii_case(PDF_MIME) {
        PDF_MIME.to_string()
    } else {
        essence.to_string()
    }
}

/// Last path segment of the URL when it looks like a filename.
fn extract_filename(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    (!last.is_empty() && last.contains('.')).then(|| last.to_string())
}
