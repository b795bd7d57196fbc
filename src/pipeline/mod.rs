//! Pipeline stages for PDF-to-text extraction.
//!
//! Each submodule implements exactly one transformation step; the engines
//! that do the heavy lifting live in [`crate::engine`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ raster ──▶ encode ──▶ (recognizer) ──▶ assemble
//! (path/URL) (surface)   (PNG)      (tesseract)     (markers, trim)
//! ```
//!
//! 1. [`input`]: resolve a user-supplied path or URL to a `GuideFile`
//! 2. [`raster`]: the single reusable RGBA surface each page renders into
//! 3. [`encode`]: PNG-encode the surface for the recogniser
//! 4. [`assemble`]: join page texts with page markers and trim the result

pub mod assemble;
pub mod encode;
pub mod input;
pub mod raster;
