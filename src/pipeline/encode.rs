//! Image encoding: [`RasterSurface`] → PNG [`PageImage`].
//!
//! PNG is lossless, so glyph edges reach the recogniser exactly as pdfium
//! rendered them. JPEG artefacts around small print degrade OCR accuracy.

use crate::pipeline::raster::RasterSurface;
use image::codecs::png::PngEncoder;
use image::error::{ParameterError, ParameterErrorKind};
use image::{ExtendedColorType, ImageEncoder, ImageError};
use tracing::debug;

/// A PNG snapshot of one rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    png: Vec<u8>,
    width: u32,
    height: u32,
}

impl PageImage {
    /// Wrap already-encoded PNG bytes.
    pub fn from_png(png: Vec<u8>, width: u32, height: u32) -> Self {
        Self { png, width, height }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.png
    }
}

/// Encode the current contents of `surface` as a PNG.
pub fn encode_page(surface: &RasterSurface) -> Result<PageImage, ImageError> {
    if surface.is_empty() {
        return Err(ImageError::Parameter(ParameterError::from_kind(
            ParameterErrorKind::DimensionMismatch,
        )));
    }

    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(
        surface.pixels(),
        surface.width(),
        surface.height(),
        ExtendedColorType::Rgba8,
    )?;
    debug!(
        "Encoded {}x{} surface → {} bytes PNG",
        surface.width(),
        surface.height(),
        buf.len()
    );

    Ok(PageImage::from_png(buf, surface.width(), surface.height()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_small_surface() {
        let mut surface = RasterSurface::new();
        surface.fill_rgba(10, 10, &[255, 0, 0, 255].repeat(100));

        let img = encode_page(&surface).expect("encode should succeed");
        assert_eq!((img.width(), img.height()), (10, 10));
        assert!(img.as_bytes().starts_with(&[0x89, b'P', b'N', b'G']));

        let decoded = image::load_from_memory(img.as_bytes()).expect("valid png");
        assert_eq!(decoded.width(), 10);
        assert_eq!(decoded.to_rgba8().get_pixel(3, 3).0, [255, 0, 0, 255]);
    }

    #[test]
    fn empty_surface_fails_to_encode() {
        assert!(encode_page(&RasterSurface::new()).is_err());
    }
}
