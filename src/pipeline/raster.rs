//! The reusable page surface.
//!
//! One [`RasterSurface`] exists per extraction run. It is moved into the
//! rasteriser for each page, resized and overwritten there, and moved back.
//! It is the only page buffer that outlives a render call: the rasteriser's
//! own bitmap is allocated and freed per page inside the call, so at most one
//! page's pixels are held between pages and the surface's capacity is kept.

/// An RGBA8 pixel buffer.
#[derive(Debug, Clone, Default)]
pub struct RasterSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major RGBA8 pixels, `width * height * 4` bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Bytes currently reserved by the buffer.
    pub fn capacity(&self) -> usize {
        self.pixels.capacity()
    }

    /// Resize to `width × height` and clear to opaque white.
    pub fn resize(&mut self, width: u32, height: u32) {
        let len = width as usize * height as usize * 4;
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(len, 0xFF);
    }

    /// Overwrite the surface with `rgba` pixels of the given dimensions.
    ///
    /// A buffer shorter than `width * height * 4` leaves the remainder white.
    pub fn fill_rgba(&mut self, width: u32, height: u32, rgba: &[u8]) {
        self.resize(width, height);
        let n = rgba.len().min(self.pixels.len());
        self.pixels[..n].copy_from_slice(&rgba[..n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_overwrites_previous_page() {
        let mut s = RasterSurface::new();
        s.fill_rgba(4, 4, &[0u8; 64]);
        assert_eq!(s.pixels().len(), 64);
        assert!(s.pixels().iter().all(|&b| b == 0));

        s.fill_rgba(2, 1, &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!((s.width(), s.height()), (2, 1));
        assert_eq!(s.pixels(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn capacity_is_reused_when_shrinking() {
        let mut s = RasterSurface::new();
        s.resize(100, 100);
        let cap = s.capacity();
        s.resize(10, 10);
        assert_eq!(s.capacity(), cap);
        assert_eq!(s.pixels().len(), 400);
    }

    #[test]
    fn smaller_page_after_larger_keeps_allocation() {
        let mut s = RasterSurface::new();
        s.fill_rgba(50, 80, &[7u8; 50 * 80 * 4]);
        let cap = s.capacity();

        s.fill_rgba(40, 60, &[9u8; 40 * 60 * 4]);
        assert_eq!(s.capacity(), cap);
        assert_eq!(s.pixels().len(), 40 * 60 * 4);
        assert!(s.pixels().iter().all(|&b| b == 9));
    }

    #[test]
    fn short_input_leaves_white_tail() {
        let mut s = RasterSurface::new();
        s.fill_rgba(1, 2, &[0, 0, 0, 0]);
        assert_eq!(s.pixels(), &[0, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]);
    }
}
