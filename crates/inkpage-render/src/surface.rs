//! Destination surface that tiles are composited onto.

use crate::renderer::{RenderError, RenderResult, TileBitmap};
use image::{Rgba, RgbaImage, imageops};
use kurbo::Size;
use std::sync::{Arc, Mutex, MutexGuard};

/// A surface shared between the engine and in-flight tile completions.
pub type SharedSurface = Arc<Mutex<Surface>>;

/// An RGBA pixel buffer sized to the scaled page.
#[derive(Debug, Clone)]
pub struct Surface {
    image: RgbaImage,
}

impl Surface {
    /// Create a transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    /// Create a surface behind a shared lock.
    pub fn shared(width: u32, height: u32) -> SharedSurface {
        Arc::new(Mutex::new(Self::new(width, height)))
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Resize to the floor of `size` (at least one pixel each way) and clear.
    pub fn reset(&mut self, size: Size) {
        let width = pixel_extent(size.width);
        let height = pixel_extent(size.height);
        if self.image.width() == width && self.image.height() == height {
            self.clear();
        } else {
            self.image = RgbaImage::new(width, height);
        }
    }

    /// Make every pixel transparent.
    pub fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    /// Draw `tile` with its top-left corner at `(x, y)`.
    ///
    /// Parts of the tile that fall outside the surface are clipped.
    pub fn composite(&mut self, tile: &TileBitmap, x: u32, y: u32) {
        imageops::overlay(&mut self.image, tile, i64::from(x), i64::from(y));
    }

    /// Read one pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        self.image.get_pixel_checked(x, y).copied()
    }

    /// The underlying buffer.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Raw RGBA bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }
}

/// Lock a shared surface, mapping poisoning to a render error.
pub fn lock_surface(surface: &SharedSurface) -> RenderResult<MutexGuard<'_, Surface>> {
    surface
        .lock()
        .map_err(|e| RenderError::Surface(format!("Lock error: {}", e)))
}

fn pixel_extent(value: f64) -> u32 {
    if !value.is_finite() || value < 1.0 {
        1
    } else if value > f64::from(u32::MAX) {
        u32::MAX
    } else {
        value.floor() as u32
    }
}
