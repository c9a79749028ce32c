//! Page rasterizer abstraction.
//!
//! The document backend (decoding, fonts, vector drawing) lives outside this
//! crate. It is reached through [`Document`] and [`Page`], which only need to
//! report page sizes and rasterize a requested region into a bitmap.

use futures::future::BoxFuture;
use image::RgbaImage;
use kurbo::{Affine, Point, Size};
use std::sync::Arc;
use thiserror::Error;

/// Renderer errors.
///
/// `Clone` so one rasterization result can be handed to every cycle waiting
/// on the same tile.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RenderError {
    #[error("Page load failed: {0}")]
    PageLoad(String),
    #[error("Page {0} out of range")]
    PageOutOfRange(usize),
    #[error("Rasterization failed: {0}")]
    Rasterize(String),
    #[error("Invalid scale: {0}")]
    InvalidScale(f64),
    #[error("Surface error: {0}")]
    Surface(String),
    #[error("Cache error: {0}")]
    Cache(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// A rendered square of page pixels.
pub type TileBitmap = RgbaImage;

/// A region of a page to rasterize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionRequest {
    /// Page scale.
    pub scale: f64,
    /// Top-left of the region in scaled page pixels.
    pub origin: Point,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
}

impl RegionRequest {
    /// Transform from unscaled page space into output pixel space.
    pub fn transform(&self) -> Affine {
        Affine::translate((-self.origin.x, -self.origin.y)) * Affine::scale(self.scale)
    }
}

/// One page of a loaded document.
pub trait Page: Send + Sync {
    /// 1-based page number.
    fn number(&self) -> usize;

    /// Unscaled page size.
    fn size(&self) -> Size;

    /// Page size at `scale`.
    fn viewport(&self, scale: f64) -> Size {
        let size = self.size();
        Size::new(size.width * scale, size.height * scale)
    }

    /// Rasterize one region.
    ///
    /// The output bitmap must be exactly `request.width × request.height`.
    /// Pixels outside the page may be left transparent.
    fn render_region(&self, request: RegionRequest) -> BoxFuture<'static, RenderResult<TileBitmap>>;
}

/// A loaded document.
pub trait Document: Send + Sync {
    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Load a page by 1-based number.
    fn page(&self, number: usize) -> BoxFuture<'_, RenderResult<Arc<dyn Page>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_transform() {
        let request = RegionRequest {
            scale: 2.0,
            origin: Point::new(100.0, 50.0),
            width: 64,
            height: 64,
        };
        let mapped = request.transform() * Point::new(60.0, 30.0);
        assert!((mapped.x - 20.0).abs() < 1e-12);
        assert!((mapped.y - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(RenderError::PageOutOfRange(9).to_string(), "Page 9 out of range");
        assert_eq!(
            RenderError::Rasterize("boom".to_string()).to_string(),
            "Rasterization failed: boom"
        );
    }
}
