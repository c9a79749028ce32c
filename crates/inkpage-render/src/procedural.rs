//! In-memory document that draws a checkerboard on every page.
//!
//! Stands in for a real document backend in the demo binary and in tests.
//! Every rasterization call is counted, which makes cache reuse observable.

use crate::renderer::{Document, Page, RegionRequest, RenderError, RenderResult, TileBitmap};
use futures::FutureExt;
use futures::future::BoxFuture;
use image::{Rgba, RgbaImage};
use kurbo::{Point, Size};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Default checker square edge in unscaled page units.
pub const DEFAULT_CHECKER_SIZE: f64 = 32.0;

const LIGHT: [u8; 3] = [245, 245, 240];
const DARK: [u8; 3] = [200, 205, 215];

/// A document of identically sized checkerboard pages.
#[derive(Debug)]
pub struct ProceduralDocument {
    page_count: usize,
    page_size: Size,
    checker: f64,
    renders: Arc<AtomicUsize>,
}

impl ProceduralDocument {
    pub fn new(page_count: usize, page_size: Size) -> Self {
        Self {
            page_count,
            page_size,
            checker: DEFAULT_CHECKER_SIZE,
            renders: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set the checker square edge. Non-positive values are ignored.
    pub fn with_checker(mut self, checker: f64) -> Self {
        if checker.is_finite() && checker > 0.0 {
            self.checker = checker;
        }
        self
    }

    /// Number of `render_region` calls across all pages.
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

impl Document for ProceduralDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page(&self, number: usize) -> BoxFuture<'_, RenderResult<Arc<dyn Page>>> {
        let result = if number == 0 || number > self.page_count {
            Err(RenderError::PageOutOfRange(number))
        } else {
            let page: Arc<dyn Page> = Arc::new(ProceduralPage {
                number,
                size: self.page_size,
                checker: self.checker,
                renders: Arc::clone(&self.renders),
            });
            Ok(page)
        };
        async move { result }.boxed()
    }
}

/// One checkerboard page.
#[derive(Debug)]
pub struct ProceduralPage {
    number: usize,
    size: Size,
    checker: f64,
    renders: Arc<AtomicUsize>,
}

impl ProceduralPage {
    fn shade(&self, point: Point) -> Option<Rgba<u8>> {
        if point.x < 0.0
            || point.y < 0.0
            || point.x >= self.size.width
            || point.y >= self.size.height
        {
            return None;
        }
        let col = (point.x / self.checker).floor() as u64;
        let row = (point.y / self.checker).floor() as u64;
        let [r, g, b] = if (col + row) % 2 == 0 { LIGHT } else { DARK };
        // Tint later pages slightly so page changes are visible.
        let tint = (self.number.saturating_sub(1) % 8) as u8 * 4;
        Some(Rgba([r.saturating_sub(tint), g, b, 255]))
    }
}

impl Page for ProceduralPage {
    fn number(&self) -> usize {
        self.number
    }

    fn size(&self) -> Size {
        self.size
    }

    fn render_region(
        &self,
        request: RegionRequest,
    ) -> BoxFuture<'static, RenderResult<TileBitmap>> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        let to_page = request.transform().inverse();
        let mut bitmap = RgbaImage::new(request.width, request.height);
        for (x, y, pixel) in bitmap.enumerate_pixels_mut() {
            let center = to_page * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            if let Some(color) = self.shade(center) {
                *pixel = color;
            }
        }
        async move { Ok(bitmap) }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(document: &ProceduralDocument, number: usize) -> Arc<dyn Page> {
        pollster::block_on(document.page(number)).unwrap()
    }

    #[test]
    fn test_page_range() {
        let document = ProceduralDocument::new(2, Size::new(100.0, 100.0));
        assert!(pollster::block_on(document.page(0)).is_err());
        assert_eq!(load(&document, 2).number(), 2);
        assert!(matches!(
            pollster::block_on(document.page(3)),
            Err(RenderError::PageOutOfRange(3))
        ));
    }

    #[test]
    fn test_render_region_checker_and_bounds() {
        let document = ProceduralDocument::new(1, Size::new(64.0, 64.0)).with_checker(32.0);
        let page = load(&document, 1);
        let request = RegionRequest {
            scale: 1.0,
            origin: Point::new(32.0, 0.0),
            width: 64,
            height: 64,
        };
        let bitmap = pollster::block_on(page.render_region(request)).unwrap();
        assert_eq!(bitmap.dimensions(), (64, 64));
        // Page x 32..64 is the second checker column.
        assert_eq!(bitmap.get_pixel(0, 0).0, [DARK[0], DARK[1], DARK[2], 255]);
        assert_eq!(bitmap.get_pixel(0, 40).0, [LIGHT[0], LIGHT[1], LIGHT[2], 255]);
        // Past the page edge stays transparent.
        assert_eq!(bitmap.get_pixel(40, 0)[3], 0);
        assert_eq!(document.render_count(), 1);
    }

    #[test]
    fn test_render_region_scaled() {
        let document = ProceduralDocument::new(1, Size::new(64.0, 64.0)).with_checker(32.0);
        let page = load(&document, 1);
        let request = RegionRequest {
            scale: 2.0,
            origin: Point::ZERO,
            width: 128,
            height: 128,
        };
        let bitmap = pollster::block_on(page.render_region(request)).unwrap();
        assert_eq!(bitmap.get_pixel(63, 0).0, [LIGHT[0], LIGHT[1], LIGHT[2], 255]);
        assert_eq!(bitmap.get_pixel(64, 0).0, [DARK[0], DARK[1], DARK[2], 255]);
        assert_eq!(bitmap.get_pixel(127, 127)[3], 255);
    }
}
