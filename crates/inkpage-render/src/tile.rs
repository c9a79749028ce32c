//! Tile grid layout, visibility and cache keys.

use kurbo::{Point, Size};

/// Scale values are keyed at this precision (1/1000).
const SCALE_KEY_PRECISION: f64 = 1000.0;

/// Identity of one rendered tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    /// 1-based page number.
    pub page: usize,
    /// Scale quantized to thousandths.
    pub scale_milli: u32,
    /// Tile origin in scaled page pixels.
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    /// Create a key for a tile of `page` at `scale` with origin `(x, y)`.
    pub fn new(page: usize, scale: f64, x: u32, y: u32) -> Self {
        Self {
            page,
            scale_milli: quantize_scale(scale),
            x,
            y,
        }
    }
}

fn quantize_scale(scale: f64) -> u32 {
    let scaled = (scale * SCALE_KEY_PRECISION).round();
    if !scaled.is_finite() || scaled <= 0.0 {
        1
    } else if scaled > f64::from(u32::MAX) {
        u32::MAX
    } else {
        scaled as u32
    }
}

/// Tile edge derived from the screen area, `ceil(sqrt(width * height))`.
///
/// Tile count then grows sub-linearly with screen size.
pub fn tile_size_for_screen(screen: Size) -> u32 {
    let area = screen.width * screen.height;
    if !area.is_finite() || area <= 1.0 {
        return 1;
    }
    let edge = area.sqrt().ceil();
    if edge > f64::from(u32::MAX) { u32::MAX } else { edge as u32 }
}

/// Check whether a tile origin lies within one tile of the pan point.
///
/// This is a generous prefetch window around the pan point, not an exact
/// rectangle intersection. Bounds are inclusive.
pub fn is_tile_visible(origin: Point, pan: Point, tile_size: f64) -> bool {
    origin.x >= pan.x - tile_size
        && origin.x <= pan.x + tile_size
        && origin.y >= pan.y - tile_size
        && origin.y <= pan.y + tile_size
}

/// One cell of the tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCell {
    pub col: u32,
    pub row: u32,
    /// Origin in scaled page pixels.
    pub x: u32,
    pub y: u32,
}

impl TileCell {
    /// Origin as a point.
    pub fn origin(&self) -> Point {
        Point::new(f64::from(self.x), f64::from(self.y))
    }
}

/// The grid of square tiles covering a scaled page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGrid {
    /// Tile edge in pixels.
    pub tile_size: u32,
    pub cols: u32,
    pub rows: u32,
}

impl TileGrid {
    /// Cover `page_size` (scaled pixels) with tiles of `tile_size`.
    pub fn new(page_size: Size, tile_size: u32) -> Self {
        let tile_size = tile_size.max(1);
        let edge = f64::from(tile_size);
        Self {
            tile_size,
            cols: cell_count(page_size.width, edge),
            rows: cell_count(page_size.height, edge),
        }
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// Check if the grid has no cells.
    pub fn is_empty(&self) -> bool {
        self.cols == 0 || self.rows == 0
    }

    /// Every cell, row by row.
    pub fn cells(&self) -> impl Iterator<Item = TileCell> + '_ {
        (0..self.rows).flat_map(move |row| {
            (0..self.cols).map(move |col| TileCell {
                col,
                row,
                x: col.saturating_mul(self.tile_size),
                y: row.saturating_mul(self.tile_size),
            })
        })
    }

    /// Cells inside the prefetch window around `pan`.
    pub fn visible_cells(&self, pan: Point) -> impl Iterator<Item = TileCell> + '_ {
        let edge = f64::from(self.tile_size);
        self.cells().filter(move |cell| is_tile_visible(cell.origin(), pan, edge))
    }
}

fn cell_count(extent: f64, edge: f64) -> u32 {
    if !extent.is_finite() || extent <= 0.0 {
        return 0;
    }
    let count = (extent / edge).ceil();
    if count > f64::from(u32::MAX) { u32::MAX } else { count as u32 }
}
