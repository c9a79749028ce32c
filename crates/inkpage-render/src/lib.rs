//! inkpage Render Library
//!
//! Tiled page rendering: the document abstraction, tile grid and cache, the
//! destination surface and the render-cycle engine that ties them together.

pub mod cache;
pub mod engine;
pub mod procedural;
mod renderer;
pub mod surface;
pub mod tile;
pub mod viewer;

pub use cache::{Acquired, CacheStats, TileCache, TileFuture};
pub use engine::{CancellationFlag, CycleReport, RenderCycle, RenderRequest, TileEngine};
pub use procedural::{ProceduralDocument, ProceduralPage};
pub use renderer::{Document, Page, RegionRequest, RenderError, RenderResult, TileBitmap};
pub use surface::{SharedSurface, Surface};
pub use tile::{TileCell, TileGrid, TileKey, is_tile_visible, tile_size_for_screen};
pub use viewer::TileViewer;
