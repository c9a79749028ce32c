//! Render cycles: visible-tile dispatch, progressive compositing and
//! cancellation.
//!
//! Each [`TileEngine::begin_cycle`] call cancels the previous cycle, clears
//! the surface, composites cached tiles immediately and reserves renders for
//! the missing ones. The returned [`RenderCycle`] composites the remaining
//! tiles as they resolve. A superseded cycle keeps resolving its tiles (they
//! still land in the cache) but never draws them.

use crate::cache::{Acquired, TileCache, TileFuture};
use crate::renderer::{Document, Page, RegionRequest, RenderError, RenderResult, TileBitmap};
use crate::surface::{SharedSurface, lock_surface};
use crate::tile::{TileCell, TileGrid, TileKey, tile_size_for_screen};
use futures::FutureExt;
use futures::stream::{FuturesUnordered, StreamExt};
use inkpage_core::{ViewState, ViewerConfig};
use kurbo::Size;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// What a render cycle should display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    /// Page, scale and pan.
    pub view: ViewState,
    /// Screen size, used to derive the tile size.
    pub screen: Size,
}

impl RenderRequest {
    pub fn new(view: ViewState, screen: Size) -> Self {
        Self { view, screen }
    }
}

/// Shared flag telling a cycle it has been superseded.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Summary of one render cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Cycle number, starting at 1.
    pub generation: u64,
    /// Cells inside the visibility window.
    pub visible: usize,
    /// Cells served from the cache.
    pub cache_hits: usize,
    /// Cells whose render this cycle started.
    pub dispatched: usize,
    /// Cells joined to a render an earlier cycle started.
    pub joined: usize,
    /// Tiles drawn onto the surface, hits included.
    pub composited: usize,
    /// Tiles whose render failed.
    pub failed: usize,
    /// Tiles that resolved after the cycle was superseded.
    pub suppressed: usize,
    /// Whether the cycle was superseded before it finished.
    pub cancelled: bool,
}

/// An in-progress render cycle.
pub struct RenderCycle {
    flag: CancellationFlag,
    surface: SharedSurface,
    pending: Vec<(TileCell, TileFuture)>,
    report: CycleReport,
}

impl RenderCycle {
    /// Cycle number.
    pub fn generation(&self) -> u64 {
        self.report.generation
    }

    /// This cycle's cancellation flag.
    pub fn flag(&self) -> &CancellationFlag {
        &self.flag
    }

    /// Number of tiles still to resolve.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Counters gathered while the cycle was started.
    pub fn report(&self) -> CycleReport {
        self.report
    }

    /// Wait for every outstanding tile, compositing each as it resolves.
    pub async fn run(self) -> CycleReport {
        let RenderCycle {
            flag,
            surface,
            pending,
            mut report,
        } = self;

        let mut in_flight: FuturesUnordered<_> = pending
            .into_iter()
            .map(|(cell, future)| future.map(move |result| (cell, result)))
            .collect();

        while let Some((cell, result)) = in_flight.next().await {
            let bitmap = match result {
                Ok(bitmap) => bitmap,
                Err(e) => {
                    log::warn!("Tile at ({}, {}) failed: {}", cell.x, cell.y, e);
                    report.failed += 1;
                    continue;
                }
            };

            if flag.is_cancelled() {
                report.suppressed += 1;
                continue;
            }

            match lock_surface(&surface) {
                Ok(mut target) => {
                    target.composite(&bitmap, cell.x, cell.y);
                    report.composited += 1;
                }
                Err(e) => {
                    log::warn!("Dropping tile at ({}, {}): {}", cell.x, cell.y, e);
                    report.failed += 1;
                }
            }
        }

        report.cancelled = flag.is_cancelled();
        log::debug!(
            "Cycle {} finished: {} composited, {} failed, {} suppressed",
            report.generation,
            report.composited,
            report.failed,
            report.suppressed
        );
        report
    }
}

/// Drives render cycles against a shared tile cache.
pub struct TileEngine {
    cache: Arc<Mutex<TileCache>>,
    tile_size: Option<u32>,
    generation: u64,
    active: Option<CancellationFlag>,
}

impl TileEngine {
    /// Create an engine with a cache sized from `config`.
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            cache: Arc::new(Mutex::new(TileCache::new(config.cache_capacity))),
            tile_size: config.tile_size,
            generation: 0,
            active: None,
        }
    }

    /// The shared tile cache.
    pub fn cache(&self) -> &Arc<Mutex<TileCache>> {
        &self.cache
    }

    /// Number of cycles started so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Supersede the active cycle, if any.
    pub fn cancel_active(&mut self) {
        if let Some(flag) = self.active.take() {
            flag.cancel();
        }
    }

    /// Tile edge for `screen`, honouring a configured fixed size.
    pub fn tile_size(&self, screen: Size) -> u32 {
        self.tile_size.unwrap_or_else(|| tile_size_for_screen(screen)).max(1)
    }

    /// Load the requested page from `document` and start a cycle on it.
    ///
    /// A page that fails to load leaves the engine and surface untouched.
    pub async fn render(
        &mut self,
        document: &dyn Document,
        request: &RenderRequest,
        surface: &SharedSurface,
    ) -> RenderResult<RenderCycle> {
        let number = request.view.page;
        if number == 0 || number > document.page_count() {
            return Err(RenderError::PageOutOfRange(number));
        }
        let page = document.page(number).await?;
        self.begin_cycle(page, request, surface)
    }

    /// Start a render cycle for `page`.
    pub fn begin_cycle(
        &mut self,
        page: Arc<dyn Page>,
        request: &RenderRequest,
        surface: &SharedSurface,
    ) -> RenderResult<RenderCycle> {
        let scale = request.view.scale;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(RenderError::InvalidScale(scale));
        }

        self.cancel_active();
        self.generation += 1;
        let flag = CancellationFlag::new();
        self.active = Some(flag.clone());

        let viewport = page.viewport(scale);
        lock_surface(surface)?.reset(viewport);

        let tile_size = self.tile_size(request.screen);
        let grid = TileGrid::new(viewport, tile_size);
        let mut report = CycleReport {
            generation: self.generation,
            ..CycleReport::default()
        };
        log::debug!(
            "Cycle {}: page {} at {:.3}, {}x{} tiles of {}px",
            self.generation,
            page.number(),
            scale,
            grid.cols,
            grid.rows,
            tile_size
        );

        let mut hits = Vec::new();
        let mut pending = Vec::new();
        {
            let mut cache = self.lock_cache()?;
            for cell in grid.visible_cells(request.view.pan) {
                report.visible += 1;
                let key = TileKey::new(page.number(), scale, cell.x, cell.y);
                let dispatch = |ticket| self.dispatch(&page, key, ticket, scale, cell, tile_size);
                match cache.acquire(key, dispatch) {
                    Acquired::Ready(bitmap) => {
                        log::trace!("Cache hit for {:?}", key);
                        report.cache_hits += 1;
                        hits.push((cell, bitmap));
                    }
                    Acquired::Joined(future) => {
                        report.joined += 1;
                        pending.push((cell, future));
                    }
                    Acquired::Dispatched(future) => {
                        report.dispatched += 1;
                        pending.push((cell, future));
                    }
                }
            }
        }

        if !hits.is_empty() {
            let mut target = lock_surface(surface)?;
            for (cell, bitmap) in &hits {
                target.composite(bitmap, cell.x, cell.y);
                report.composited += 1;
            }
        }

        Ok(RenderCycle {
            flag,
            surface: Arc::clone(surface),
            pending,
            report,
        })
    }

    fn dispatch(
        &self,
        page: &Arc<dyn Page>,
        key: TileKey,
        ticket: u64,
        scale: f64,
        cell: TileCell,
        tile_size: u32,
    ) -> TileFuture {
        let request = RegionRequest {
            scale,
            origin: cell.origin(),
            width: tile_size,
            height: tile_size,
        };
        let render = page.render_region(request);
        let cache = Arc::clone(&self.cache);

        async move {
            let result = render
                .await
                .and_then(|bitmap| check_tile(bitmap, tile_size))
                .map(Arc::new);
            match cache.lock() {
                Ok(mut cache) => cache.complete(key, ticket, &result),
                Err(e) => log::warn!("Could not record tile {:?}: {}", key, e),
            }
            result
        }
        .boxed()
        .shared()
    }

    fn lock_cache(&self) -> RenderResult<MutexGuard<'_, TileCache>> {
        self.cache
            .lock()
            .map_err(|e| RenderError::Cache(format!("Lock error: {}", e)))
    }
}

fn check_tile(bitmap: TileBitmap, tile_size: u32) -> RenderResult<TileBitmap> {
    if bitmap.width() == tile_size && bitmap.height() == tile_size {
        Ok(bitmap)
    } else {
        Err(RenderError::Rasterize(format!(
            "expected a {}x{} tile, got {}x{}",
            tile_size,
            tile_size,
            bitmap.width(),
            bitmap.height()
        )))
    }
}
